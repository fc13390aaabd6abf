//! # Pipeline Module
//!
//! Orchestrates a full organize run.
//!
//! ## Pipeline Stages
//! 1. **Discover** - Find every supported file under the source roots
//! 2. **Gather** - Read capture metadata; unreadable files become error files
//! 3. **Deduplicate** - Ask the deduplication collaborator for unique files and duplicate sets
//! 4. **Place** - Transfer unique files, then duplicates or representatives, then error files
//!
//! ## Parallelism
//! Discovery and metadata reading use rayon. Placement runs each category on
//! a pool of `transfer_threads` workers; categories never overlap.

mod executor;

pub use executor::{OrganizeResult, PhaseSummary, Pipeline, PipelineBuilder, PlacementResult};
