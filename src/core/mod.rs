//! # Core Module
//!
//! The UI-agnostic organizing engine.
//!
//! ## Modules
//! - `scanner` - Classifies extensions and discovers media files
//! - `metadata` - Reads capture date, GPS, camera and duration
//! - `dedup` - Deduplication results consumed by placement
//! - `organize` - Path templates, collision handling and file transfer
//! - `pipeline` - Orchestrates the full workflow

pub mod dedup;
pub mod metadata;
pub mod organize;
pub mod pipeline;
pub mod scanner;

// Re-export commonly used types
pub use dedup::{DeduplicationResult, DuplicateSet};
pub use metadata::{FileInfo, GatherFileInfoResult};
pub use organize::{OperationMode, PathTemplate};
pub use scanner::{DiscoveryResult, MediaType};
