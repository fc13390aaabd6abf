//! # Dedup Module
//!
//! The result of an external deduplication pass, as the placement pipeline
//! consumes it. How duplicates are detected is not this crate's concern; the
//! result arrives either as a JSON report or, when there is none, as "every
//! file is unique".
//!
//! ## Report format
//! ```json
//! {
//!   "unique_files": ["/in/a.jpg"],
//!   "duplicate_sets": [
//!     {
//!       "best_file": "/in/b.jpg",
//!       "duplicates": ["/in/b copy.jpg"],
//!       "representatives": ["/in/b.jpg"]
//!     }
//!   ]
//! }
//! ```
//!
//! Files a report does not place in any category are placed as unique. That
//! includes a `best_file` listed nowhere else.

use crate::error::DedupError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A cluster of files considered copies of one another
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateSet {
    /// The preferred copy; never one of `duplicates`
    pub best_file: PathBuf,
    /// Copies separated into the duplicate directory when one is configured
    #[serde(default)]
    pub duplicates: BTreeSet<PathBuf>,
    /// Copies kept in the main tree when no duplicate directory is configured
    #[serde(default)]
    pub representatives: BTreeSet<PathBuf>,
}

/// Unique files and duplicate sets for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeduplicationResult {
    #[serde(default)]
    pub unique_files: BTreeSet<PathBuf>,
    #[serde(default)]
    pub duplicate_sets: Vec<DuplicateSet>,
}

impl DeduplicationResult {
    /// Treat every file as unique (no deduplication report available)
    pub fn all_unique<I>(files: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self {
            unique_files: files.into_iter().collect(),
            duplicate_sets: Vec::new(),
        }
    }

    /// Load a report written by an external deduplicator and validate it
    pub fn from_json_file(path: &Path) -> Result<Self, DedupError> {
        let raw = fs::read_to_string(path).map_err(|source| DedupError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let result: Self = serde_json::from_str(&raw).map_err(|source| DedupError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        result.validate()?;
        Ok(result)
    }

    /// Check that no path is placed twice.
    ///
    /// A path may appear in at most one of: the unique files, any set's
    /// duplicates, any set's representatives. A set's best file must not be
    /// one of its own duplicates.
    pub fn validate(&self) -> Result<(), DedupError> {
        let mut seen: HashSet<&Path> = self.unique_files.iter().map(PathBuf::as_path).collect();

        for set in &self.duplicate_sets {
            if set.duplicates.contains(&set.best_file) {
                return Err(DedupError::BestFileIsDuplicate {
                    path: set.best_file.clone(),
                });
            }

            for path in set.duplicates.iter().chain(&set.representatives) {
                if !seen.insert(path) {
                    return Err(DedupError::Overlap { path: path.clone() });
                }
            }
        }

        Ok(())
    }

    /// Whether `path` is assigned a placement category.
    ///
    /// Naming a file as a set's `best_file` does not place it; it must also be
    /// a unique file or a representative.
    pub fn mentions(&self, path: &Path) -> bool {
        self.unique_files.contains(path)
            || self
                .duplicate_sets
                .iter()
                .any(|set| set.duplicates.contains(path) || set.representatives.contains(path))
    }

    /// Total members of every set's `duplicates`
    pub fn duplicate_count(&self) -> usize {
        self.duplicate_sets.iter().map(|s| s.duplicates.len()).sum()
    }

    /// Total members of every set's `representatives`
    pub fn representative_count(&self) -> usize {
        self.duplicate_sets
            .iter()
            .map(|s| s.representatives.len())
            .sum()
    }
}

/// Supplies the deduplication result for a run; called once, after discovery
pub trait Deduplicator: Send + Sync {
    fn deduplicate(&self, files: &[PathBuf]) -> Result<DeduplicationResult, DedupError>;
}

/// Treats every discovered file as unique
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeduplication;

impl Deduplicator for NoDeduplication {
    fn deduplicate(&self, files: &[PathBuf]) -> Result<DeduplicationResult, DedupError> {
        Ok(DeduplicationResult::all_unique(files.iter().cloned()))
    }
}

/// Loads the result from a JSON report
#[derive(Debug, Clone)]
pub struct ReportDeduplicator {
    path: PathBuf,
}

impl ReportDeduplicator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Deduplicator for ReportDeduplicator {
    fn deduplicate(&self, files: &[PathBuf]) -> Result<DeduplicationResult, DedupError> {
        let mut result = DeduplicationResult::from_json_file(&self.path)?;

        let unlisted: Vec<PathBuf> = files
            .iter()
            .filter(|file| !result.mentions(file))
            .cloned()
            .collect();
        if !unlisted.is_empty() {
            debug!(count = unlisted.len(), "files missing from report placed as unique");
            result.unique_files.extend(unlisted);
        }

        Ok(result)
    }
}
