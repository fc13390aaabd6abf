//! # Error Module
//!
//! Error types for the media organizer.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-file errors stay local** - a failed file never aborts a run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Discovery error: {0}")]
    Scan(#[from] ScanError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Deduplication input error: {0}")]
    Dedup(#[from] DedupError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur during directory discovery
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start discovery workers: {0}")]
    ThreadPool(String),
}

/// Errors produced while reading a file's metadata
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is corrupt or unreadable {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("No metadata was gathered for {path}")]
    NotGathered { path: PathBuf },
}

/// Errors produced while computing a destination path
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Could not resolve filename conflict for {source_path} after {attempts} attempts")]
    CollisionExhausted { source_path: PathBuf, attempts: usize },
}

/// Errors produced while copying or moving a single file
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copied {from} but failed to remove the source: {source}")]
    RemoveSource {
        from: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy verification failed for {from}: source {expected} bytes, destination {actual} bytes")]
    VerificationFailed {
        from: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error(transparent)]
    Collision(#[from] TemplateError),
}

/// Errors in the deduplication result handed to the placement pipeline
#[derive(Error, Debug)]
pub enum DedupError {
    #[error("{path} appears in more than one deduplication category")]
    Overlap { path: PathBuf },

    #[error("Best file {path} is also listed among its own duplicates")]
    BestFileIsDuplicate { path: PathBuf },

    #[error("Failed to read deduplication report {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid deduplication report {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, OrganizerError>;
