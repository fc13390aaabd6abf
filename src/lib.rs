//! # Media Organizer
//!
//! Sorts large photo and video collections into a tree named by a template.
//!
//! ## Core Philosophy
//! - **Never overwrite** - Every destination is collision-checked before a byte is written
//! - **Keep going** - A bad file is counted and logged, the run continues
//! - **Show progress** - Every stage reports through events
//!
//! ## Architecture
//! - `core` - Discovery, metadata, placement
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{OrganizerError, Result};

/// Initialize tracing for the library
///
/// Reads `RUST_LOG`; without it only warnings are shown. Safe to call twice.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
