//! Types for the organize module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Operation mode, shared by every category of a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Copy files to destination (keep originals)
    #[default]
    Copy,
    /// Move files to destination
    Move,
}

/// Run-level placement configuration; fixed once the pipeline is built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeConfig {
    /// Destination template, e.g. `{D.YYYY}/{D.MM}/{NAME}.{EXT}`
    pub format: String,
    /// Root of the organized tree
    pub target_dir: PathBuf,
    /// Where duplicate sets are separated to; `None` keeps representatives instead
    pub duplicate_dir: Option<PathBuf>,
    /// Where files with unreadable metadata go; `None` leaves them in place
    pub error_dir: Option<PathBuf>,
    pub operation: OperationMode,
    /// Files placed concurrently within one category
    pub transfer_threads: usize,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            format: String::new(),
            target_dir: PathBuf::new(),
            duplicate_dir: None,
            error_dir: None,
            operation: OperationMode::Copy,
            transfer_threads: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_mode_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&OperationMode::Move).unwrap(), "\"move\"");
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = OrganizeConfig {
            format: "{D.YYYY}/{NAME}.{EXT}".to_string(),
            target_dir: PathBuf::from("/library"),
            duplicate_dir: Some(PathBuf::from("/library-dupes")),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: OrganizeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.format, config.format);
        assert_eq!(parsed.duplicate_dir, config.duplicate_dir);
        assert_eq!(parsed.transfer_threads, 1);
    }
}
