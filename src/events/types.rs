//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the organizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Directory discovery events
    Discovery(DiscoveryEvent),
    /// Metadata gathering events
    Gather(GatherEvent),
    /// Placement (copy/move) events
    Transfer(TransferEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during directory discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DiscoveryEvent {
    /// Discovery has started
    Started { roots: Vec<PathBuf> },
    /// A directory finished scanning
    Progress(DiscoveryProgress),
    /// A directory could not be read; its subtree is skipped
    Error { path: PathBuf, message: String },
    /// Every scan task has completed
    Completed {
        directories_scanned: usize,
        total_files: usize,
    },
}

/// Progress information during discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryProgress {
    /// Number of directories scanned so far
    pub directories_scanned: usize,
    /// Number of supported files found so far
    pub files_found: usize,
    /// Directory that just finished
    pub current_path: PathBuf,
}

/// Events while reading per-file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GatherEvent {
    Started { total_files: usize },
    Progress { completed: usize, total: usize },
    /// The file will be routed to the error bucket
    Error { path: PathBuf, message: String },
    Completed { processed: usize, errors: usize },
}

/// Events during placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransferEvent {
    /// A category pass is starting
    PhaseStarted { phase: TransferPhase, total: usize },
    /// One file of the current category was handled (transferred, skipped or failed)
    Progress(TransferProgress),
    /// A file could not be placed; the run continues
    Error {
        phase: TransferPhase,
        path: PathBuf,
        message: String,
    },
    /// A category pass finished
    PhaseCompleted {
        phase: TransferPhase,
        transferred: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Progress information during placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferProgress {
    pub phase: TransferPhase,
    pub completed: usize,
    pub total: usize,
    pub current_path: PathBuf,
}

/// The four placement categories, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferPhase {
    Unique,
    Duplicate,
    Representative,
    Error,
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed
    Completed { summary: PipelineSummary },
}

/// Phases of a full run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Discovering,
    Gathering,
    Placing,
}

/// Summary of a placement run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Files copied or moved successfully
    pub transferred: usize,
    /// Files skipped because metadata was unavailable or no bucket was configured
    pub skipped: usize,
    /// Files whose transfer failed
    pub failed: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferPhase::Unique => write!(f, "Unique"),
            TransferPhase::Duplicate => write!(f, "Duplicate"),
            TransferPhase::Representative => write!(f, "Best File"),
            TransferPhase::Error => write!(f, "Error"),
        }
    }
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Discovering => write!(f, "Discovering"),
            PipelinePhase::Gathering => write!(f, "Reading metadata"),
            PipelinePhase::Placing => write!(f, "Placing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Transfer(TransferEvent::Progress(TransferProgress {
            phase: TransferPhase::Duplicate,
            completed: 3,
            total: 10,
            current_path: PathBuf::from("/photos/a.jpg"),
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Transfer(TransferEvent::Progress(p)) => {
                assert_eq!(p.phase, TransferPhase::Duplicate);
                assert_eq!(p.completed, 3);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn representative_phase_displays_as_best_file() {
        assert_eq!(TransferPhase::Representative.to_string(), "Best File");
    }
}
