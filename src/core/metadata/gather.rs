//! Parallel metadata gathering over discovered files.

use super::{FileInfo, MetadataProcessor};
use crate::error::MetadataError;
use crate::events::{Event, EventSender, GatherEvent};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Metadata for every file that could be read, plus the ones that could not
#[derive(Debug, Default)]
pub struct GatherFileInfoResult {
    pub file_infos: HashMap<PathBuf, FileInfo>,
    /// Files whose metadata could not be read, sorted by path
    pub error_files: Vec<PathBuf>,
}

/// Placement looks records up here instead of reading each file a second time
impl MetadataProcessor for GatherFileInfoResult {
    fn process_file(&self, path: &Path) -> Result<FileInfo, MetadataError> {
        self.file_infos
            .get(path)
            .cloned()
            .ok_or_else(|| MetadataError::NotGathered {
                path: path.to_path_buf(),
            })
    }
}

/// Run `processor` over `files` on the rayon pool
pub fn gather_file_info(
    files: &[PathBuf],
    processor: &dyn MetadataProcessor,
    events: &EventSender,
) -> GatherFileInfoResult {
    let total = files.len();
    let completed = AtomicUsize::new(0);

    events.send(Event::Gather(GatherEvent::Started { total_files: total }));

    let outcomes: Vec<(PathBuf, Result<FileInfo, MetadataError>)> = files
        .par_iter()
        .map(|path| {
            let outcome = processor.process_file(path);

            if let Err(ref e) = outcome {
                warn!(path = %path.display(), "{e}");
                events.send(Event::Gather(GatherEvent::Error {
                    path: path.clone(),
                    message: e.to_string(),
                }));
            }

            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            events.send(Event::Gather(GatherEvent::Progress {
                completed: done,
                total,
            }));

            (path.clone(), outcome)
        })
        .collect();

    let mut result = GatherFileInfoResult::default();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(info) => {
                result.file_infos.insert(path, info);
            }
            Err(_) => result.error_files.push(path),
        }
    }
    result.error_files.sort();

    info!(
        processed = result.file_infos.len(),
        errors = result.error_files.len(),
        "metadata gathered"
    );

    events.send(Event::Gather(GatherEvent::Completed {
        processed: result.file_infos.len(),
        errors: result.error_files.len(),
    }));

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::tests::file_info;
    use crate::events::{null_sender, EventChannel};

    /// Fails for any file whose name contains "bad"
    struct PickyProcessor;

    impl MetadataProcessor for PickyProcessor {
        fn process_file(&self, path: &Path) -> Result<FileInfo, MetadataError> {
            if path.to_string_lossy().contains("bad") {
                Err(MetadataError::Corrupt {
                    path: path.to_path_buf(),
                    reason: "unreadable".to_string(),
                })
            } else {
                Ok(file_info(&path.to_string_lossy(), None))
            }
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn failures_are_collected_as_error_files() {
        let files = paths(&["/in/good1.jpg", "/in/z_bad.jpg", "/in/good2.jpg", "/in/a_bad.png"]);
        let result = gather_file_info(&files, &PickyProcessor, &null_sender());

        assert_eq!(result.file_infos.len(), 2);
        assert_eq!(result.error_files, paths(&["/in/a_bad.png", "/in/z_bad.jpg"]));
    }

    #[test]
    fn gathered_result_serves_lookups() {
        let files = paths(&["/in/good.jpg", "/in/bad.jpg"]);
        let result = gather_file_info(&files, &PickyProcessor, &null_sender());

        assert!(result.process_file(Path::new("/in/good.jpg")).is_ok());
        assert!(matches!(
            result.process_file(Path::new("/in/bad.jpg")),
            Err(MetadataError::NotGathered { .. })
        ));
    }

    #[test]
    fn progress_reaches_total() {
        let files = paths(&["/1.jpg", "/2.jpg", "/3_bad.jpg"]);
        let (sender, receiver) = EventChannel::new();
        gather_file_info(&files, &PickyProcessor, &sender);

        let max_completed = receiver
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                Event::Gather(GatherEvent::Progress { completed, total }) => {
                    assert_eq!(total, 3);
                    Some(completed)
                }
                _ => None,
            })
            .max();
        assert_eq!(max_completed, Some(3));
    }
}
