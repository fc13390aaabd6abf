//! Bounded parallel directory discovery.
//!
//! Each directory is one rayon task spawned into a scope on a pool of
//! `concurrency` threads. Subdirectories are spawned from inside the task
//! that lists them, so the set of tasks grows while the scan runs.
//! `ThreadPool::scope` only returns once every task spawned into it,
//! transitively, has finished; that is the completion signal for the whole
//! forest. A task never blocks on its children, so at most `concurrency`
//! directory listings run at any moment.

use super::{filter::MediaFilter, DiscoveryResult, MediaScanner};
use crate::error::ScanError;
use crate::events::{DiscoveryEvent, DiscoveryProgress, Event, EventSender};
use rayon::Scope;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Configuration for directory discovery
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Maximum number of directories listed at the same time
    pub concurrency: usize,
    /// Whether to descend into symlinked directories
    pub follow_symlinks: bool,
    /// Whether to skip hidden files and directories
    pub skip_hidden: bool,
    /// Custom extensions to include (None = every supported media type)
    pub extensions: Option<Vec<String>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            follow_symlinks: false,
            skip_hidden: false,
            extensions: None,
        }
    }
}

/// Shared state of one discovery run
struct DiscoveryState {
    events: EventSender,
    files: Mutex<Vec<PathBuf>>,
    errors: Mutex<Vec<ScanError>>,
    /// Canonical directories already entered; only used when following symlinks
    visited: Mutex<HashSet<PathBuf>>,
    directories: AtomicUsize,
    files_found: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Marks one directory scan as running until dropped
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DiscoveryState {
    fn new(events: &EventSender) -> Self {
        Self {
            events: events.clone(),
            files: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            visited: Mutex::new(HashSet::new()),
            directories: AtomicUsize::new(0),
            files_found: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn enter(&self) -> InFlight<'_> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        InFlight(&self.in_flight)
    }

    fn first_visit(&self, dir: &Path) -> bool {
        match fs::canonicalize(dir) {
            Ok(canonical) => self
                .visited
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(canonical),
            Err(_) => true,
        }
    }

    fn record_error(&self, error: ScanError, path: &Path) {
        warn!(path = %path.display(), "{error}");
        self.events.send(Event::Discovery(DiscoveryEvent::Error {
            path: path.to_path_buf(),
            message: error.to_string(),
        }));
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }

    fn record_files(&self, found: Vec<PathBuf>) -> usize {
        let total = self.files_found.fetch_add(found.len(), Ordering::SeqCst) + found.len();
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(found);
        total
    }
}

/// Discovery engine listing directories in parallel under a concurrency limit
pub struct ParallelScanner {
    config: ScanConfig,
    filter: MediaFilter,
}

impl ParallelScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = MediaFilter::new().with_skip_hidden(config.skip_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self { config, filter }
    }

    /// List one directory, record its media files and spawn a task per subdirectory
    fn scan_directory<'s>(&'s self, scope: &Scope<'s>, state: &'s DiscoveryState, dir: PathBuf) {
        let _slot = state.enter();

        if self.config.follow_symlinks && !state.first_visit(&dir) {
            debug!(path = %dir.display(), "directory already visited through another link");
            return;
        }

        let directories = state.directories.fetch_add(1, Ordering::SeqCst) + 1;
        let mut found = Vec::new();

        let listing = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.config.follow_symlinks);

        for entry in listing {
            match entry {
                Ok(entry) => {
                    let is_dir = entry.file_type().is_dir();
                    let path = entry.into_path();

                    if is_dir {
                        if self.filter.should_descend(&path) {
                            scope.spawn(move |s| self.scan_directory(s, state, path));
                        }
                    } else if self.filter.should_include(&path) {
                        found.push(path);
                    }
                }
                Err(e) => {
                    let (error, path) = Self::to_scan_error(&dir, e);
                    state.record_error(error, &path);
                }
            }
        }

        let files_found = state.record_files(found);

        state
            .events
            .send(Event::Discovery(DiscoveryEvent::Progress(DiscoveryProgress {
                directories_scanned: directories,
                files_found,
                current_path: dir,
            })));
    }

    fn to_scan_error(dir: &Path, error: walkdir::Error) -> (ScanError, PathBuf) {
        let path = error
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dir.to_path_buf());
        let message = error.to_string();

        let scan_error = match error.into_io_error() {
            Some(e) if e.kind() == io::ErrorKind::NotFound => ScanError::DirectoryNotFound {
                path: path.clone(),
            },
            Some(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                ScanError::PermissionDenied { path: path.clone() }
            }
            Some(source) => ScanError::ReadDirectory {
                path: path.clone(),
                source,
            },
            None => ScanError::ReadDirectory {
                path: path.clone(),
                source: io::Error::new(io::ErrorKind::Other, message),
            },
        };

        (scan_error, path)
    }
}

impl MediaScanner for ParallelScanner {
    fn discover(&self, roots: &[PathBuf]) -> Result<DiscoveryResult, ScanError> {
        self.discover_with_events(roots, &crate::events::null_sender())
    }

    fn discover_with_events(
        &self,
        roots: &[PathBuf],
        events: &EventSender,
    ) -> Result<DiscoveryResult, ScanError> {
        if self.config.concurrency == 0 {
            return Err(ScanError::ThreadPool(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency)
            .thread_name(|i| format!("discovery-{i}"))
            .build()
            .map_err(|e| ScanError::ThreadPool(e.to_string()))?;

        events.send(Event::Discovery(DiscoveryEvent::Started {
            roots: roots.to_vec(),
        }));

        let state = DiscoveryState::new(events);

        pool.scope(|scope| {
            for root in roots {
                let root = std::path::absolute(root).unwrap_or_else(|_| root.clone());

                if !root.is_dir() {
                    state.directories.fetch_add(1, Ordering::SeqCst);
                    state.record_error(ScanError::DirectoryNotFound { path: root.clone() }, &root);
                    continue;
                }

                let state = &state;
                scope.spawn(move |s| self.scan_directory(s, state, root));
            }
        });

        let DiscoveryState {
            files,
            errors,
            directories,
            max_in_flight,
            ..
        } = state;

        let mut result =
            DiscoveryResult::from_files(files.into_inner().unwrap_or_else(PoisonError::into_inner));
        result.directories_scanned = directories.into_inner();
        result.max_in_flight = max_in_flight.into_inner();
        result.errors = errors.into_inner().unwrap_or_else(PoisonError::into_inner);

        info!(
            directories = result.directories_scanned,
            files = result.total_files,
            errors = result.errors.len(),
            "discovery completed"
        );

        events.send(Event::Discovery(DiscoveryEvent::Completed {
            directories_scanned: result.directories_scanned,
            total_files: result.total_files,
        }));

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventChannel;
    use std::collections::BTreeSet;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(path).unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
    }

    fn scanner(concurrency: usize) -> ParallelScanner {
        ParallelScanner::new(ScanConfig {
            concurrency,
            ..Default::default()
        })
    }

    /// A forest that fans out wide and deep, with some unsupported files mixed in
    fn build_forest(root: &Path) -> BTreeSet<PathBuf> {
        let mut expected = BTreeSet::new();
        for a in 0..4 {
            for b in 0..3 {
                let dir = root.join(format!("a{a}")).join(format!("b{b}"));
                for depth in 0..3 {
                    let nested = (0..depth).fold(dir.clone(), |d, i| d.join(format!("d{i}")));
                    let photo = nested.join(format!("IMG_{a}{b}{depth}.JPG"));
                    let clip = nested.join(format!("clip_{a}{b}{depth}.mp4"));
                    touch(&photo);
                    touch(&clip);
                    touch(&nested.join("notes.txt"));
                    expected.insert(photo);
                    expected.insert(clip);
                }
            }
        }
        fs::create_dir_all(root.join("empty/deeper/still_empty")).unwrap();
        expected
    }

    #[test]
    fn discover_empty_directory_returns_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let result = scanner(4).discover(&[temp_dir.path().to_path_buf()]).unwrap();

        assert_eq!(result.total_files, 0);
        assert_eq!(result.directories_scanned, 1);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn discover_finds_every_supported_file_for_any_concurrency() {
        let temp_dir = TempDir::new().unwrap();
        let expected = build_forest(temp_dir.path());

        for concurrency in [1, 2, 3, 8, 64] {
            let result = scanner(concurrency)
                .discover(&[temp_dir.path().to_path_buf()])
                .unwrap();
            let found: BTreeSet<PathBuf> = result.all_files().into_iter().collect();

            assert_eq!(found, expected, "concurrency {concurrency}");
            assert_eq!(result.total_files, expected.len());
            assert!(result.max_in_flight <= concurrency);
            assert!(result.errors.is_empty());
        }
    }

    #[test]
    fn discover_groups_by_lowercase_extension() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("a.JPG"));
        touch(&temp_dir.path().join("sub/b.jpg"));
        touch(&temp_dir.path().join("sub/c.MOV"));

        let result = scanner(2).discover(&[temp_dir.path().to_path_buf()]).unwrap();

        let keys: Vec<_> = result.files_by_extension.keys().cloned().collect();
        assert_eq!(keys, vec!["jpg".to_string(), "mov".to_string()]);
        assert_eq!(result.files_by_extension["jpg"].len(), 2);
        assert_eq!(result.directories_scanned, 2);
    }

    #[test]
    fn single_worker_never_runs_two_scans() {
        let temp_dir = TempDir::new().unwrap();
        build_forest(temp_dir.path());

        let result = scanner(1).discover(&[temp_dir.path().to_path_buf()]).unwrap();
        assert_eq!(result.max_in_flight, 1);
    }

    #[test]
    fn multiple_roots_are_all_scanned() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        touch(&first.path().join("x/one.png"));
        touch(&second.path().join("y/z/two.heic"));

        let result = scanner(3)
            .discover(&[first.path().to_path_buf(), second.path().to_path_buf()])
            .unwrap();

        assert_eq!(result.total_files, 2);
        assert_eq!(result.directories_scanned, 5);
    }

    #[test]
    fn missing_root_is_reported_but_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("kept.jpg"));

        let result = scanner(2)
            .discover(&[
                PathBuf::from("/nonexistent/path/12345"),
                temp_dir.path().to_path_buf(),
            ])
            .unwrap();

        assert_eq!(result.total_files, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(
            result.errors[0],
            ScanError::DirectoryNotFound { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_does_not_hide_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("root.jpg"));
        touch(&temp_dir.path().join("open/sibling.jpg"));
        let locked = temp_dir.path().join("locked");
        touch(&locked.join("hidden.jpg"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can still list the directory; nothing to test then.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = scanner(4).discover(&[temp_dir.path().to_path_buf()]).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let names: BTreeSet<_> = result
            .all_files()
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert!(names.contains("root.jpg"));
        assert!(names.contains("sibling.jpg"));
        assert!(!names.contains("hidden.jpg"));
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn skip_hidden_prunes_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("visible.jpg"));
        touch(&temp_dir.path().join(".cache/thumb.jpg"));

        let all = scanner(2).discover(&[temp_dir.path().to_path_buf()]).unwrap();
        assert_eq!(all.total_files, 2);

        let pruned = ParallelScanner::new(ScanConfig {
            skip_hidden: true,
            ..Default::default()
        })
        .discover(&[temp_dir.path().to_path_buf()])
        .unwrap();
        assert_eq!(pruned.total_files, 1);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = scanner(0).discover(&[temp_dir.path().to_path_buf()]);
        assert!(matches!(result, Err(ScanError::ThreadPool(_))));
    }

    #[test]
    fn completion_event_reports_totals() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("a/b/c.jpg"));

        let (sender, receiver) = EventChannel::new();
        scanner(2)
            .discover_with_events(&[temp_dir.path().to_path_buf()], &sender)
            .unwrap();

        let completed = receiver.drain().into_iter().find_map(|event| match event {
            Event::Discovery(DiscoveryEvent::Completed {
                directories_scanned,
                total_files,
            }) => Some((directories_scanned, total_files)),
            _ => None,
        });
        assert_eq!(completed, Some((3, 1)));
    }
}
