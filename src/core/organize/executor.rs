//! Copy or move a single file to its resolved destination.

use super::types::OperationMode;
use crate::error::TransferError;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Filesystem operations used by placement.
///
/// Swappable so the cross-device move path can be exercised without two mounts.
pub trait Filesystem: Send + Sync {
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn file_size(&self, path: &Path) -> io::Result<u64>;
    /// Whether anything (file, directory, dangling link) occupies `path`
    fn exists(&self, path: &Path) -> bool;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        fs::copy(from, to)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }
}

/// Whether a rename failed only because source and target are on different devices
pub fn is_cross_device(err: &io::Error) -> bool {
    #[cfg(unix)]
    const CROSS_DEVICE: i32 = 18; // EXDEV
    #[cfg(windows)]
    const CROSS_DEVICE: i32 = 17; // ERROR_NOT_SAME_DEVICE
    #[cfg(not(any(unix, windows)))]
    const CROSS_DEVICE: i32 = -1;

    err.raw_os_error() == Some(CROSS_DEVICE)
}

/// Transfers files according to an [`OperationMode`]
#[derive(Clone)]
pub struct TransferExecutor {
    fs: Arc<dyn Filesystem>,
}

impl Default for TransferExecutor {
    fn default() -> Self {
        Self::new(Arc::new(LocalFilesystem))
    }
}

impl TransferExecutor {
    pub fn new(fs: Arc<dyn Filesystem>) -> Self {
        Self { fs }
    }

    pub fn filesystem(&self) -> &dyn Filesystem {
        self.fs.as_ref()
    }

    /// Create the target's parent directories, then copy or move.
    ///
    /// `target` must already be collision-free; an existing file there is
    /// overwritten by the platform copy.
    pub fn transfer(
        &self,
        source: &Path,
        target: &Path,
        mode: OperationMode,
    ) -> Result<(), TransferError> {
        if let Some(parent) = target.parent() {
            self.fs
                .create_dir_all(parent)
                .map_err(|source| TransferError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        match mode {
            OperationMode::Copy => self.copy(source, target),
            OperationMode::Move => self.move_file(source, target),
        }
    }

    fn copy(&self, source: &Path, target: &Path) -> Result<(), TransferError> {
        self.fs
            .copy(source, target)
            .map(|_| ())
            .map_err(|e| TransferError::Copy {
                from: source.to_path_buf(),
                to: target.to_path_buf(),
                source: e,
            })
    }

    fn move_file(&self, source: &Path, target: &Path) -> Result<(), TransferError> {
        match self.fs.rename(source, target) {
            Ok(()) => Ok(()),
            Err(e) if is_cross_device(&e) => {
                debug!(from = %source.display(), "rename crosses devices, copying instead");
                self.copy_then_remove(source, target)
            }
            Err(e) => Err(TransferError::Rename {
                from: source.to_path_buf(),
                to: target.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Copy, check the size, then delete the source
    fn copy_then_remove(&self, source: &Path, target: &Path) -> Result<(), TransferError> {
        let copy_error = |e| TransferError::Copy {
            from: source.to_path_buf(),
            to: target.to_path_buf(),
            source: e,
        };

        let expected = self.fs.file_size(source).map_err(copy_error)?;

        if let Err(e) = self.fs.copy(source, target) {
            self.discard_partial(target);
            return Err(copy_error(e));
        }

        let actual = self.fs.file_size(target).map_err(copy_error)?;
        if actual != expected {
            self.discard_partial(target);
            return Err(TransferError::VerificationFailed {
                from: source.to_path_buf(),
                expected,
                actual,
            });
        }

        self.fs
            .remove_file(source)
            .map_err(|e| TransferError::RemoveSource {
                from: source.to_path_buf(),
                source: e,
            })
    }

    fn discard_partial(&self, target: &Path) {
        if self.fs.exists(target) {
            if let Err(e) = self.fs.remove_file(target) {
                warn!(path = %target.display(), "failed to remove partial copy: {e}");
            }
        }
    }
}
