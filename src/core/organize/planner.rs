//! Destination resolution: template expansion plus collision handling.

use super::executor::Filesystem;
use super::template::{random_suffix, PathTemplate};
use crate::core::metadata::FileInfo;
use crate::error::TemplateError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Random-suffix retries after the initial candidate is taken
pub const MAX_COLLISION_RETRIES: usize = 100;

/// Destinations handed out during one run.
///
/// Claiming checks the filesystem and records the path under one lock, so two
/// concurrent placements can never be given the same destination.
#[derive(Debug, Default)]
pub struct PathReservations {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl PathReservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `path` if nothing occupies it yet; `false` when taken
    pub fn claim(&self, path: &Path, fs: &dyn Filesystem) -> bool {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        if claimed.contains(path) || fs.exists(path) {
            return false;
        }
        claimed.insert(path.to_path_buf());
        true
    }
}

/// Resolves where a file goes
pub struct OrganizePlanner;

impl OrganizePlanner {
    /// Render `template` for `source` under `target_dir` and resolve collisions.
    ///
    /// `is_taken` is asked about each candidate; it must return `true` when
    /// the candidate cannot be used.
    pub fn generate_target_path<F>(
        template: &PathTemplate,
        target_dir: &Path,
        info: &FileInfo,
        source: &Path,
        is_taken: F,
    ) -> Result<PathBuf, TemplateError>
    where
        F: FnMut(&Path) -> bool,
    {
        let rendered = template.render(info, source);
        let directory = rendered
            .directory
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(target_dir.to_path_buf(), |dir, segment| dir.join(segment));

        Self::resolve_collision(&directory, &rendered.filename, source, is_taken)
    }

    /// `directory/filename`, or `directory/{stem}_{8 hex}{.ext}` when taken.
    ///
    /// Gives up after [`MAX_COLLISION_RETRIES`] random suffixes.
    pub fn resolve_collision<F>(
        directory: &Path,
        filename: &str,
        source: &Path,
        mut is_taken: F,
    ) -> Result<PathBuf, TemplateError>
    where
        F: FnMut(&Path) -> bool,
    {
        let candidate = directory.join(filename);
        if !is_taken(&candidate) {
            return Ok(candidate);
        }

        let (stem, ext) = split_extension(filename);
        for _ in 0..MAX_COLLISION_RETRIES {
            let candidate = directory.join(format!("{stem}_{}{ext}", random_suffix()));
            if !is_taken(&candidate) {
                return Ok(candidate);
            }
        }

        Err(TemplateError::CollisionExhausted {
            source_path: source.to_path_buf(),
            attempts: MAX_COLLISION_RETRIES,
        })
    }
}

/// `("IMG_1", ".jpg")`; a leading dot alone does not start an extension
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(i) if i > 0 => filename.split_at(i),
        _ => (filename, ""),
    }
}
