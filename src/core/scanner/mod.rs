//! # Scanner Module
//!
//! Discovers media files under a set of source roots.
//!
//! ## Supported Formats
//! - Images: jpg, jpeg, png, gif, webp, bmp, tiff, tif, heic, heif, avif
//! - Camera raw: raw, cr2, cr3, nef, dng, arw, raf, orf, rw2
//! - Video: mp4, mov, m4v, 3gp, avi, mkv, wmv, webm, mts, m2ts
//!
//! ## Example
//! ```rust,ignore
//! use media_organizer::core::scanner::{MediaScanner, ParallelScanner, ScanConfig};
//!
//! let scanner = ParallelScanner::new(ScanConfig::default());
//! let result = scanner.discover(&["/Volumes/card".into()])?;
//! for (ext, kind, count) in result.format_stats() {
//!     println!("{ext:<6}: {count:>8} ({kind})");
//! }
//! ```

mod filter;
mod walker;

pub use filter::MediaFilter;
pub use walker::{ParallelScanner, ScanConfig};

use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Still image extensions
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "tif", "heic", "heif", "avif",
];

/// Camera raw extensions
const RAW_EXTENSIONS: &[&str] = &["raw", "cr2", "cr3", "nef", "dng", "arw", "raf", "orf", "rw2"];

/// Video extensions
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "m4v", "3gp", "avi", "mkv", "wmv", "webm", "mts", "m2ts",
];

/// Broad media category of a file, derived from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Image,
    RawImage,
    Video,
    Unknown,
}

impl MediaType {
    /// Classify an extension. Case-insensitive; a leading dot is ignored.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_lowercase();
        let ext = ext.as_str();
        if IMAGE_EXTENSIONS.contains(&ext) {
            MediaType::Image
        } else if RAW_EXTENSIONS.contains(&ext) {
            MediaType::RawImage
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            MediaType::Video
        } else {
            MediaType::Unknown
        }
    }

    /// Display order for statistics
    pub fn rank(&self) -> u8 {
        match self {
            MediaType::Image => 0,
            MediaType::RawImage => 1,
            MediaType::Video => 2,
            MediaType::Unknown => 3,
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Image => write!(f, "image"),
            MediaType::RawImage => write!(f, "raw"),
            MediaType::Video => write!(f, "video"),
            MediaType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Every extension discovery accepts by default, lowercase and without a dot
pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    IMAGE_EXTENSIONS
        .iter()
        .chain(RAW_EXTENSIONS)
        .chain(VIDEO_EXTENSIONS)
        .copied()
}

/// Files found by a discovery run, grouped by extension
#[derive(Debug, Default)]
pub struct DiscoveryResult {
    /// Lowercase extension (no dot) to the files carrying it, sorted by path
    pub files_by_extension: BTreeMap<String, Vec<PathBuf>>,
    /// Directories visited, including ones that failed to list
    pub directories_scanned: usize,
    /// Total number of files across all extensions
    pub total_files: usize,
    /// Highest number of directory scans observed running at once
    pub max_in_flight: usize,
    /// Directories that could not be read (their subtrees are empty)
    pub errors: Vec<ScanError>,
}

impl DiscoveryResult {
    /// Group a flat list of discovered files by lowercase extension
    pub(crate) fn from_files(files: Vec<PathBuf>) -> Self {
        let mut files_by_extension: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        let total_files = files.len();

        for file in files {
            let ext = file
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            files_by_extension.entry(ext).or_default().push(file);
        }

        for paths in files_by_extension.values_mut() {
            paths.sort();
        }

        Self {
            files_by_extension,
            total_files,
            ..Default::default()
        }
    }

    /// All discovered files, in extension then path order
    pub fn all_files(&self) -> Vec<PathBuf> {
        self.files_by_extension.values().flatten().cloned().collect()
    }

    /// `(extension, type, count)` sorted by type rank, then count descending
    pub fn format_stats(&self) -> Vec<(String, MediaType, usize)> {
        let mut stats: Vec<_> = self
            .files_by_extension
            .iter()
            .map(|(ext, files)| (ext.clone(), MediaType::from_extension(ext), files.len()))
            .collect();

        stats.sort_by(|a, b| {
            a.1.rank()
                .cmp(&b.1.rank())
                .then_with(|| b.2.cmp(&a.2))
                .then_with(|| a.0.cmp(&b.0))
        });
        stats
    }
}

/// Trait for media discovery engines
///
/// Implement this trait to plug in a different traversal (e.g., for testing).
pub trait MediaScanner: Send + Sync {
    /// Discover supported files under every root
    fn discover(&self, roots: &[PathBuf]) -> Result<DiscoveryResult, ScanError>;

    /// Discover with progress reporting via events
    fn discover_with_events(
        &self,
        roots: &[PathBuf],
        events: &EventSender,
    ) -> Result<DiscoveryResult, ScanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(MediaType::from_extension("jpg"), MediaType::Image);
        assert_eq!(MediaType::from_extension("JPG"), MediaType::Image);
        assert_eq!(MediaType::from_extension("HEIC"), MediaType::Image);
        assert_eq!(MediaType::from_extension(".mov"), MediaType::Video);
        assert_eq!(MediaType::from_extension("NEF"), MediaType::RawImage);
    }

    #[test]
    fn unknown_extension_is_represented_not_rejected() {
        assert_eq!(MediaType::from_extension("txt"), MediaType::Unknown);
        assert_eq!(MediaType::from_extension(""), MediaType::Unknown);
    }

    #[test]
    fn every_supported_extension_classifies() {
        for ext in supported_extensions() {
            assert_ne!(MediaType::from_extension(ext), MediaType::Unknown, "{ext}");
        }
    }

    #[test]
    fn from_files_groups_by_lowercase_extension() {
        let result = DiscoveryResult::from_files(vec![
            PathBuf::from("/b/IMG_2.JPG"),
            PathBuf::from("/a/IMG_1.jpg"),
            PathBuf::from("/a/clip.mp4"),
        ]);

        assert_eq!(result.total_files, 3);
        assert_eq!(
            result.files_by_extension["jpg"],
            vec![PathBuf::from("/a/IMG_1.jpg"), PathBuf::from("/b/IMG_2.JPG")]
        );
        assert_eq!(result.files_by_extension["mp4"].len(), 1);
    }

    #[test]
    fn format_stats_orders_by_rank_then_count() {
        let result = DiscoveryResult::from_files(vec![
            PathBuf::from("/a.mp4"),
            PathBuf::from("/b.mp4"),
            PathBuf::from("/c.mp4"),
            PathBuf::from("/a.png"),
            PathBuf::from("/a.jpg"),
            PathBuf::from("/b.jpg"),
            PathBuf::from("/a.nef"),
        ]);

        let order: Vec<_> = result
            .format_stats()
            .into_iter()
            .map(|(ext, _, count)| (ext, count))
            .collect();

        assert_eq!(
            order,
            vec![
                ("jpg".to_string(), 2),
                ("png".to_string(), 1),
                ("nef".to_string(), 1),
                ("mp4".to_string(), 3),
            ]
        );
    }
}
