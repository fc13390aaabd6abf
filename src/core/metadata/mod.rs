//! # Metadata Module
//!
//! Per-file records consumed by the placement pipeline.
//!
//! ## Extracted Fields
//! - Capture date (EXIF DateTimeOriginal, falling back to DateTime; the movie
//!   header creation time for ISO-BMFF video)
//! - GPS latitude / longitude
//! - Camera model
//! - Filesystem creation time (modification time where creation is unavailable)
//! - Media duration (seconds, `0` for still images)
//!
//! Reading is behind [`MetadataProcessor`] so the pipeline can be driven by
//! any extractor. [`ExifProcessor`] is the built-in one.

mod gather;
mod video;

pub use gather::{gather_file_info, GatherFileInfoResult};

use crate::error::MetadataError;
use chrono::{DateTime, Local, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Metadata read from inside the file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    /// When the photo or video was taken (camera wall-clock time)
    pub capture_date: Option<NaiveDateTime>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    /// Camera model (e.g., "iPhone 15 Pro")
    pub camera_model: Option<String>,
}

/// Filesystem facts about the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStats {
    /// Creation time in local wall-clock time
    pub created: NaiveDateTime,
}

/// Playback facts about the file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds, `0.0` for still images
    pub duration_secs: f64,
}

/// Everything known about one file, produced once and never modified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub metadata: CaptureMetadata,
    pub file_stats: FileStats,
    pub media: MediaInfo,
}

impl FileInfo {
    /// Capture date, or the filesystem creation date when there is none
    pub fn best_date(&self) -> NaiveDateTime {
        self.metadata.capture_date.unwrap_or(self.file_stats.created)
    }

    /// Both coordinates, only when both are present
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.metadata.gps_latitude, self.metadata.gps_longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn is_video(&self) -> bool {
        self.media.duration_secs > 0.0
    }
}

/// Source of [`FileInfo`] records.
///
/// Implementations are called from several threads at once.
pub trait MetadataProcessor: Send + Sync {
    /// Read everything the placement pipeline needs to know about `path`
    fn process_file(&self, path: &Path) -> Result<FileInfo, MetadataError>;
}

/// Extensions whose containers kamadak-exif can parse; a parse failure on
/// one of these means the file is damaged
const EXIF_CONTAINERS: &[&str] = &[
    "jpg", "jpeg", "tif", "tiff", "heic", "heif", "png", "webp", "dng", "nef", "cr2", "arw",
    "orf", "rw2",
];

/// Extensions carrying an ISO-BMFF movie header
const MOVIE_CONTAINERS: &[&str] = &["mp4", "mov", "m4v", "3gp"];

/// Reads EXIF from images and the movie header from ISO-BMFF video
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifProcessor;

impl ExifProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataProcessor for ExifProcessor {
    fn process_file(&self, path: &Path) -> Result<FileInfo, MetadataError> {
        let stats = fs::metadata(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let created = stats
            .created()
            .or_else(|_| stats.modified())
            .map_err(|source| MetadataError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let created = DateTime::<Local>::from(created).naive_local();

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let (metadata, media) = if MOVIE_CONTAINERS.contains(&ext.as_str()) {
            let header = video::read_movie_header(path)
                .map_err(|source| MetadataError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
                .ok_or_else(|| MetadataError::Corrupt {
                    path: path.to_path_buf(),
                    reason: "no movie header found".to_string(),
                })?;
            (
                CaptureMetadata {
                    capture_date: header.created,
                    ..Default::default()
                },
                MediaInfo {
                    duration_secs: header.duration_secs,
                },
            )
        } else {
            (read_exif(path, &ext)?, MediaInfo::default())
        };

        Ok(FileInfo {
            path: path.to_path_buf(),
            metadata,
            file_stats: FileStats { created },
            media,
        })
    }
}

/// Extract capture metadata from a file's EXIF block
fn read_exif(path: &Path, ext: &str) -> Result<CaptureMetadata, MetadataError> {
    let file = File::open(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut bufreader = BufReader::new(&file);
    let exif = match Reader::new().read_from_container(&mut bufreader) {
        Ok(exif) => exif,
        Err(exif::Error::Io(source)) => {
            return Err(MetadataError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(exif::Error::InvalidFormat(reason)) if EXIF_CONTAINERS.contains(&ext) => {
            return Err(MetadataError::Corrupt {
                path: path.to_path_buf(),
                reason: reason.to_string(),
            })
        }
        // No EXIF block, or a container kamadak-exif does not read
        Err(_) => return Ok(CaptureMetadata::default()),
    };

    let capture_date = [Tag::DateTimeOriginal, Tag::DateTime]
        .into_iter()
        .filter_map(|tag| exif.get_field(tag, In::PRIMARY))
        .filter_map(|field| get_string_value(&field.value))
        .find_map(|s| parse_exif_datetime(&s));

    let camera_model = exif
        .get_field(Tag::Model, In::PRIMARY)
        .and_then(|field| get_string_value(&field.value));

    Ok(CaptureMetadata {
        capture_date,
        gps_latitude: gps_coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S"),
        gps_longitude: gps_coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W"),
        camera_model,
    })
}

/// Parse "YYYY:MM:DD HH:MM:SS" (or the dashed variant some writers use)
fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim_matches('"').trim();
    ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Degrees/minutes/seconds to signed decimal degrees
fn gps_coordinate(exif: &exif::Exif, value_tag: Tag, ref_tag: Tag, negative_ref: &str) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let parts: Vec<f64> = match field.value {
        Value::Rational(ref v) if !v.is_empty() => v.iter().map(|r| r.to_f64()).collect(),
        _ => return None,
    };

    let degrees = parts[0]
        + parts.get(1).copied().unwrap_or(0.0) / 60.0
        + parts.get(2).copied().unwrap_or(0.0) / 3600.0;
    if !degrees.is_finite() {
        return None;
    }

    let negative = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(|f| get_string_value(&f.value))
        .map(|r| r.eq_ignore_ascii_case(negative_ref))
        .unwrap_or(false);

    Some(if negative { -degrees } else { degrees })
}

/// Helper to extract string from EXIF ASCII value
fn get_string_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        if let Some(bytes) = vec.first() {
            if let Ok(s) = std::str::from_utf8(bytes) {
                let trimmed = s.trim_end_matches('\0').trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::TempDir;

    pub(crate) fn file_info(path: &str, capture: Option<NaiveDateTime>) -> FileInfo {
        FileInfo {
            path: PathBuf::from(path),
            metadata: CaptureMetadata {
                capture_date: capture,
                ..Default::default()
            },
            file_stats: FileStats {
                created: NaiveDate::from_ymd_opt(2020, 2, 29)
                    .unwrap()
                    .and_hms_opt(18, 5, 9)
                    .unwrap(),
            },
            media: MediaInfo::default(),
        }
    }

    #[test]
    fn best_date_prefers_capture_date() {
        let taken = NaiveDate::from_ymd_opt(2023, 7, 4)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(file_info("/a.jpg", Some(taken)).best_date(), taken);

        let fallback = file_info("/a.jpg", None);
        assert_eq!(fallback.best_date(), fallback.file_stats.created);
    }

    #[test]
    fn coordinates_need_both_axes() {
        let mut info = file_info("/a.jpg", None);
        info.metadata.gps_latitude = Some(51.5);
        assert_eq!(info.coordinates(), None);

        info.metadata.gps_longitude = Some(0.0);
        assert_eq!(info.coordinates(), Some((51.5, 0.0)));
    }

    #[test]
    fn parse_exif_datetime_accepts_both_separators() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_exif_datetime("2024:01:15 14:30:00"), Some(expected));
        assert_eq!(parse_exif_datetime("\"2024-01-15 14:30:00\""), Some(expected));
        assert_eq!(parse_exif_datetime("0000:00:00 00:00:00"), None);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = ExifProcessor::new().process_file(Path::new("/nonexistent/file.jpg"));
        assert!(matches!(result, Err(MetadataError::Io { .. })));
    }

    #[test]
    fn garbage_jpeg_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.jpg");
        fs::write(&path, b"this is not a valid image file").unwrap();

        let result = ExifProcessor::new().process_file(&path);
        assert!(matches!(result, Err(MetadataError::Corrupt { .. })));
    }

    #[test]
    fn unparsed_container_still_yields_file_stats() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("anim.gif");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"GIF89a").unwrap();

        let info = ExifProcessor::new().process_file(&path).unwrap();
        assert_eq!(info.path, path);
        assert_eq!(info.metadata, CaptureMetadata::default());
        assert!(!info.is_video());
    }
}
