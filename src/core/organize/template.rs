//! Destination path templates.
//!
//! A template is a format string with `{TOKEN}` placeholders:
//!
//! | Token | Value |
//! |-------|-------|
//! | `I.<code>` | capture date |
//! | `F.<code>` | filesystem creation date |
//! | `D.<code>` | capture date, else filesystem creation date |
//! | `NAME`, `NAME.L`, `NAME.U` | original file stem as-is / lower / upper |
//! | `EXT` | lowercase extension without the dot |
//! | `RND` | 8 random hex characters |
//! | `GEO` | `lat_lon` to 2 decimals, empty without GPS |
//! | `CAM` | camera model, empty without one |
//! | `TYPE` | `Video` or `Image` |
//! | `HAS.GEO`, `HAS.CAM`, `HAS.DATE` | `GeoTagged`/`NoGeo`, `WithCamera`/`NoCamera`, `Dated`/`NoDate` |
//!
//! Date codes: `YYYY YY MMMM MMM MM M DD D DDDD DDD HH H hh h mm m ss s a A WW`.
//!
//! Substituted values may contain `/` to create subdirectories.

use crate::core::metadata::FileInfo;
use chrono::{Datelike, NaiveDateTime, Timelike};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use uuid::Uuid;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("token pattern is valid"));

/// Directory used when a template renders to nothing
pub const EMPTY_PATH_FALLBACK: &str = "NoDate";

/// Which timestamp a date token reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    /// `I.` - capture date only
    Capture,
    /// `F.` - filesystem creation date
    FileSystem,
    /// `D.` - capture date, falling back to the filesystem date
    Best,
}

/// How a date token renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCode {
    Year,
    YearShort,
    MonthName,
    MonthNameShort,
    MonthPadded,
    Month,
    DayPadded,
    Day,
    WeekdayName,
    WeekdayNameShort,
    Hour24Padded,
    Hour24,
    Hour12Padded,
    Hour12,
    MinutePadded,
    Minute,
    SecondPadded,
    Second,
    AmPmLower,
    AmPmUpper,
    IsoWeek,
}

impl DateCode {
    fn parse(code: &str) -> Option<Self> {
        let code = match code {
            "YYYY" => DateCode::Year,
            "YY" => DateCode::YearShort,
            "MMMM" => DateCode::MonthName,
            "MMM" => DateCode::MonthNameShort,
            "MM" => DateCode::MonthPadded,
            "M" => DateCode::Month,
            "DD" => DateCode::DayPadded,
            "D" => DateCode::Day,
            "DDDD" => DateCode::WeekdayName,
            "DDD" => DateCode::WeekdayNameShort,
            "HH" => DateCode::Hour24Padded,
            "H" => DateCode::Hour24,
            "hh" => DateCode::Hour12Padded,
            "h" => DateCode::Hour12,
            "mm" => DateCode::MinutePadded,
            "m" => DateCode::Minute,
            "ss" => DateCode::SecondPadded,
            "s" => DateCode::Second,
            "a" => DateCode::AmPmLower,
            "A" => DateCode::AmPmUpper,
            "WW" => DateCode::IsoWeek,
            _ => return None,
        };
        Some(code)
    }

    /// Render `date` in English
    pub fn format(&self, date: &NaiveDateTime) -> String {
        let (is_pm, hour12) = date.hour12();
        match self {
            DateCode::Year => date.year().to_string(),
            DateCode::YearShort => format!("{:02}", date.year().rem_euclid(100)),
            DateCode::MonthName => date.format("%B").to_string(),
            DateCode::MonthNameShort => date.format("%b").to_string(),
            DateCode::MonthPadded => format!("{:02}", date.month()),
            DateCode::Month => date.month().to_string(),
            DateCode::DayPadded => format!("{:02}", date.day()),
            DateCode::Day => date.day().to_string(),
            DateCode::WeekdayName => date.format("%A").to_string(),
            DateCode::WeekdayNameShort => date.format("%a").to_string(),
            DateCode::Hour24Padded => format!("{:02}", date.hour()),
            DateCode::Hour24 => date.hour().to_string(),
            DateCode::Hour12Padded => format!("{:02}", hour12),
            DateCode::Hour12 => hour12.to_string(),
            DateCode::MinutePadded => format!("{:02}", date.minute()),
            DateCode::Minute => date.minute().to_string(),
            DateCode::SecondPadded => format!("{:02}", date.second()),
            DateCode::Second => date.second().to_string(),
            DateCode::AmPmLower => label(is_pm, "pm", "am"),
            DateCode::AmPmUpper => label(is_pm, "PM", "AM"),
            DateCode::IsoWeek => format!("{:02}", date.iso_week().week()),
        }
    }
}

/// A recognised `{...}` placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Date(DateSource, DateCode),
    Name,
    NameLower,
    NameUpper,
    Ext,
    Random,
    Geo,
    Camera,
    MediaKind,
    HasGeo,
    HasCamera,
    HasDate,
}

impl Token {
    /// Parse the text between the braces; `None` for unknown keys
    pub fn parse(key: &str) -> Option<Self> {
        let token = match key {
            "NAME" => Token::Name,
            "NAME.L" => Token::NameLower,
            "NAME.U" => Token::NameUpper,
            "EXT" => Token::Ext,
            "RND" => Token::Random,
            "GEO" => Token::Geo,
            "CAM" => Token::Camera,
            "TYPE" => Token::MediaKind,
            "HAS.GEO" => Token::HasGeo,
            "HAS.CAM" => Token::HasCamera,
            "HAS.DATE" => Token::HasDate,
            _ => {
                let (prefix, code) = key.split_once('.')?;
                let source = match prefix {
                    "I" => DateSource::Capture,
                    "F" => DateSource::FileSystem,
                    "D" => DateSource::Best,
                    _ => return None,
                };
                Token::Date(source, DateCode::parse(code)?)
            }
        };
        Some(token)
    }

    fn resolve(&self, ctx: &TokenContext<'_>) -> String {
        let info = ctx.info;
        let camera = info
            .metadata
            .camera_model
            .as_deref()
            .filter(|model| !model.is_empty());

        match self {
            Token::Date(source, code) => {
                let date = match source {
                    DateSource::Capture => info.metadata.capture_date,
                    DateSource::FileSystem => Some(info.file_stats.created),
                    DateSource::Best => Some(info.best_date()),
                };
                date.map(|d| code.format(&d)).unwrap_or_default()
            }
            Token::Name => ctx.stem.to_string(),
            Token::NameLower => ctx.stem.to_lowercase(),
            Token::NameUpper => ctx.stem.to_uppercase(),
            Token::Ext => ctx.ext.clone(),
            Token::Random => random_suffix(),
            Token::Geo => info
                .coordinates()
                .map(|(lat, lon)| format!("{lat:.2}_{lon:.2}"))
                .unwrap_or_default(),
            Token::Camera => camera.unwrap_or_default().to_string(),
            Token::MediaKind => label(info.is_video(), "Video", "Image"),
            Token::HasGeo => label(info.coordinates().is_some(), "GeoTagged", "NoGeo"),
            Token::HasCamera => label(camera.is_some(), "WithCamera", "NoCamera"),
            Token::HasDate => label(info.metadata.capture_date.is_some(), "Dated", "NoDate"),
        }
    }
}

fn label(present: bool, yes: &str, no: &str) -> String {
    let value = if present { yes } else { no };
    value.to_string()
}

/// 8 lowercase hex characters, fresh on every call
pub fn random_suffix() -> String {
    format!("{:08x}", Uuid::new_v4().as_u128() as u32)
}

/// Per-file values the tokens draw on
struct TokenContext<'a> {
    info: &'a FileInfo,
    stem: String,
    ext: String,
}

impl<'a> TokenContext<'a> {
    fn new(info: &'a FileInfo, source: &Path) -> Self {
        Self {
            info,
            stem: source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            ext: source
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Token(Token),
    /// Placeholder with an unrecognised key; renders as nothing
    Unknown(String),
}

/// A format string compiled once per run
#[derive(Debug, Clone)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

/// A template expanded for one file, relative to the target directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPath {
    /// `/`-separated directory, possibly empty
    pub directory: String,
    pub filename: String,
}

impl PathTemplate {
    pub fn compile(format: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;

        for captures in TOKEN_PATTERN.captures_iter(format) {
            let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(format[last..whole.start()].to_string()));
            }
            segments.push(match Token::parse(key.as_str()) {
                Some(token) => Segment::Token(token),
                None => Segment::Unknown(key.as_str().to_string()),
            });
            last = whole.end();
        }
        if last < format.len() {
            segments.push(Segment::Literal(format[last..].to_string()));
        }

        Self { segments }
    }

    /// Whether any placeholder was recognised
    pub fn has_tokens(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Token(_)))
    }

    /// Placeholders that will render as nothing
    pub fn unknown_keys(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Unknown(key) => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Expand for one file and split into directory and filename
    pub fn render(&self, info: &FileInfo, source: &Path) -> RenderedPath {
        let ctx = TokenContext::new(info, source);

        let mut formatted = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => formatted.push_str(text),
                Segment::Token(token) => formatted.push_str(&sanitize_value(&token.resolve(&ctx))),
                Segment::Unknown(_) => {}
            }
        }

        let mut parts: Vec<&str> = formatted
            .split(['/', '\\'])
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .collect();
        if parts.is_empty() {
            parts.push(EMPTY_PATH_FALLBACK);
        }

        let names_file = parts
            .last()
            .and_then(|last| last.rsplit_once('.'))
            .is_some_and(|(_, suffix)| suffix == ctx.ext);

        let (directory, filename) = if names_file {
            let filename = parts.pop().unwrap_or_default().to_string();
            (parts.join("/"), filename)
        } else {
            let original = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (parts.join("/"), original)
        };

        RenderedPath {
            directory,
            filename: sanitize_filename(&filename),
        }
    }
}

/// Replace characters that are invalid in file names, keeping separators
fn sanitize_value(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect()
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::tests::file_info;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn render(format: &str, info: &FileInfo) -> RenderedPath {
        PathTemplate::compile(format).render(info, &info.path)
    }

    #[test]
    fn year_month_name_ext() {
        let info = file_info("/card/IMG_001.JPG", Some(at(2023, 7, 4, 9, 15, 0)));
        let rendered = render("{I.YYYY}/{I.MM}/{NAME}.{EXT}", &info);
        assert_eq!(rendered.directory, "2023/07");
        assert_eq!(rendered.filename, "IMG_001.jpg");
    }

    #[test]
    fn empty_format_falls_back_to_nodate_and_original_name() {
        let info = file_info("/card/IMG_001.JPG", None);
        let rendered = render("", &info);
        assert_eq!(rendered.directory, "NoDate");
        assert_eq!(rendered.filename, "IMG_001.JPG");
    }

    #[test]
    fn missing_capture_date_renders_empty() {
        let info = file_info("/card/a.jpg", None);
        let rendered = render("{I.YYYY}/{I.MMMM}/x", &info);
        assert_eq!(rendered.directory, "x");
        assert_eq!(rendered.filename, "a.jpg");
    }

    #[test]
    fn best_date_falls_back_to_filesystem_date() {
        let info = file_info("/card/a.jpg", None);
        let codes = "{X.YYYY}-{X.MM}-{X.DD} {X.HH}{X.mm}{X.ss} {X.DDDD} {X.WW}";
        let with_d = render(&codes.replace('X', "D"), &info);
        let with_f = render(&codes.replace('X', "F"), &info);
        assert_eq!(with_d, with_f);
        assert_eq!(with_d.directory, "2020-02-29 180509 Saturday 09");
    }

    #[test]
    fn every_date_code() {
        let info = file_info("/a.jpg", Some(at(2024, 1, 5, 15, 7, 3)));
        let cases = [
            ("YYYY", "2024"),
            ("YY", "24"),
            ("MMMM", "January"),
            ("MMM", "Jan"),
            ("MM", "01"),
            ("M", "1"),
            ("DD", "05"),
            ("D", "5"),
            ("DDDD", "Friday"),
            ("DDD", "Fri"),
            ("HH", "15"),
            ("H", "15"),
            ("hh", "03"),
            ("h", "3"),
            ("mm", "07"),
            ("m", "7"),
            ("ss", "03"),
            ("s", "3"),
            ("a", "pm"),
            ("A", "PM"),
            ("WW", "01"),
        ];
        for (code, expected) in cases {
            let rendered = render(&format!("{{I.{code}}}"), &info);
            assert_eq!(rendered.directory, expected, "code {code}");
        }
    }

    #[test]
    fn twelve_hour_clock_at_midnight_and_noon() {
        let midnight = file_info("/a.jpg", Some(at(2024, 3, 1, 0, 0, 0)));
        assert_eq!(render("{I.h}{I.a}", &midnight).directory, "12am");
        let noon = file_info("/a.jpg", Some(at(2024, 3, 1, 12, 0, 0)));
        assert_eq!(render("{I.hh}{I.A}", &noon).directory, "12PM");
    }

    #[test]
    fn iso_week_uses_nearest_thursday() {
        // 2021-01-03 is a Sunday belonging to week 53 of 2020
        let info = file_info("/a.jpg", Some(at(2021, 1, 3, 0, 0, 0)));
        assert_eq!(render("{I.WW}", &info).directory, "53");
        // 2024-12-30 is a Monday in week 1 of 2025
        let info = file_info("/a.jpg", Some(at(2024, 12, 30, 0, 0, 0)));
        assert_eq!(render("{I.WW}", &info).directory, "01");
    }

    #[test]
    fn name_variants_and_extension() {
        let info = file_info("/in/Holiday Pic.HEIC", None);
        let rendered = render("{NAME.L}/{NAME.U}/{NAME}_{EXT}", &info);
        assert_eq!(rendered.directory, "holiday pic/HOLIDAY PIC/Holiday Pic_heic");
        assert_eq!(rendered.filename, "Holiday Pic.HEIC");
    }

    #[test]
    fn geo_camera_and_presence_labels() {
        let mut info = file_info("/a.jpg", None);
        assert_eq!(
            render("{HAS.GEO}/{HAS.CAM}/{HAS.DATE}/{GEO}{CAM}", &info).directory,
            "NoGeo/NoCamera/NoDate"
        );

        info.metadata.gps_latitude = Some(48.858_37);
        info.metadata.gps_longitude = Some(-2.294_48);
        info.metadata.camera_model = Some("Pixel 8".to_string());
        info.metadata.capture_date = Some(at(2024, 1, 1, 0, 0, 0));
        assert_eq!(
            render("{HAS.GEO}/{HAS.CAM}/{HAS.DATE}/{GEO}/{CAM}", &info).directory,
            "GeoTagged/WithCamera/Dated/48.86_-2.29/Pixel 8"
        );
    }

    #[test]
    fn type_reflects_duration() {
        let mut info = file_info("/clip.mp4", None);
        assert_eq!(render("{TYPE}", &info).directory, "Image");
        info.media.duration_secs = 3.2;
        assert_eq!(render("{TYPE}", &info).directory, "Video");
    }

    #[test]
    fn random_token_is_eight_hex_chars() {
        let info = file_info("/a.jpg", None);
        let first = render("{RND}", &info).directory;
        let second = render("{RND}", &info).directory;
        assert_eq!(first.len(), 8);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(first, second);
    }

    #[test]
    fn substituted_values_are_sanitized_but_may_add_directories() {
        let mut info = file_info("/a.jpg", None);
        info.metadata.camera_model = Some("Canon: EOS/R5?".to_string());
        let rendered = render("cams/{CAM}", &info);
        assert_eq!(rendered.directory, "cams/Canon_ EOS/R5_");
    }

    #[test]
    fn separators_are_normalized() {
        let info = file_info("/a.jpg", Some(at(2022, 5, 1, 0, 0, 0)));
        let rendered = render("//{I.YYYY}\\\\{I.MM}///", &info);
        assert_eq!(rendered.directory, "2022/05");
    }

    #[test]
    fn parent_segments_cannot_escape_the_target() {
        let mut info = file_info("/a.jpg", None);
        info.metadata.camera_model = Some("../../etc".to_string());
        assert_eq!(render("{CAM}/x", &info).directory, "etc/x");
    }

    #[test]
    fn last_segment_with_other_extension_is_a_directory() {
        let info = file_info("/in/photo.png", None);
        let rendered = render("v1.2/{NAME}.jpg", &info);
        assert_eq!(rendered.directory, "v1.2/photo.jpg");
        assert_eq!(rendered.filename, "photo.png");
    }

    #[test]
    fn unknown_tokens_render_empty() {
        let template = PathTemplate::compile("{NOPE}/{NAME}.{EXT}");
        assert_eq!(template.unknown_keys(), vec!["NOPE"]);
        assert!(template.has_tokens());

        let info = file_info("/in/a.jpg", None);
        let rendered = template.render(&info, &info.path);
        assert_eq!(rendered.directory, "");
        assert_eq!(rendered.filename, "a.jpg");
    }

    #[test]
    fn literal_only_template_has_no_tokens() {
        assert!(!PathTemplate::compile("Sorted/Photos").has_tokens());
    }

    #[test]
    fn rendering_is_deterministic_without_rnd() {
        let mut info = file_info("/in/IMG_9.jpg", Some(at(2019, 11, 30, 23, 59, 59)));
        info.metadata.camera_model = Some("X100V".to_string());
        let format = "{D.YYYY}/{D.MMMM}/{CAM}/{HAS.GEO}/{NAME.L}_{I.HH}{I.mm}.{EXT}";
        assert_eq!(render(format, &info), render(format, &info));
    }
}
