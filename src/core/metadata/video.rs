//! Movie header (`moov/mvhd`) reader for ISO-BMFF containers (mp4, mov, m4v, 3gp).

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Fields of the movie header the organizer uses
#[derive(Debug, Clone, PartialEq)]
pub(super) struct MovieHeader {
    pub duration_secs: f64,
    /// Creation time, when the writer filled it in
    pub created: Option<NaiveDateTime>,
}

/// Read the movie header; `Ok(None)` when the file has no `moov/mvhd` box
pub(super) fn read_movie_header(path: &Path) -> io::Result<Option<MovieHeader>> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let Some((moov_start, moov_end)) = find_box(&mut reader, 0, len, b"moov")? else {
        return Ok(None);
    };
    let Some((mvhd_start, mvhd_end)) = find_box(&mut reader, moov_start, moov_end, b"mvhd")?
    else {
        return Ok(None);
    };

    reader.seek(SeekFrom::Start(mvhd_start))?;
    let mut version = [0u8; 4];
    reader.read_exact(&mut version)?;

    let (creation, timescale, duration, header_len) = if version[0] == 1 {
        let creation = read_u64(&mut reader)?;
        let _modification = read_u64(&mut reader)?;
        let timescale = read_u32(&mut reader)?;
        (creation, timescale, read_u64(&mut reader)?, 32)
    } else {
        let creation = u64::from(read_u32(&mut reader)?);
        let _modification = read_u32(&mut reader)?;
        let timescale = read_u32(&mut reader)?;
        (creation, timescale, u64::from(read_u32(&mut reader)?), 20)
    };

    if mvhd_end - mvhd_start < header_len || timescale == 0 {
        return Ok(None);
    }

    Ok(Some(MovieHeader {
        duration_secs: duration as f64 / f64::from(timescale),
        created: mac_epoch_to_datetime(creation),
    }))
}

/// Scan sibling boxes in `[start, end)` for `kind`; returns its payload range
fn find_box<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    end: u64,
    kind: &[u8; 4],
) -> io::Result<Option<(u64, u64)>> {
    let mut pos = start;

    while pos.checked_add(8).is_some_and(|header_end| header_end <= end) {
        reader.seek(SeekFrom::Start(pos))?;
        let size = read_u32(reader)?;
        let mut box_type = [0u8; 4];
        reader.read_exact(&mut box_type)?;

        let (header, size) = match size {
            0 => (8, end - pos),
            1 => (16, read_u64(reader)?),
            n => (8, u64::from(n)),
        };

        // Sizes come from the file: reject anything that overflows, overruns
        // the parent or fails to move forward
        let next = match pos.checked_add(size) {
            Some(next) if size >= header && next <= end => next,
            _ => return Ok(None),
        };
        if &box_type == kind {
            return Ok(Some((pos + header, next)));
        }
        pos = next;
    }

    Ok(None)
}

/// Movie timestamps count seconds from 1904-01-01 UTC; zero means unset
fn mac_epoch_to_datetime(seconds: u64) -> Option<NaiveDateTime> {
    if seconds == 0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1904, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let delta = TimeDelta::try_seconds(i64::try_from(seconds).ok()?)?;
    epoch.checked_add_signed(delta)
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}
