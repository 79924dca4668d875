//! Snapshot directory names
//!
//! A snapshot is named after the local instant it was created:
//! `YYYYMMDD_HHMMSS.ffff.szb`, where `ffff` is the fractional second truncated
//! to hundred-microsecond resolution. The name is the only record of the
//! timestamp, so formatting and parsing must agree exactly.
//!
//! [`NamePattern`] locates a snapshot name inside a longer path string. The
//! production implementation, [`SnapshotNamePattern`], matches the fixed
//! grammar `2ddd[0-1]d[0-3]d_[0-2]d[0-5]d[0-5]d.dddd.szb` byte by byte.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use std::ops::Range;

/// Suffix shared by every snapshot directory
pub const SNAPSHOT_EXTENSION: &str = ".szb";

/// Name of the relative symlink pointing at the newest snapshot
pub const LATEST_LINK: &str = "latest";

/// Glob matching snapshot directory names
pub const SNAPSHOT_GLOB: &str = "*.szb";

/// `YYYYMMDD_HHMMSS.ffff`
const STAMP_LEN: usize = 20;

/// Inclusive byte ranges, one per position of a snapshot name
const GRAMMAR: [(u8, u8); STAMP_LEN + 4] = [
    (b'2', b'2'),
    (b'0', b'9'),
    (b'0', b'9'),
    (b'0', b'9'),
    (b'0', b'1'),
    (b'0', b'9'),
    (b'0', b'3'),
    (b'0', b'9'),
    (b'_', b'_'),
    (b'0', b'2'),
    (b'0', b'9'),
    (b'0', b'5'),
    (b'0', b'9'),
    (b'0', b'5'),
    (b'0', b'9'),
    (b'.', b'.'),
    (b'0', b'9'),
    (b'0', b'9'),
    (b'0', b'9'),
    (b'0', b'9'),
    (b'.', b'.'),
    (b's', b's'),
    (b'z', b'z'),
    (b'b', b'b'),
];

/// Format an instant as a snapshot directory name
pub fn format_name(timestamp: &DateTime<Local>) -> String {
    // Leap seconds report nanoseconds past 1e9
    let tenths_of_millis = timestamp.nanosecond() % 1_000_000_000 / 100_000;
    format!(
        "{}.{:04}{}",
        timestamp.format("%Y%m%d_%H%M%S"),
        tenths_of_millis,
        SNAPSHOT_EXTENSION
    )
}

/// Parse a snapshot directory name back into a local instant
///
/// Returns `None` when the name does not have the snapshot layout, names an
/// impossible date or time, or names a local time skipped by a clock change.
/// Ambiguous local times resolve to the earlier instant.
pub fn parse_name(name: &str) -> Option<DateTime<Local>> {
    let naive = parse_stamp(name.strip_suffix(SNAPSHOT_EXTENSION)?)?;
    Local.from_local_datetime(&naive).earliest()
}

fn parse_stamp(stamp: &str) -> Option<NaiveDateTime> {
    let bytes = stamp.as_bytes();
    if bytes.len() != STAMP_LEN || bytes[8] != b'_' || bytes[15] != b'.' {
        return None;
    }

    let field = |range: Range<usize>| -> Option<u32> {
        let digits = &bytes[range];
        if !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }
        Some(digits.iter().fold(0, |acc, d| acc * 10 + u32::from(d - b'0')))
    };

    let date = NaiveDate::from_ymd_opt(
        i32::try_from(field(0..4)?).ok()?,
        field(4..6)?,
        field(6..8)?,
    )?;
    let time = NaiveTime::from_hms_nano_opt(
        field(9..11)?,
        field(11..13)?,
        field(13..15)?,
        field(16..20)? * 100_000,
    )?;

    Some(date.and_time(time))
}

/// Locates the first snapshot name inside a path string
pub trait NamePattern {
    /// Byte range of the first match in `haystack`
    fn find_in(&self, haystack: &str) -> Option<Range<usize>>;
}

/// Matches the snapshot name grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotNamePattern;

impl NamePattern for SnapshotNamePattern {
    fn find_in(&self, haystack: &str) -> Option<Range<usize>> {
        haystack
            .as_bytes()
            .windows(GRAMMAR.len())
            .position(|window| {
                window
                    .iter()
                    .zip(GRAMMAR.iter())
                    .all(|(b, (lo, hi))| (lo..=hi).contains(&b))
            })
            .map(|start| start..start + GRAMMAR.len())
    }
}

/// Literal substring match
impl NamePattern for str {
    fn find_in(&self, haystack: &str) -> Option<Range<usize>> {
        haystack.find(self).map(|start| start..start + self.len())
    }
}
