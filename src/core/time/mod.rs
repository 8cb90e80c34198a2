//! Business-timezone time handling: stamp parsing, bucket math, slot keys.
//!
//! All bucket semantics are defined in one fixed timezone (UTC+8 unless
//! overridden). The tracked business day runs 09:00 → 24:00; readings stamped
//! before the business start belong to the day that just ended and land on
//! that day's final bucket.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// First clock hour of the tracked business day.
pub const BUSINESS_START_HOUR: u32 = 9;

fn offset_hours() -> i32 {
    static OFFSET: OnceLock<i32> = OnceLock::new();
    *OFFSET.get_or_init(|| {
        std::env::var("SHOPWATCH_TZ_OFFSET_HOURS")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .filter(|h| (-23..=23).contains(h))
            .unwrap_or(8)
    })
}

/// The fixed business timezone.
pub fn business_offset() -> FixedOffset {
    FixedOffset::east_opt(offset_hours() * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(8 * 3600).unwrap())
}

/// The two canonical grid resolutions for one business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grid {
    /// 16 hourly buckets covering hours 9..24.
    Hour,
    /// 46 twenty-minute buckets covering 09:00..24:00.
    Fine,
}

impl Grid {
    pub fn bucket_count(self) -> usize {
        match self {
            Grid::Hour => 16,
            Grid::Fine => 46,
        }
    }

    pub fn bucket_minutes(self) -> u32 {
        match self {
            Grid::Hour => 60,
            Grid::Fine => 20,
        }
    }

    /// Stable label for bucket `index`: hour grid uses bare hour numbers
    /// ("9".."24"), fine grid uses zero-padded clock labels ("09:00".."24:00").
    pub fn bucket_label(self, index: usize) -> String {
        let minutes = index as u32 * self.bucket_minutes();
        let hour = BUSINESS_START_HOUR + minutes / 60;
        match self {
            Grid::Hour => hour.to_string(),
            Grid::Fine => format!("{:02}:{:02}", hour, minutes % 60),
        }
    }

    pub fn labels(self) -> Vec<String> {
        (0..self.bucket_count()).map(|i| self.bucket_label(i)).collect()
    }
}

/// A wall-clock reading reduced to the business timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessStamp {
    pub date: NaiveDate,
    pub hour: u32,
    pub minute: u32,
}

/// One addressable slot of a business day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bucket {
    pub date: NaiveDate,
    pub index: usize,
}

fn looks_like_iso(s: &str) -> bool {
    if s.len() < 16 || !s.contains('T') {
        return false;
    }
    s.contains('Z') || s.contains('+') || s.as_bytes().get(13) == Some(&b':')
}

fn parse_iso(s: &str) -> Option<BusinessStamp> {
    let local: DateTime<FixedOffset> = match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => dt.with_timezone(&business_offset()),
        // No offset designator: the stamp is already business-local.
        Err(_) => {
            let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
                .ok()?;
            naive.and_local_timezone(business_offset()).single()?
        }
    };
    Some(BusinessStamp {
        date: local.date_naive(),
        hour: chrono::Timelike::hour(&local),
        minute: chrono::Timelike::minute(&local),
    })
}

fn parse_compact(s: &str) -> Option<BusinessStamp> {
    let date = NaiveDate::parse_from_str(s.get(0..10)?, "%Y-%m-%d").ok()?;
    match s.as_bytes().get(10) {
        Some(b':') | Some(b' ') => {}
        _ => return None,
    }
    let hour: u32 = s.get(11..13)?.parse().ok()?;
    let minute: u32 = s.get(14..16)?.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(BusinessStamp { date, hour, minute })
}

/// Parse a persisted timestamp into a business-timezone stamp.
///
/// Two encodings are accepted and must agree on bucketing: the compact
/// business-local form `YYYY-MM-DD:HH:mm:ss` and ISO-8601 (any offset, or
/// offsetless meaning business-local). Anything else is `None`.
pub fn parse_stamp(raw: &str) -> Option<BusinessStamp> {
    let s = raw.trim();
    if s.len() < 16 {
        return None;
    }
    if looks_like_iso(s) {
        parse_iso(s)
    } else {
        parse_compact(s)
    }
}

/// Map a stamp onto its `(date, bucket)` slot at the given resolution.
///
/// Readings before the business start are folded onto the previous calendar
/// date's final bucket: a post-midnight residual reading describes the day
/// that just ended.
pub fn bucket_for(stamp: &BusinessStamp, grid: Grid) -> Option<Bucket> {
    if stamp.hour < BUSINESS_START_HOUR {
        let date = stamp.date.pred_opt()?;
        return Some(Bucket { date, index: grid.bucket_count() - 1 });
    }
    let minutes = (stamp.hour - BUSINESS_START_HOUR) * 60 + stamp.minute;
    let index = ((minutes / grid.bucket_minutes()) as usize).min(grid.bucket_count() - 1);
    Some(Bucket { date: stamp.date, index })
}

/// `parse_stamp` + `bucket_for` in one step.
pub fn parse_bucket(raw: &str, grid: Grid) -> Option<Bucket> {
    bucket_for(&parse_stamp(raw)?, grid)
}

/// Throttle slot key for a stamp, e.g. `"2025-02-24:09:20"` at 20 minutes.
/// Same slot key ⇒ the sink already wrote this window for the source.
pub fn slot_key(stamp: &BusinessStamp, throttle_minutes: u32) -> String {
    let throttle = throttle_minutes.max(1);
    let slot_minute = stamp.minute / throttle * throttle;
    format!("{}:{:02}:{:02}", stamp.date.format("%Y-%m-%d"), stamp.hour, slot_minute)
}

/// Current time as the compact business-local encoding used in `recorded_at`.
pub fn now_compact() -> String {
    Utc::now()
        .with_timezone(&business_offset())
        .format("%Y-%m-%d:%H:%M:%S")
        .to_string()
}

/// Convert the compact encoding into ISO-8601 with the business offset,
/// suitable for a `timestamptz` column. Unrecognized input passes through.
pub fn compact_to_iso(recorded_at: &str) -> String {
    let s = recorded_at.trim();
    if s.len() >= 19 && s.as_bytes().get(10) == Some(&b':') {
        let off = offset_hours();
        let (sign, abs) = if off < 0 { ('-', -off) } else { ('+', off) };
        return format!("{}T{}{}{:02}:00", &s[0..10], &s[11..19], sign, abs);
    }
    s.to_string()
}

/// `YYYY-MM-DD` prefix of a date-bearing string, if well formed.
pub fn date_only(s: &str) -> Option<&str> {
    let head = s.trim().get(0..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()?;
    Some(head)
}
