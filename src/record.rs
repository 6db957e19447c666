use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One player's point total in one 4-player match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResultRecord {
    /// `YYYYMMDD`.
    pub date: String,
    /// 1-based position of the match within its date.
    pub match_index: u32,
    pub player: String,
    pub point: f64,
    pub owner: String,
}

impl MatchResultRecord {
    pub fn match_uid(&self) -> String {
        match_uid(&self.date, self.match_index)
    }

    /// Identity used for deduplication and multiset comparison.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            date: self.date.clone(),
            match_index: self.match_index,
            player: self.player.clone(),
            point_tenths: point_tenths(self.point),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub date: String,
    pub match_index: u32,
    pub player: String,
    pub point_tenths: i64,
}

pub fn match_uid(date: &str, match_index: u32) -> String {
    format!("{date}_{match_index}")
}

pub const MATCH_SIZE: usize = 4;

pub fn round_point(point: f64) -> f64 {
    (point * 10.0).round() / 10.0
}

pub fn point_tenths(point: f64) -> i64 {
    (point * 10.0).round() as i64
}

/// Inclusive `[start_date, end_date]` window of one season, both `YYYYMMDD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeasonWindow {
    pub start_date: String,
    pub end_date: String,
}

impl SeasonWindow {
    pub fn new(start: &str, end: &str) -> Option<Self> {
        let start_date = normalize_date(start)?;
        let end_date = normalize_date(end)?;
        if start_date > end_date {
            return None;
        }
        Some(Self {
            start_date,
            end_date,
        })
    }

    /// `date` must already be `YYYYMMDD`; lexical order equals calendar order.
    pub fn contains(&self, date: &str) -> bool {
        self.start_date.as_str() <= date && date <= self.end_date.as_str()
    }
}

impl fmt::Display for SeasonWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_date, self.end_date)
    }
}

/// Why a token, cell or record was left out. Fail-soft stages count these
/// instead of raising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    Blank,
    NotANumber,
    OutOfRange,
    UnknownPlayer,
    BadDate,
}

pub fn skip_reason_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::Blank => "blank",
        SkipReason::NotANumber => "not a number",
        SkipReason::OutOfRange => "out of range",
        SkipReason::UnknownPlayer => "unknown player",
        SkipReason::BadDate => "bad date",
    }
}

const DATE_FORMATS: [&str; 6] = [
    "%Y/%m/%d",
    "%Y-%m-%d",
    "%Y.%m.%d",
    "%Y年%m月%d日",
    "%m/%d/%Y",
    "%d.%m.%Y",
];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a calendar date written in any of the common spreadsheet/locale
/// forms into `YYYYMMDD`.
pub fn normalize_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|d| d.format("%Y%m%d").to_string())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return None;
    }
    if cleaned.len() == 8 && cleaned.bytes().all(|b| b.is_ascii_digit()) {
        let year = cleaned[..4].parse().ok()?;
        let month = cleaned[4..6].parse().ok()?;
        let day = cleaned[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, fmt) {
            return Some(dt.date());
        }
    }
    None
}
