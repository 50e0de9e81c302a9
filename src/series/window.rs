//! Time windows and timestamp parsing.
//!
//! # Formats
//!
//! ```text
//! 05JAN1990 - 07JAN1990
//! 01JAN1990 0100 - 05JUL1992 2400
//! 1990-01-05 - 1990-01-07 12:00
//! ```
//!
//! `2400` is the HEC convention for midnight at the end of the day and
//! rolls over to `0000` of the next day.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use super::SeriesError;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

const ISO_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y%m%d %H%M",
];

/// A closed `[start, end]` span of absolute time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    /// Window start
    pub start: NaiveDateTime,
    /// Window end
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Create a window.
    ///
    /// # Errors
    /// `InvalidWindow` if `end` is before `start`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, SeriesError> {
        if end < start {
            return Err(SeriesError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window of `half_width` either side of `center`.
    pub fn around(center: NaiveDateTime, half_width: TimeDelta) -> Self {
        let half_width = half_width.abs();
        Self {
            start: center - half_width,
            end: center + half_width,
        }
    }

    /// Parse `"<start> - <end>"`.
    pub fn parse(text: &str) -> Result<Self, SeriesError> {
        let malformed = || SeriesError::MalformedWindow(text.to_string());
        let (start, end) = text
            .split_once(" - ")
            .or_else(|| text.split_once('-'))
            .ok_or_else(malformed)?;
        Self::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }

    /// Whether `t` lies inside the window (inclusive on both ends).
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }

    /// Length of the window.
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

impl FromStr for TimeWindow {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse a timestamp in `DDMmmYYYY [HHMM]` form, falling back to ISO-8601
/// date/time forms.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, SeriesError> {
    let text = text.trim();
    if let Some(t) = parse_hec_timestamp(text) {
        return Ok(t);
    }
    for format in ISO_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(t);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| SeriesError::InvalidTimestamp(text.to_string()))
}

fn parse_hec_timestamp(text: &str) -> Option<NaiveDateTime> {
    if !text.is_ascii() {
        return None;
    }
    let mut parts = text.split_whitespace();
    let date_part = parts.next()?;
    let time_part = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let day_len = date_part.bytes().take_while(u8::is_ascii_digit).count();
    if !(1..=2).contains(&day_len) || date_part.len() != day_len + 7 {
        return None;
    }
    let day: u32 = date_part[..day_len].parse().ok()?;
    let month_name = date_part[day_len..day_len + 3].to_ascii_uppercase();
    let month = MONTHS.iter().position(|m| *m == month_name)? as u32 + 1;
    let year: i32 = date_part[day_len + 3..].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let (hour, minute) = match time_part {
        None => (0, 0),
        Some(t) => {
            let digits: String = t.chars().filter(|c| *c != ':').collect();
            if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            (digits[..2].parse().ok()?, digits[2..].parse().ok()?)
        }
    };

    if hour == 24 && minute == 0 {
        return date.succ_opt().map(|d| d.and_time(NaiveTime::MIN));
    }
    date.and_hms_opt(hour, minute, 0)
}
