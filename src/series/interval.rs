//! Sampling intervals and calendar arithmetic.
//!
//! Model output tables carry their interval as a short string such as
//! `"15min"`, `"1hour"`, `"1day"` or `"1mon"`. Fixed intervals map to a
//! [`TimeDelta`]; monthly intervals advance by true calendar months.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use super::SeriesError;

/// Spacing between consecutive rows of a regular series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interval {
    /// Fixed duration (seconds up to weeks).
    Fixed(TimeDelta),
    /// Whole calendar months.
    Months(u32),
}

impl Interval {
    /// Fixed interval of `n` minutes.
    pub fn minutes(n: i64) -> Self {
        Self::Fixed(TimeDelta::minutes(n))
    }

    /// Fixed interval of `n` hours.
    pub fn hours(n: i64) -> Self {
        Self::Fixed(TimeDelta::hours(n))
    }

    /// Fixed interval of `n` days.
    pub fn days(n: i64) -> Self {
        Self::Fixed(TimeDelta::days(n))
    }

    /// Parse an interval string.
    ///
    /// Accepts an optional positive multiplier followed by a unit, case
    /// insensitive: `s`/`sec`, `min`/`t`, `hour`/`h`, `day`/`d`,
    /// `week`/`w`, `mon`/`month`/`ms` and `year`/`y`.
    ///
    /// # Errors
    /// `UnsupportedIntervalUnit` when the unit is unknown or the multiplier
    /// is not a positive integer.
    pub fn parse(text: &str) -> Result<Self, SeriesError> {
        let unsupported = || SeriesError::UnsupportedIntervalUnit(text.to_string());

        let normalized = text.trim().to_ascii_lowercase();
        let split = normalized
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(normalized.len());
        let (digits, unit) = normalized.split_at(split);
        let count: i64 = if digits.is_empty() {
            1
        } else {
            digits.parse().map_err(|_| unsupported())?
        };
        if count <= 0 {
            return Err(unsupported());
        }

        let months = |factor: i64| {
            u32::try_from(count * factor)
                .map(Interval::Months)
                .map_err(|_| unsupported())
        };

        match unit.trim() {
            "s" | "sec" | "secs" | "second" | "seconds" => {
                TimeDelta::try_seconds(count).map(Self::Fixed).ok_or_else(unsupported)
            }
            "t" | "min" | "mins" | "minute" | "minutes" => {
                TimeDelta::try_minutes(count).map(Self::Fixed).ok_or_else(unsupported)
            }
            "h" | "hr" | "hrs" | "hour" | "hours" => {
                TimeDelta::try_hours(count).map(Self::Fixed).ok_or_else(unsupported)
            }
            "d" | "day" | "days" => {
                TimeDelta::try_days(count).map(Self::Fixed).ok_or_else(unsupported)
            }
            "w" | "week" | "weeks" => {
                TimeDelta::try_weeks(count).map(Self::Fixed).ok_or_else(unsupported)
            }
            "mon" | "month" | "months" | "ms" => months(1),
            "y" | "ys" | "year" | "years" => months(12),
            _ => Err(unsupported()),
        }
    }

    /// The fixed duration, if this is not a calendar interval.
    pub fn as_fixed(&self) -> Option<TimeDelta> {
        match self {
            Self::Fixed(d) => Some(*d),
            Self::Months(_) => None,
        }
    }

    /// `t + n * self`, or `None` on overflow.
    pub fn advance(&self, t: NaiveDateTime, n: i64) -> Option<NaiveDateTime> {
        match self {
            Self::Fixed(d) => {
                let ms = d.num_milliseconds().checked_mul(n)?;
                t.checked_add_signed(TimeDelta::try_milliseconds(ms)?)
            }
            Self::Months(k) => add_months(t, i64::from(*k).checked_mul(n)?),
        }
    }

    /// Number of whole intervals from `from` to `to`, rounded toward
    /// negative infinity.
    pub fn steps_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> i64 {
        match self {
            Self::Fixed(d) => {
                let step = d.num_milliseconds().max(1);
                (to - from).num_milliseconds().div_euclid(step)
            }
            Self::Months(k) => {
                let mut months = month_ordinal(to) - month_ordinal(from);
                if add_months(from, months).is_some_and(|t| t > to) {
                    months -= 1;
                }
                months.div_euclid(i64::from((*k).max(1)))
            }
        }
    }

    /// Largest interval boundary at or before `t`.
    ///
    /// Fixed intervals are anchored at midnight of `t`'s day, calendar
    /// intervals at the start of the month.
    pub fn floor(&self, t: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::Fixed(d) => {
                let midnight = t.date().and_time(NaiveTime::MIN);
                let steps = self.steps_between(midnight, t);
                midnight + TimeDelta::milliseconds(d.num_milliseconds() * steps)
            }
            Self::Months(k) => {
                let k = i64::from((*k).max(1));
                let ordinal = month_ordinal(t);
                let floored = ordinal - ordinal.rem_euclid(k);
                from_month_ordinal(floored).unwrap_or(t)
            }
        }
    }

    /// Smallest interval boundary at or after `t`.
    pub fn ceil(&self, t: NaiveDateTime) -> NaiveDateTime {
        let floor = self.floor(t);
        if floor == t {
            t
        } else {
            self.advance(floor, 1).unwrap_or(t)
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Months(k) => write!(f, "{k}mon"),
            Self::Fixed(d) => {
                let secs = d.num_seconds();
                if secs % 86_400 == 0 {
                    write!(f, "{}day", secs / 86_400)
                } else if secs % 3_600 == 0 {
                    write!(f, "{}hour", secs / 3_600)
                } else if secs % 60 == 0 {
                    write!(f, "{}min", secs / 60)
                } else {
                    write!(f, "{secs}sec")
                }
            }
        }
    }
}

impl FromStr for Interval {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn month_ordinal(t: NaiveDateTime) -> i64 {
    i64::from(t.year()) * 12 + i64::from(t.month0())
}

fn from_month_ordinal(ordinal: i64) -> Option<NaiveDateTime> {
    let year = i32::try_from(ordinal.div_euclid(12)).ok()?;
    let month = u32::try_from(ordinal.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.and_time(NaiveTime::MIN))
}

fn add_months(t: NaiveDateTime, n: i64) -> Option<NaiveDateTime> {
    let magnitude = Months::new(u32::try_from(n.unsigned_abs()).ok()?);
    if n >= 0 {
        t.checked_add_months(magnitude)
    } else {
        t.checked_sub_months(magnitude)
    }
}
