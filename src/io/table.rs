//! In-memory model output tables and their calendar attributes.
//!
//! A table is a dense row-major array of shape `(T,)`, `(T, N)` or
//! `(T, N, M)`: time first, then object id, then an optional location
//! within the object (upstream/downstream end of a channel, say).
//!
//! # Attributes
//!
//! ```text
//! interval       "15min" | "1hour" | "1day" | "1mon"
//! start_time     "1930-01-01 00:00:00"
//! model          "hydro"            (optional)
//! model_version  "8.2.1"            (optional)
//! ```
//!
//! Attributes written by HDF5 tooling are often one-element arrays of
//! byte strings; [`AttributeValue::as_text`] unwraps and decodes those.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::TableError;
use crate::series::{Interval, parse_timestamp};

/// Attribute names carrying the calendar.
pub const INTERVAL_ATTR: &str = "interval";
pub const START_TIME_ATTR: &str = "start_time";
pub const MODEL_ATTR: &str = "model";
pub const MODEL_VERSION_ATTR: &str = "model_version";

/// Value of a table attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    /// UTF-8 text
    Text(String),
    /// Raw byte string
    Bytes(Vec<u8>),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Array of values
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Text content, decoding byte strings and unwrapping one-element arrays.
    ///
    /// Invalid UTF-8 is decoded with replacement characters.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Bytes(b) => Some(decode_bytes(b)),
            Self::List(items) => match items.as_slice() {
                [only] => only.as_text(),
                _ => None,
            },
            Self::Int(_) | Self::Float(_) => None,
        }
    }

    /// Numeric content, unwrapping one-element arrays.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::List(items) => match items.as_slice() {
                [only] => only.as_f64(),
                _ => None,
            },
            Self::Text(_) | Self::Bytes(_) => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

/// Decode a byte string as UTF-8, substituting U+FFFD for invalid sequences.
pub fn decode_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

/// A dense, time-major model output table.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    path: String,
    shape: Vec<usize>,
    data: Vec<f64>,
    attributes: BTreeMap<String, AttributeValue>,
}

impl Table {
    /// Create a table from row-major data.
    ///
    /// # Errors
    /// `ShapeMismatch` if `shape` has no dimensions, more than three, or
    /// does not account for exactly `data.len()` values.
    pub fn new(
        path: impl Into<String>,
        shape: Vec<usize>,
        data: Vec<f64>,
    ) -> Result<Self, TableError> {
        let path = path.into();
        if shape.is_empty() || shape.len() > 3 {
            return Err(TableError::ShapeMismatch(format!(
                "{path}: expected 1 to 3 dimensions, got {}",
                shape.len()
            )));
        }
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TableError::ShapeMismatch(format!(
                "{path}: shape {shape:?} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self {
            path,
            shape,
            data,
            attributes: BTreeMap::new(),
        })
    }

    /// Set an attribute.
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the `start_time` and `interval` attributes.
    pub fn with_calendar(self, start_time: NaiveDateTime, interval: Interval) -> Self {
        self.with_attribute(START_TIME_ATTR, start_time.format("%Y-%m-%d %H:%M:%S").to_string())
            .with_attribute(INTERVAL_ATTR, interval.to_string())
    }

    /// Table path within its store.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Dimensions, time first.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of time rows.
    pub fn n_rows(&self) -> usize {
        self.shape[0]
    }

    /// Row-major values.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// All attributes.
    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    /// Attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Attribute as decoded text.
    pub fn text_attribute(&self, name: &str) -> Option<String> {
        self.attribute(name).and_then(AttributeValue::as_text)
    }

    /// Value at `(row, id, location)`; trailing indices beyond the table's
    /// rank must be zero.
    pub fn value(&self, row: usize, id: usize, location: usize) -> Option<f64> {
        let (n, m) = match self.shape.as_slice() {
            [_] => (1, 1),
            [_, n] => (*n, 1),
            [_, n, m] => (*n, *m),
            _ => return None,
        };
        if row >= self.shape[0] || id >= n || location >= m {
            return None;
        }
        self.data.get((row * n + id) * m + location).copied()
    }
}

/// Calendar carried by a table's attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct CalendarMetadata {
    /// Timestamp of row 0
    pub start_time: NaiveDateTime,
    /// Row spacing
    pub interval: Interval,
    /// Number of rows
    pub length: usize,
    /// Producing model, if recorded
    pub model: Option<String>,
    /// Producing model version, if recorded
    pub model_version: Option<String>,
}

impl CalendarMetadata {
    /// Read the calendar of `table`.
    ///
    /// # Errors
    /// - `MissingAttribute` if `interval` or `start_time` is absent
    /// - `UnsupportedIntervalUnit` if the interval cannot be parsed
    /// - `InvalidTimestamp` if the start time cannot be parsed
    pub fn from_table(table: &Table) -> Result<Self, TableError> {
        let interval_text = table
            .text_attribute(INTERVAL_ATTR)
            .ok_or_else(|| TableError::MissingAttribute {
                table: table.path().to_string(),
                name: INTERVAL_ATTR.to_string(),
            })?;
        let interval = Interval::parse(&interval_text)
            .map_err(|_| TableError::UnsupportedIntervalUnit(interval_text.clone()))?;

        let start_text = table
            .text_attribute(START_TIME_ATTR)
            .ok_or_else(|| TableError::MissingAttribute {
                table: table.path().to_string(),
                name: START_TIME_ATTR.to_string(),
            })?;
        let start_time =
            parse_timestamp(&start_text).map_err(|_| TableError::InvalidTimestamp(start_text))?;

        Ok(Self {
            start_time,
            interval,
            length: table.n_rows(),
            model: table.text_attribute(MODEL_ATTR),
            model_version: table.text_attribute(MODEL_VERSION_ATTR),
        })
    }

    /// Timestamp of row `i`.
    pub fn time_at(&self, i: usize) -> Option<NaiveDateTime> {
        self.interval.advance(self.start_time, i as i64)
    }

    /// One interval past the last row.
    pub fn end_time(&self) -> Option<NaiveDateTime> {
        self.time_at(self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_shape_validation() {
        assert!(Table::new("/t", vec![4, 2], vec![0.0; 8]).is_ok());
        assert!(matches!(
            Table::new("/t", vec![4, 2], vec![0.0; 7]),
            Err(TableError::ShapeMismatch(_))
        ));
        assert!(Table::new("/t", vec![], vec![]).is_err());
        assert!(Table::new("/t", vec![1, 1, 1, 1], vec![0.0]).is_err());
    }

    #[test]
    fn test_value_indexing_3d() {
        // (T=2, N=3, M=2)
        let data: Vec<f64> = (0..12).map(f64::from).collect();
        let table = Table::new("/t", vec![2, 3, 2], data).unwrap();
        assert_eq!(table.value(0, 0, 0), Some(0.0));
        assert_eq!(table.value(0, 1, 1), Some(3.0));
        assert_eq!(table.value(1, 2, 1), Some(11.0));
        assert_eq!(table.value(2, 0, 0), None);
        assert_eq!(table.value(0, 3, 0), None);
    }

    #[test]
    fn test_attribute_decoding() {
        let table = Table::new("/t", vec![1], vec![0.0])
            .unwrap()
            .with_attribute(
                INTERVAL_ATTR,
                AttributeValue::List(vec![AttributeValue::Bytes(b"1hour".to_vec())]),
            )
            .with_attribute(MODEL_ATTR, AttributeValue::Bytes(vec![b'h', 0xff, b'o']));
        assert_eq!(table.text_attribute(INTERVAL_ATTR).as_deref(), Some("1hour"));
        assert_eq!(table.text_attribute(MODEL_ATTR).as_deref(), Some("h\u{fffd}o"));
    }

    #[test]
    fn test_calendar_from_attributes() {
        let start = NaiveDate::from_ymd_opt(1930, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let table = Table::new("/hydro/data/channel stage", vec![96], vec![0.0; 96])
            .unwrap()
            .with_calendar(start, Interval::hours(1))
            .with_attribute(MODEL_ATTR, "hydro");
        let cal = CalendarMetadata::from_table(&table).unwrap();
        assert_eq!(cal.start_time, start);
        assert_eq!(cal.interval, Interval::hours(1));
        assert_eq!(cal.length, 96);
        assert_eq!(cal.model.as_deref(), Some("hydro"));
        assert_eq!(cal.model_version, None);
        assert_eq!(cal.end_time(), Some(start + chrono::TimeDelta::hours(96)));
    }

    #[test]
    fn test_calendar_errors() {
        let table = Table::new("/t", vec![1], vec![0.0]).unwrap();
        assert!(matches!(
            CalendarMetadata::from_table(&table),
            Err(TableError::MissingAttribute { .. })
        ));

        let table = table
            .with_attribute(INTERVAL_ATTR, "3fortnights")
            .with_attribute(START_TIME_ATTR, "1930-01-01 00:00:00");
        assert!(matches!(
            CalendarMetadata::from_table(&table),
            Err(TableError::UnsupportedIntervalUnit(_))
        ));
    }
}
