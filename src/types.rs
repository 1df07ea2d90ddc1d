//! Scalar cell values and the small enums shared by every reader and writer

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Shape a reader yields on iteration. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Synthesize a [`Record`](crate::record::Record) per row
    #[default]
    Object,
    /// Yield the raw field-name → value mapping
    Mapping,
    /// Yield an ordered value list in field-name order
    List,
}

/// Write session kind for writers bound to a file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Truncate and write the header row immediately
    #[default]
    Write,
    /// Keep existing rows and add new ones after them; no header is written
    Append,
}

/// Sheet selector for spreadsheet readers and writers.
///
/// Resolved once at construction and stored; not reassignable afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetRef {
    /// Zero-based sheet position
    Index(usize),
    /// Sheet name
    Name(String),
}

impl Default for SheetRef {
    fn default() -> Self {
        SheetRef::Index(0)
    }
}

impl From<usize> for SheetRef {
    fn from(index: usize) -> Self {
        SheetRef::Index(index)
    }
}

impl From<&str> for SheetRef {
    fn from(name: &str) -> Self {
        SheetRef::Name(name.to_string())
    }
}

impl From<String> for SheetRef {
    fn from(name: String) -> Self {
        SheetRef::Name(name)
    }
}

/// A single cell value as produced by the backing format.
///
/// No coercion happens anywhere in the crate: delimited text always yields
/// `Text`, spreadsheet engines yield whatever native type the cell holds.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Empty cell
    #[default]
    Empty,
    /// Text value (the only variant CSV produces)
    Text(String),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// DateTime value as an Excel serial date number
    DateTime(f64),
    /// Error cell carried through from a spreadsheet engine
    Error(String),
}

impl Value {
    /// Render the value as text, the way it is written to a CSV token
    pub fn as_string(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Text(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::DateTime(d) => d.to_string(),
            Value::Error(e) => format!("#ERROR: {}", e),
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Try to convert to integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::DateTime(d) => Some(*d),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Text(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Convert an Excel serial date number to a calendar date-time.
    ///
    /// Serial day 0 is 1899-12-30 (the 1900 date system with its Lotus leap
    /// year bug already folded in, which is what the engines hand us).
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        let serial = match self {
            Value::DateTime(d) => *d,
            Value::Float(f) => *f,
            _ => return None,
        };
        let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
        let seconds = (serial * 86_400.0).round() as i64;
        base.checked_add_signed(Duration::seconds(seconds))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
