//! Cell values and column types
//!
//! Supported column types:
//! - integer: 64-bit signed whole numbers
//! - decimal: 64-bit floating point
//! - text: UTF-8 string (optionally digits-only, see `numeric_text`)
//! - date: calendar date without time
//! - boolean: true/false

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::infer::parse_date_value;

/// Inferred type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Decimal,
    Text,
    Date,
    Boolean,
}

impl ColumnType {
    /// Returns the type name used in prompts and errors
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Decimal => "decimal",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
        }
    }

    /// Integer or decimal
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Decimal)
    }

    /// Supports `<`/`>` comparisons and min/max
    pub fn is_ordered(&self) -> bool {
        !matches!(self, ColumnType::Boolean)
    }

    /// Whether values of the two types can be compared with each other
    pub fn is_comparable_with(&self, other: ColumnType) -> bool {
        *self == other || (self.is_numeric() && other.is_numeric())
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A single typed cell
///
/// Serializes as the plain JSON value (`null`, number, string, bool);
/// dates serialize as `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Decimal(f64),
    Text(String),
    Date(NaiveDate),
    Boolean(bool),
}

impl CellValue {
    /// Returns true for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of integer and decimal cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Text view of text cells
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Null => 0,
            CellValue::Boolean(_) => 1,
            CellValue::Integer(_) | CellValue::Decimal(_) => 2,
            CellValue::Date(_) => 3,
            CellValue::Text(_) => 4,
        }
    }

    /// Total order used for sorting, min and max.
    ///
    /// - null < boolean < number < date < text
    /// - integers and decimals compare by numeric value
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        let by_rank = self.rank().cmp(&other.rank());
        if by_rank != Ordering::Equal {
            return by_rank;
        }
        match (self, other) {
            (CellValue::Integer(a), CellValue::Integer(b)) => a.cmp(b),
            (CellValue::Boolean(a), CellValue::Boolean(b)) => a.cmp(b),
            (CellValue::Date(a), CellValue::Date(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => Ordering::Equal,
            },
        }
    }

    /// Coerces a JSON literal from a plan to a cell comparable with a
    /// column of type `column_type`. Returns `None` when it does not fit.
    ///
    /// - integer, decimal: JSON numbers
    /// - date: strings in any accepted date format
    /// - boolean: JSON booleans
    /// - text: JSON strings
    pub fn from_literal(value: &serde_json::Value, column_type: ColumnType) -> Option<Self> {
        match column_type {
            ColumnType::Integer | ColumnType::Decimal => match value.as_i64() {
                Some(i) if column_type == ColumnType::Integer => Some(CellValue::Integer(i)),
                _ => value.as_f64().map(CellValue::Decimal),
            },
            ColumnType::Date => value
                .as_str()
                .and_then(parse_date_value)
                .map(CellValue::Date),
            ColumnType::Boolean => value.as_bool().map(CellValue::Boolean),
            ColumnType::Text => value.as_str().map(|s| CellValue::Text(s.to_string())),
        }
    }

    fn normalized_bits(d: f64) -> u64 {
        if d == 0.0 {
            0.0f64.to_bits()
        } else {
            d.to_bits()
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::Integer(a), CellValue::Integer(b)) => a == b,
            (CellValue::Decimal(a), CellValue::Decimal(b)) => {
                Self::normalized_bits(*a) == Self::normalized_bits(*b)
            }
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::Date(a), CellValue::Date(b)) => a == b,
            (CellValue::Boolean(a), CellValue::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Null => {}
            CellValue::Integer(i) => i.hash(state),
            CellValue::Decimal(d) => Self::normalized_bits(*d).hash(state),
            CellValue::Text(s) => s.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Boolean(b) => b.hash(state),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Decimal(d) => write!(f, "{}", d),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Integer(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Decimal(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Boolean(v)
    }
}
