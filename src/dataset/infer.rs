//! Column type inference
//!
//! Each column's type is the first of boolean, integer, decimal, date that
//! every non-null cell satisfies; otherwise text. Digits-only values with a
//! leading zero (postal codes, account numbers) are never numbers.

use chrono::NaiveDate;

use super::value::{CellValue, ColumnType};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

/// Result of inferring one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Inferred {
    pub column_type: ColumnType,
    pub numeric_text: bool,
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn has_leading_zero(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    digits.len() > 1 && digits.starts_with('0') && is_digits(digits)
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    if has_leading_zero(s) {
        return None;
    }
    s.parse::<i64>().ok()
}

fn parse_decimal(s: &str) -> Option<f64> {
    // f64::from_str accepts "inf" and "NaN"; spreadsheets don't mean those
    let plausible = s.bytes().any(|b| b.is_ascii_digit())
        && s.bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !plausible || has_leading_zero(s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|d| d.is_finite())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Infers the type of a column from its raw cells
pub(crate) fn infer_column<'a>(cells: impl Iterator<Item = Option<&'a str>> + Clone) -> Inferred {
    let mut present = cells.filter_map(|c| c).peekable();
    if present.peek().is_none() {
        return Inferred {
            column_type: ColumnType::Text,
            numeric_text: false,
        };
    }

    let all = |pred: fn(&str) -> bool| present.clone().all(pred);

    let column_type = if all(|s| parse_bool(s).is_some()) {
        ColumnType::Boolean
    } else if all(|s| parse_integer(s).is_some()) {
        ColumnType::Integer
    } else if all(|s| parse_decimal(s).is_some()) {
        ColumnType::Decimal
    } else if all(|s| parse_date(s).is_some()) {
        ColumnType::Date
    } else {
        ColumnType::Text
    };

    let numeric_text = column_type == ColumnType::Text && all(is_digits);

    Inferred {
        column_type,
        numeric_text,
    }
}

/// Converts a raw cell to a typed value of an already-inferred type
pub(crate) fn convert(raw: Option<&str>, column_type: ColumnType) -> CellValue {
    let Some(s) = raw else {
        return CellValue::Null;
    };
    let typed = match column_type {
        ColumnType::Boolean => parse_bool(s).map(CellValue::Boolean),
        ColumnType::Integer => parse_integer(s).map(CellValue::Integer),
        ColumnType::Decimal => parse_decimal(s).map(CellValue::Decimal),
        ColumnType::Date => parse_date(s).map(CellValue::Date),
        ColumnType::Text => None,
    };
    typed.unwrap_or_else(|| CellValue::Text(s.to_string()))
}

/// Parses a date in any accepted spreadsheet format
pub(crate) fn parse_date_value(s: &str) -> Option<NaiveDate> {
    parse_date(s.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(cells: &[Option<&'static str>]) -> Inferred {
        infer_column(cells.iter().copied())
    }

    #[test]
    fn test_integer_column() {
        let inferred = infer(&[Some("10"), None, Some("-3"), Some("0")]);
        assert_eq!(inferred.column_type, ColumnType::Integer);
        assert!(!inferred.numeric_text);
    }

    #[test]
    fn test_decimal_column() {
        let inferred = infer(&[Some("10"), Some("2.5"), Some("1e3")]);
        assert_eq!(inferred.column_type, ColumnType::Decimal);
    }

    #[test]
    fn test_leading_zero_is_numeric_text() {
        let inferred = infer(&[Some("02134"), Some("90210")]);
        assert_eq!(inferred.column_type, ColumnType::Text);
        assert!(inferred.numeric_text);
    }

    #[test]
    fn test_nan_and_inf_are_text() {
        let inferred = infer(&[Some("NaN"), Some("inf")]);
        assert_eq!(inferred.column_type, ColumnType::Text);
        assert!(!inferred.numeric_text);
    }

    #[test]
    fn test_boolean_and_date_columns() {
        assert_eq!(
            infer(&[Some("TRUE"), Some("false")]).column_type,
            ColumnType::Boolean
        );
        assert_eq!(
            infer(&[Some("2024-01-31"), Some("2024/02/01"), Some("03.02.2024")]).column_type,
            ColumnType::Date
        );
    }

    #[test]
    fn test_all_null_column_is_text() {
        let inferred = infer(&[None, None]);
        assert_eq!(inferred.column_type, ColumnType::Text);
    }

    #[test]
    fn test_convert_respects_type() {
        assert_eq!(convert(Some("7"), ColumnType::Integer), CellValue::Integer(7));
        assert_eq!(convert(Some("7"), ColumnType::Decimal), CellValue::Decimal(7.0));
        assert_eq!(
            convert(Some("00123"), ColumnType::Text),
            CellValue::Text("00123".into())
        );
        assert_eq!(convert(None, ColumnType::Integer), CellValue::Null);
    }
}
