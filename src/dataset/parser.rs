//! Tabular parsers
//!
//! Turn raw blob bytes into a header row plus string cells. Typing happens
//! afterwards in one place so every format infers types the same way.

use std::collections::HashSet;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::NaiveTime;
use serde_json::Value;
use thiserror::Error;

/// Why bytes could not be read as a table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(pub String);

/// Untyped table: headers and cells, empty cells as `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Parses blob bytes into a raw table
pub trait TabularParser: Send + Sync {
    /// Short format name for logs
    fn format(&self) -> &'static str;

    /// Parse the whole input
    fn parse(&self, bytes: &[u8]) -> Result<RawTable, ParseError>;
}

/// Picks a parser from the location's extension. Unknown extensions are
/// read as comma-separated text.
pub fn parser_for(location: &str) -> Box<dyn TabularParser> {
    let extension = location
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "tsv" | "tab" => Box::new(CsvParser::tsv()),
        "json" => Box::new(JsonRecordsParser),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Box::new(WorkbookParser),
        _ => Box::new(CsvParser::csv()),
    }
}

fn check_headers(headers: &[String]) -> Result<(), ParseError> {
    if headers.is_empty() {
        return Err(ParseError("no header row".into()));
    }
    let mut seen = HashSet::new();
    for (i, header) in headers.iter().enumerate() {
        if header.is_empty() {
            return Err(ParseError(format!("column {} has an empty header", i + 1)));
        }
        if !seen.insert(header.as_str()) {
            return Err(ParseError(format!("duplicate column '{}'", header)));
        }
    }
    Ok(())
}

fn non_empty(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Delimited text with a header row
#[derive(Debug, Clone, Copy)]
pub struct CsvParser {
    delimiter: u8,
}

impl CsvParser {
    /// Comma-separated
    pub fn csv() -> Self {
        Self { delimiter: b',' }
    }

    /// Tab-separated
    pub fn tsv() -> Self {
        Self { delimiter: b'\t' }
    }
}

impl TabularParser for CsvParser {
    fn format(&self) -> &'static str {
        if self.delimiter == b'\t' {
            "tsv"
        } else {
            "csv"
        }
    }

    fn parse(&self, bytes: &[u8]) -> Result<RawTable, ParseError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ParseError(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.len() == 1 && headers[0].is_empty() {
            return Err(ParseError("no header row".into()));
        }
        check_headers(&headers)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ParseError(e.to_string()))?;
            rows.push(record.iter().map(non_empty).collect());
        }

        Ok(RawTable { headers, rows })
    }
}

/// JSON array of flat objects. Columns are the union of keys, in the order
/// they first appear.
#[derive(Debug, Clone, Copy)]
pub struct JsonRecordsParser;

impl TabularParser for JsonRecordsParser {
    fn format(&self) -> &'static str {
        "json"
    }

    fn parse(&self, bytes: &[u8]) -> Result<RawTable, ParseError> {
        let records: Vec<serde_json::Map<String, Value>> = serde_json::from_slice(bytes)
            .map_err(|e| ParseError(format!("expected an array of objects: {}", e)))?;

        let mut headers: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for record in &records {
            for key in record.keys() {
                if seen.insert(key.clone()) {
                    headers.push(key.clone());
                }
            }
        }
        check_headers(&headers)?;

        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let mut row = Vec::with_capacity(headers.len());
            for header in &headers {
                let cell = match record.get(header) {
                    None | Some(Value::Null) => None,
                    Some(Value::Bool(b)) => Some(b.to_string()),
                    Some(Value::Number(n)) => Some(n.to_string()),
                    Some(Value::String(s)) => non_empty(s),
                    Some(_) => {
                        return Err(ParseError(format!(
                            "record {} field '{}' is nested; only flat values are supported",
                            i + 1,
                            header
                        )))
                    }
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Ok(RawTable { headers, rows })
    }
}

/// First sheet of a spreadsheet workbook, header row first
#[derive(Debug, Clone, Copy)]
pub struct WorkbookParser;

impl TabularParser for WorkbookParser {
    fn format(&self) -> &'static str {
        "workbook"
    }

    fn parse(&self, bytes: &[u8]) -> Result<RawTable, ParseError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| ParseError(format!("not a readable workbook: {}", e)))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ParseError("workbook has no sheets".into()))?
            .map_err(|e| ParseError(format!("first sheet unreadable: {}", e)))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| ParseError("no header row".into()))?
            .iter()
            .enumerate()
            .map(|(col, cell)| workbook_cell(cell, 1, col).map(Option::unwrap_or_default))
            .collect::<Result<_, _>>()?;
        let width = headers
            .iter()
            .rposition(|h| !h.is_empty())
            .map_or(0, |last| last + 1);
        let headers = headers[..width].to_vec();
        check_headers(&headers)?;

        let mut table = Vec::new();
        for (i, row) in rows.enumerate() {
            let cells = row[..width.min(row.len())]
                .iter()
                .enumerate()
                .map(|(col, cell)| workbook_cell(cell, i + 2, col))
                .collect::<Result<Vec<_>, _>>()?;
            if cells.iter().all(Option::is_none) {
                continue;
            }
            table.push(cells);
        }

        Ok(RawTable {
            headers,
            rows: table,
        })
    }
}

/// Renders one workbook cell the way it would appear in delimited text.
/// Whole floats drop their fraction; midnight timestamps become dates.
fn workbook_cell(cell: &Data, row: usize, col: usize) -> Result<Option<String>, ParseError> {
    let text = match cell {
        Data::Empty => return Ok(None),
        Data::Error(e) => {
            return Err(ParseError(format!(
                "row {} column {} holds a cell error ({})",
                row,
                col + 1,
                e
            )))
        }
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    };
    Ok(non_empty(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_basic() {
        let table = CsvParser::csv()
            .parse(b"region,sales\neast,10\nwest,\n")
            .unwrap();
        assert_eq!(table.headers, vec!["region", "sales"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Some("east".to_string()), Some("10".to_string())],
                vec![Some("west".to_string()), None],
            ]
        );
    }

    #[test]
    fn test_csv_strips_bom_and_trims_headers() {
        let table = CsvParser::csv().parse(b"\xEF\xBB\xBF id , name\n1,a\n").unwrap();
        assert_eq!(table.headers, vec!["id", "name"]);
    }

    #[test]
    fn test_csv_ragged_row_rejected() {
        assert!(CsvParser::csv().parse(b"a,b\n1,2,3\n").is_err());
    }

    #[test]
    fn test_csv_duplicate_header_rejected() {
        let err = CsvParser::csv().parse(b"a,a\n1,2\n").unwrap_err();
        assert!(err.0.contains("duplicate"));
    }

    #[test]
    fn test_csv_empty_input_rejected() {
        assert!(CsvParser::csv().parse(b"").is_err());
    }

    #[test]
    fn test_tsv() {
        let table = CsvParser::tsv().parse(b"a\tb\n1\t2\n").unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
    }

    #[test]
    fn test_json_records() {
        let table = JsonRecordsParser
            .parse(br#"[{"id": 1, "ok": true}, {"id": 2, "name": "b", "ok": null}]"#)
            .unwrap();
        assert_eq!(table.headers, vec!["id", "ok", "name"]);
        assert_eq!(
            table.rows[1],
            vec![Some("2".to_string()), None, Some("b".to_string())]
        );
        assert_eq!(table.rows[0][2], None);
    }

    #[test]
    fn test_json_keeps_file_column_order() {
        let table = JsonRecordsParser
            .parse(br#"[{"zone": "north", "amount": 4, "code": "b"}]"#)
            .unwrap();
        assert_eq!(table.headers, vec!["zone", "amount", "code"]);
    }

    #[test]
    fn test_workbook_cells() {
        assert_eq!(workbook_cell(&Data::Float(10.0), 2, 0).unwrap().as_deref(), Some("10"));
        assert_eq!(workbook_cell(&Data::Float(2.5), 2, 0).unwrap().as_deref(), Some("2.5"));
        assert_eq!(workbook_cell(&Data::String("  east ".into()), 2, 0).unwrap().as_deref(), Some("east"));
        assert_eq!(workbook_cell(&Data::Empty, 2, 0).unwrap(), None);
    }

    #[test]
    fn test_workbook_rejects_garbage() {
        let err = WorkbookParser.parse(b"region,sales\neast,10\n").unwrap_err();
        assert!(err.0.contains("workbook"));
    }

    #[test]
    fn test_json_nested_rejected() {
        assert!(JsonRecordsParser.parse(br#"[{"a": [1, 2]}]"#).is_err());
        assert!(JsonRecordsParser.parse(br#"{"a": 1}"#).is_err());
    }

    #[test]
    fn test_parser_for_extension() {
        assert_eq!(parser_for("x/sales.CSV").format(), "csv");
        assert_eq!(parser_for("sales.tsv").format(), "tsv");
        assert_eq!(parser_for("sales.json").format(), "json");
        assert_eq!(parser_for("q1/sales.XLSX").format(), "workbook");
        assert_eq!(parser_for("legacy.xls").format(), "workbook");
        assert_eq!(parser_for("sales").format(), "csv");
    }
}
