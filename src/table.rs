//! In-memory tabular input loaded from CSV or spreadsheet files.
//!
//! Every cell is kept as a trimmed string; typing happens during ingestion so
//! that a malformed cell only costs its row.

use calamine::{Data, Reader, open_workbook_auto, open_workbook_auto_from_rs};
use chrono::{Duration, NaiveDate};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;

use crate::error::IngestError;

/// A header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Loads a table from disk, choosing the reader by file extension.
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        if is_spreadsheet(path) {
            Self::from_xlsx_path(path)
        } else {
            let file = std::fs::File::open(path)?;
            Self::from_csv_reader(file)
        }
    }

    /// Loads a table from raw bytes; `name` is only used for its extension.
    pub fn from_bytes(bytes: Vec<u8>, name: &str) -> Result<Self, IngestError> {
        if is_spreadsheet(Path::new(name)) {
            Self::from_xlsx_reader(Cursor::new(bytes))
        } else {
            Self::from_csv_reader(Cursor::new(bytes))
        }
    }

    /// Reads a CSV with a header row. Short rows are allowed.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, IngestError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_reader(reader);

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(record.iter().map(|c| c.trim().to_string()).collect());
        }

        Self::from_rows(rows)
    }

    /// Reads the first worksheet of an in-memory spreadsheet.
    pub fn from_xlsx_reader<RS>(reader: RS) -> Result<Self, IngestError>
    where
        RS: Read + Seek + Clone,
    {
        let mut workbook = open_workbook_auto_from_rs(reader)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(IngestError::NoWorksheet)??;
        Self::from_rows(range.rows().map(|r| r.iter().map(cell_to_string).collect()))
    }

    /// Reads the first worksheet of a spreadsheet file.
    pub fn from_xlsx_path(path: &Path) -> Result<Self, IngestError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(IngestError::NoWorksheet)??;
        Self::from_rows(range.rows().map(|r| r.iter().map(cell_to_string).collect()))
    }

    fn from_rows<I>(rows: I) -> Result<Self, IngestError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut rows = rows.into_iter();
        let headers = rows.next().ok_or(IngestError::EmptyTable)?;
        let rows: Vec<Vec<String>> = rows.filter(|r| r.iter().any(|c| !c.is_empty())).collect();
        debug!(columns = headers.len(), rows = rows.len(), "Table loaded");
        Ok(Self { headers, rows })
    }

    /// Index of the first column whose header matches one of `aliases`.
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        let wanted: Vec<String> = aliases.iter().map(|a| normalize_header(a)).collect();
        self.headers
            .iter()
            .position(|h| wanted.contains(&normalize_header(h)))
    }

    /// Cell at `(row, col)`, empty when the row is short.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn is_spreadsheet(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods")
    )
}

/// Lower-cases, trims and strips Portuguese diacritics from a header.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Int(i) => format!("{}", i),
        Data::Bool(b) => format!("{}", b),
        Data::Empty => String::new(),
        Data::Error(_) => String::new(),
        Data::DateTime(dt) => excel_serial_to_string(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Converts an Excel serial date (days since 1899-12-30) to `YYYY-MM-DD HH:MM:SS`.
fn excel_serial_to_string(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return serial.to_string();
    };
    let seconds = (serial * 86_400.0).round() as i64;
    epoch
        .checked_add_signed(Duration::seconds(seconds))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| serial.to_string())
}
