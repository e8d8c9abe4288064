// src/grading/importer.rs

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use csv::{ReaderBuilder, Trim};
use serde_json::Value;
use thiserror::Error;

use super::{
    RawRow,
    validation::{ValidationReport, validate_rows_at},
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
/// Local file header of a zip container (xlsx, ods).
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// OLE2 compound document (legacy xls).
const OLE_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0";

/// Fatal failure to turn an upload into rows. No partial result exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("The uploaded file could not be read: {0}")]
    Unreadable(String),
    #[error("The uploaded file contains no data rows")]
    Empty,
}

impl ImportError {
    /// Stable code shown to clients next to the message.
    pub fn reason(&self) -> &'static str {
        match self {
            ImportError::Unreadable(_) => "unreadable",
            ImportError::Empty => "empty",
        }
    }
}

/// Rows of the first sheet of an upload, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedSheet {
    /// Normalized header names (trimmed, lower-cased).
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Position of each row below the header line, blank rows counted.
    pub row_numbers: Vec<usize>,
}

impl ImportedSheet {
    /// Validates the rows, reporting problems at their position in the file.
    pub fn validate(&self) -> ValidationReport {
        validate_rows_at(&self.rows, &self.row_numbers)
    }
}

/// Parses an upload into header-keyed rows.
///
/// Workbooks (xlsx, xls, ods) are read from their first sheet. Anything else
/// is read as delimited text:
///
/// * Strips a UTF-8 byte-order mark.
/// * Sniffs the delimiter (comma, tab or semicolon) from the header line.
///
/// In both cases the first non-blank row is the header and blank rows are
/// skipped. Cell values are kept as strings; interpretation is left to
/// validation.
pub fn import(bytes: &[u8]) -> Result<ImportedSheet, ImportError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
        return import_workbook(bytes);
    }

    if bytes.contains(&0) {
        return Err(ImportError::Unreadable(
            "file is neither a spreadsheet nor delimited text".to_string(),
        ));
    }

    import_delimited(bytes)
}

fn import_workbook(bytes: &[u8]) -> Result<ImportedSheet, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ImportError::Unreadable(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::Empty)?
        .map_err(|e| ImportError::Unreadable(e.to_string()))?;

    // Sheet row of the first used cell; rows above it are blank.
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

    let records = range.rows().enumerate().map(|(index, cells)| {
        let cells: Vec<String> = cells.iter().map(cell_text).collect();
        Ok((first_row + index + 1, cells))
    });

    assemble(records)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn import_delimited(bytes: &[u8]) -> Result<ImportedSheet, ImportError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| ImportError::Unreadable("file is not valid UTF-8 text".to_string()))?;

    let mut reader = ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let records = reader.records().enumerate().map(|(index, record)| {
        let record = record.map_err(|e| ImportError::Unreadable(e.to_string()))?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 1);
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        Ok((line, cells))
    });

    assemble(records)
}

fn sniff_delimiter(text: &str) -> u8 {
    let header_line = text.lines().next().unwrap_or_default();
    [b',', b'\t', b';']
        .into_iter()
        .map(|d| (d, header_line.bytes().filter(|b| *b == d).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

/// Builds a sheet from `(line, cells)` records in file order.
/// The first non-blank record is the header.
fn assemble<I>(records: I) -> Result<ImportedSheet, ImportError>
where
    I: IntoIterator<Item = Result<(usize, Vec<String>), ImportError>>,
{
    let mut header: Option<(usize, Vec<String>)> = None;
    let mut rows = Vec::new();
    let mut row_numbers = Vec::new();

    for record in records {
        let (line, cells) = record?;
        if cells.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let Some((header_line, headers)) = header.as_ref() else {
            let headers = cells.iter().map(|h| h.trim().to_lowercase()).collect();
            header = Some((line, headers));
            continue;
        };

        row_numbers.push(line.saturating_sub(*header_line));
        rows.push(to_row(headers, &cells));
    }

    let Some((_, headers)) = header else {
        return Err(ImportError::Empty);
    };

    if rows.is_empty() {
        return Err(ImportError::Empty);
    }

    tracing::debug!("Imported {} rows with headers {:?}", rows.len(), headers);

    Ok(ImportedSheet {
        headers,
        rows,
        row_numbers,
    })
}

/// Every header becomes a key, so the row schema always matches the header
/// line; cells missing from a short record read as blank. A repeated header
/// keeps its first column.
fn to_row(headers: &[String], cells: &[String]) -> RawRow {
    let mut row = RawRow::new();
    for (index, header) in headers.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        let cell = cells.get(index).map(|c| c.trim()).unwrap_or_default();
        row.entry(header.clone())
            .or_insert_with(|| Value::String(cell.to_string()));
    }
    row
}
