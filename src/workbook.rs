// Workbook Reader - xlsx sheet scanning
//
// Opens a binary xlsx payload, locates a sheet by exact name, and yields raw
// rows starting at the first data row (row 2; row 1 is a header). Scanning
// stops at the first row whose key column (A) is empty, so trailing formatting
// noise below the data block is never read.
//
// Missing sheets and unreadable payloads are explicit error values. The
// import orchestrator maps both to "zero rows" - that mapping is intentional
// pipeline behavior, not a blanket catch-all.

use calamine::{Data, Range, Reader, Xlsx};
use std::io::Cursor;

use crate::error::WorkbookError;

/// Sheet holding state rows (A: code, B: name, C: abbreviation).
pub const STATES_SHEET: &str = "ESTADOS";

/// Sheet holding city rows (A: code, B: name, C: owning-state code).
pub const CITIES_SHEET: &str = "MUNICIPIOS";

/// First data row, 1-based. Row 1 is the header.
pub const FIRST_DATA_ROW: u32 = 2;

// ============================================================================
// CELL VALUES
// ============================================================================

/// A raw cell value, decoupled from the underlying xlsx library.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(trimmed.to_string())
                }
            }
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            other => CellValue::Text(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Render the cell as text. Whole numbers lose the trailing `.0` so a
    /// numeric cell holding a name or abbreviation reads naturally.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(f) => {
                if f.fract() == 0.0 {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
        }
    }
}

// ============================================================================
// RAW ROWS
// ============================================================================

/// One scanned row: the 1-based row index plus the first three cells by
/// column letter. The index is carried only for error reporting.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub row: u32,
    pub a: CellValue,
    pub b: CellValue,
    pub c: CellValue,
}

// ============================================================================
// WORKBOOK READER
// ============================================================================

/// Reader over an in-memory xlsx payload.
pub struct WorkbookReader {
    workbook: Xlsx<Cursor<Vec<u8>>>,
}

impl WorkbookReader {
    /// Open a binary payload as an xlsx workbook.
    ///
    /// Returns `WorkbookError::Malformed` when the bytes are not a readable
    /// workbook; the caller decides whether that is fatal (for the import
    /// pipeline it is not - it means zero rows for every sheet).
    pub fn open(bytes: &[u8]) -> Result<Self, WorkbookError> {
        let cursor = Cursor::new(bytes.to_vec());
        let workbook =
            Xlsx::new(cursor).map_err(|e| WorkbookError::Malformed(e.to_string()))?;
        Ok(WorkbookReader { workbook })
    }

    /// Iterate the data rows of a named sheet.
    ///
    /// The returned iterator is finite and non-restartable: it walks from
    /// `FIRST_DATA_ROW` and fuses at the first row with an empty column A.
    pub fn sheet_rows(&mut self, sheet: &str) -> Result<SheetRows, WorkbookError> {
        let known = self.workbook.sheet_names();
        if !known.iter().any(|name| name == sheet) {
            return Err(WorkbookError::MissingSheet(sheet.to_string()));
        }

        let range = self
            .workbook
            .worksheet_range(sheet)
            .map_err(|e| WorkbookError::Malformed(e.to_string()))?;

        Ok(SheetRows {
            range,
            next_row: FIRST_DATA_ROW,
            done: false,
        })
    }
}

/// Lazy row sequence over one sheet. See [`WorkbookReader::sheet_rows`].
pub struct SheetRows {
    range: Range<Data>,
    next_row: u32,
    done: bool,
}

impl SheetRows {
    fn cell(&self, row: u32, col: u32) -> CellValue {
        // calamine uses zero-based absolute coordinates
        self.range
            .get_value((row - 1, col))
            .map(CellValue::from_data)
            .unwrap_or(CellValue::Empty)
    }
}

impl Iterator for SheetRows {
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        if self.done {
            return None;
        }

        let row = self.next_row;
        let a = self.cell(row, 0);
        if a.is_empty() {
            // end of data: first row without a key in column A
            self.done = true;
            return None;
        }

        self.next_row += 1;
        Some(RawRow {
            row,
            a,
            b: self.cell(row, 1),
            c: self.cell(row, 2),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    /// Build an xlsx payload with a single "ESTADOS" sheet holding the given
    /// (code, name, abbreviation) rows under a header row.
    fn states_workbook(rows: &[(f64, &str, &str)]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(STATES_SHEET).unwrap();
        sheet.write_string(0, 0, "CODIGO").unwrap();
        sheet.write_string(0, 1, "NOME").unwrap();
        sheet.write_string(0, 2, "SIGLA").unwrap();
        for (i, (code, name, abbr)) in rows.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_number(row, 0, *code).unwrap();
            sheet.write_string(row, 1, *name).unwrap();
            sheet.write_string(row, 2, *abbr).unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_open_rejects_garbage_bytes() {
        let result = WorkbookReader::open(b"definitely not an xlsx file");
        assert!(matches!(result, Err(WorkbookError::Malformed(_))));
    }

    #[test]
    fn test_missing_sheet_is_an_explicit_error() {
        let bytes = states_workbook(&[(11.0, "São Paulo", "SP")]);
        let mut reader = WorkbookReader::open(&bytes).unwrap();

        let result = reader.sheet_rows(CITIES_SHEET);
        assert!(matches!(result, Err(WorkbookError::MissingSheet(_))));
    }

    #[test]
    fn test_reads_rows_from_first_data_row() {
        let bytes = states_workbook(&[(11.0, "São Paulo", "SP"), (33.0, "Rio de Janeiro", "RJ")]);
        let mut reader = WorkbookReader::open(&bytes).unwrap();

        let rows: Vec<RawRow> = reader.sheet_rows(STATES_SHEET).unwrap().collect();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[0].a, CellValue::Number(11.0));
        assert_eq!(rows[0].b, CellValue::Text("São Paulo".to_string()));
        assert_eq!(rows[0].c, CellValue::Text("SP".to_string()));

        assert_eq!(rows[1].row, 3);
        assert_eq!(rows[1].a, CellValue::Number(33.0));
    }

    #[test]
    fn test_empty_sheet_yields_no_rows() {
        let bytes = states_workbook(&[]);
        let mut reader = WorkbookReader::open(&bytes).unwrap();

        let rows: Vec<RawRow> = reader.sheet_rows(STATES_SHEET).unwrap().collect();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_stops_at_first_row_without_key() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(STATES_SHEET).unwrap();
        sheet.write_string(0, 0, "CODIGO").unwrap();
        sheet.write_number(1, 0, 11.0).unwrap();
        sheet.write_string(1, 1, "São Paulo").unwrap();
        // row 3 has no column A, row 4 does - row 4 must NOT be read
        sheet.write_string(3, 1, "orphan name").unwrap();
        sheet.write_number(4, 0, 33.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let mut reader = WorkbookReader::open(&bytes).unwrap();
        let rows: Vec<RawRow> = reader.sheet_rows(STATES_SHEET).unwrap().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, 2);
    }

    #[test]
    fn test_whitespace_only_key_ends_the_scan() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(STATES_SHEET).unwrap();
        sheet.write_string(0, 0, "CODIGO").unwrap();
        sheet.write_number(1, 0, 11.0).unwrap();
        sheet.write_string(2, 0, "   ").unwrap();
        sheet.write_number(3, 0, 33.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let mut reader = WorkbookReader::open(&bytes).unwrap();
        let rows: Vec<RawRow> = reader.sheet_rows(STATES_SHEET).unwrap().collect();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_missing_trailing_cells_read_as_empty() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(STATES_SHEET).unwrap();
        sheet.write_string(0, 0, "CODIGO").unwrap();
        sheet.write_number(1, 0, 11.0).unwrap();
        // no B or C cells on the data row
        let bytes = workbook.save_to_buffer().unwrap();

        let mut reader = WorkbookReader::open(&bytes).unwrap();
        let rows: Vec<RawRow> = reader.sheet_rows(STATES_SHEET).unwrap().collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].b.is_empty());
        assert!(rows[0].c.is_empty());
    }

    #[test]
    fn test_cell_value_as_text_formats_whole_numbers() {
        assert_eq!(CellValue::Number(3550308.0).as_text(), "3550308");
        assert_eq!(CellValue::Text("SP".to_string()).as_text(), "SP");
        assert_eq!(CellValue::Empty.as_text(), "");
    }
}
