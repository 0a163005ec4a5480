// Row Mapper - raw cells to typed candidate records
//
// A candidate is an unvalidated tuple of field values for one row. It carries
// the source row index for error reporting and nothing else; reconciliation
// discards it. Mapping failures are row-scoped: the offending row is skipped
// and recorded, never aborting the batch.

use serde::{Deserialize, Serialize};

use crate::error::MappingError;
use crate::workbook::{CellValue, RawRow};

// ============================================================================
// CANDIDATE RECORDS
// ============================================================================

/// Unvalidated state row: A -> code, B -> name, C -> abbreviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateCandidate {
    pub row: u32,
    pub code: u32,
    pub name: String,
    pub abbreviation: String,
}

/// Unvalidated city row: A -> code, B -> name, C -> owning-state code.
///
/// The state code is parsed unconditionally; resolving it against the store
/// is the reconciliation step's job and is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityCandidate {
    pub row: u32,
    pub code: u32,
    pub name: String,
    pub state_code: u32,
}

// ============================================================================
// MAPPING
// ============================================================================

/// Parse a cell as a non-negative integer code.
fn parse_code(cell: &CellValue, row: u32, column: char) -> Result<u32, MappingError> {
    let reject = || MappingError::NonNumericCode {
        row,
        column,
        value: cell.as_text(),
    };

    match cell {
        CellValue::Number(f) => {
            if f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64 {
                Ok(*f as u32)
            } else {
                Err(reject())
            }
        }
        CellValue::Text(s) => s.trim().parse::<u32>().map_err(|_| reject()),
        CellValue::Empty => Err(reject()),
    }
}

/// Map one raw row from the states sheet.
pub fn map_state_row(raw: &RawRow) -> Result<StateCandidate, MappingError> {
    Ok(StateCandidate {
        row: raw.row,
        code: parse_code(&raw.a, raw.row, 'A')?,
        name: raw.b.as_text(),
        abbreviation: raw.c.as_text(),
    })
}

/// Map one raw row from the cities sheet.
pub fn map_city_row(raw: &RawRow) -> Result<CityCandidate, MappingError> {
    Ok(CityCandidate {
        row: raw.row,
        code: parse_code(&raw.a, raw.row, 'A')?,
        name: raw.b.as_text(),
        state_code: parse_code(&raw.c, raw.row, 'C')?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(row: u32, a: CellValue, b: CellValue, c: CellValue) -> RawRow {
        RawRow { row, a, b, c }
    }

    #[test]
    fn test_map_state_row_from_numeric_code() {
        let candidate = map_state_row(&raw(
            2,
            CellValue::Number(11.0),
            CellValue::Text("São Paulo".to_string()),
            CellValue::Text("SP".to_string()),
        ))
        .unwrap();

        assert_eq!(candidate.row, 2);
        assert_eq!(candidate.code, 11);
        assert_eq!(candidate.name, "São Paulo");
        assert_eq!(candidate.abbreviation, "SP");
    }

    #[test]
    fn test_map_state_row_parses_textual_code() {
        let candidate = map_state_row(&raw(
            3,
            CellValue::Text(" 33 ".to_string()),
            CellValue::Text("Rio de Janeiro".to_string()),
            CellValue::Text("RJ".to_string()),
        ))
        .unwrap();

        assert_eq!(candidate.code, 33);
    }

    #[test]
    fn test_map_state_row_rejects_non_numeric_code() {
        let err = map_state_row(&raw(
            4,
            CellValue::Text("abc".to_string()),
            CellValue::Text("Nowhere".to_string()),
            CellValue::Text("NW".to_string()),
        ))
        .unwrap_err();

        let MappingError::NonNumericCode { row, column, value } = err;
        assert_eq!(row, 4);
        assert_eq!(column, 'A');
        assert_eq!(value, "abc");
    }

    #[test]
    fn test_map_state_row_rejects_fractional_code() {
        let result = map_state_row(&raw(
            5,
            CellValue::Number(11.5),
            CellValue::Text("Half".to_string()),
            CellValue::Text("HF".to_string()),
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_map_city_row_parses_state_code() {
        let candidate = map_city_row(&raw(
            2,
            CellValue::Number(3550308.0),
            CellValue::Text("São Paulo".to_string()),
            CellValue::Number(11.0),
        ))
        .unwrap();

        assert_eq!(candidate.code, 3550308);
        assert_eq!(candidate.state_code, 11);
    }

    #[test]
    fn test_map_city_row_rejects_missing_state_code() {
        let err = map_city_row(&raw(
            6,
            CellValue::Number(3550308.0),
            CellValue::Text("São Paulo".to_string()),
            CellValue::Empty,
        ))
        .unwrap_err();

        let MappingError::NonNumericCode { column, .. } = err;
        assert_eq!(column, 'C');
    }

    #[test]
    fn test_empty_name_maps_to_empty_string() {
        // mapping does not validate; the store's upsert does
        let candidate = map_state_row(&raw(
            2,
            CellValue::Number(11.0),
            CellValue::Empty,
            CellValue::Text("SP".to_string()),
        ))
        .unwrap();
        assert_eq!(candidate.name, "");
    }
}
