// Error taxonomy for the reference-data import pipeline
//
// Recoverability is part of the contract:
// - WorkbookError: sheet-level, degrades to "zero rows" (never aborts)
// - MappingError / ValidationError / UnresolvedReference: row-scoped,
//   recorded in the aggregate and processing continues
// - UnsupportedContentType: fatal, checked before the stream is opened

use thiserror::Error;

// ============================================================================
// WORKBOOK ERRORS (sheet-level, recoverable)
// ============================================================================

/// Failures while locating or opening sheet data.
///
/// Both variants are recoverable: the orchestrator maps them to an empty row
/// sequence for the affected sheet instead of surfacing them to the caller.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// The payload could not be opened as an xlsx workbook at all.
    #[error("payload is not a readable workbook: {0}")]
    Malformed(String),

    /// The workbook opened fine but does not contain the named sheet.
    #[error("sheet {0:?} not present in workbook")]
    MissingSheet(String),
}

// ============================================================================
// ROW MAPPING ERRORS (row-scoped, recoverable)
// ============================================================================

/// A raw cell could not be converted into its expected type.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("row {row}, column {column}: expected an integer code, got {value:?}")]
    NonNumericCode {
        row: u32,
        column: char,
        value: String,
    },
}

// ============================================================================
// VALIDATION ERRORS (row-scoped, recoverable)
// ============================================================================

/// Entity-level invariant violations, raised by validated constructors and
/// update methods.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{entity} name must not be empty")]
    EmptyName { entity: &'static str },
}

// ============================================================================
// STORE ERRORS
// ============================================================================

/// Failures surfaced by a `ReferenceDataStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An upsert attempted to write invalid field values.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A city referenced a state code with no matching state in the store.
    #[error("no state with code {state_code} exists in the store")]
    UnresolvedReference { state_code: u32 },

    /// Infrastructure failure (I/O, SQL). Not row-scoped: aborts the run.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

// ============================================================================
// IMPORT ERRORS (fatal for the whole request)
// ============================================================================

/// Errors that abort an import run before or during processing.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The upload is not a recognizable spreadsheet. Rejected before any
    /// byte of the payload is read.
    #[error("unsupported content type {0:?}, expected a spreadsheet upload")]
    UnsupportedContentType(String),

    /// The backing store failed for reasons unrelated to any single row.
    #[error("reference-data store failure: {0}")]
    Store(#[source] StoreError),
}

// ============================================================================
// TESTS
// ============================================================================
