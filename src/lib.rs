// Location Reference Data - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod db;
pub mod entities;
pub mod error;
pub mod import;
pub mod mapper;
pub mod store;
pub mod workbook;

// Re-export commonly used types
pub use db::{setup_database, SqliteStore};
pub use entities::{City, State};
pub use error::{
    ImportError, MappingError, StoreError, ValidationError, WorkbookError,
};
pub use import::{
    EntityCounts, ImportOrchestrator, ImportOutcome, ImportPhase, ImportReport,
    RowErrorKind, RowFailure, SPREADSHEET_CONTENT_TYPE,
};
pub use mapper::{map_city_row, map_state_row, CityCandidate, StateCandidate};
pub use store::{MemoryStore, ReferenceDataStore, UpsertOutcome};
pub use workbook::{
    CellValue, RawRow, SheetRows, WorkbookReader, CITIES_SHEET, FIRST_DATA_ROW,
    STATES_SHEET,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
