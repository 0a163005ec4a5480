// Import Orchestrator - workbook to store, best-effort
//
// Drives the end-to-end pipeline: validate the content type, open the
// workbook, map rows, reconcile each candidate against the injected store.
// States reconcile before cities because a city row requires a resolvable
// state. Row-scoped failures degrade into the aggregate's error list; only
// the content-type check (and backend store failures) abort the run.
//
// The orchestrator holds no persisted state of its own between runs.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ImportError, StoreError};
use crate::mapper::{map_city_row, map_state_row};
use crate::store::ReferenceDataStore;
use crate::workbook::{RawRow, WorkbookReader, CITIES_SHEET, STATES_SHEET};

/// The only content type accepted for an import upload.
pub const SPREADSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// ============================================================================
// AGGREGATE RESULT
// ============================================================================

/// Per-entity reconciliation tally. Every data row lands in exactly one
/// bucket, so `created + updated + skipped` equals the rows read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl EntityCounts {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped
    }
}

/// Why a row was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowErrorKind {
    /// A cell failed to parse into its expected type.
    Mapping,
    /// A city referenced a state code not present in the store.
    UnresolvedReference,
    /// The upsert's new field values failed entity validation.
    Validation,
}

/// One skipped row: which sheet, which 1-based row, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    pub sheet: String,
    pub row: u32,
    pub kind: RowErrorKind,
    pub message: String,
}

/// Terminal outcome of a run. Partial failure still means every reconcilable
/// row was completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportOutcome {
    Completed,
    PartialFailure,
}

/// Aggregate result of one import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub states: EntityCounts,
    pub cities: EntityCounts,
    pub errors: Vec<RowFailure>,
    pub outcome: ImportOutcome,
    /// True when the run was cancelled mid-batch; counts cover the rows
    /// processed up to that point.
    pub cancelled: bool,
    pub finished_at: DateTime<Utc>,
}

impl ImportReport {
    fn new() -> Self {
        ImportReport {
            states: EntityCounts::default(),
            cities: EntityCounts::default(),
            errors: Vec::new(),
            outcome: ImportOutcome::Completed,
            cancelled: false,
            finished_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "states: {} created, {} updated, {} skipped; cities: {} created, {} updated, {} skipped; {} row error(s)",
            self.states.created,
            self.states.updated,
            self.states.skipped,
            self.cities.created,
            self.cities.updated,
            self.cities.skipped,
            self.errors.len()
        )
    }
}

// ============================================================================
// PIPELINE PHASES
// ============================================================================

/// Progress of a run, in order. Used for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    Start,
    ReadingStates,
    ReconcilingStates,
    ReadingCities,
    ReconcilingCities,
    Done,
}

impl ImportPhase {
    pub fn name(&self) -> &'static str {
        match self {
            ImportPhase::Start => "Start",
            ImportPhase::ReadingStates => "ReadingStates",
            ImportPhase::ReconcilingStates => "ReconcilingStates",
            ImportPhase::ReadingCities => "ReadingCities",
            ImportPhase::ReconcilingCities => "ReconcilingCities",
            ImportPhase::Done => "Done",
        }
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Runs one import against an explicitly injected store.
pub struct ImportOrchestrator<'a, S: ReferenceDataStore> {
    store: &'a mut S,
    cancel: Option<Arc<AtomicBool>>,
    phase: ImportPhase,
}

impl<'a, S: ReferenceDataStore> ImportOrchestrator<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        ImportOrchestrator {
            store,
            cancel: None,
            phase: ImportPhase::Start,
        }
    }

    /// Attach a cooperative cancellation flag. When it flips to true the run
    /// stops after the current row and returns the partial aggregate;
    /// already-reconciled rows are not rolled back.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn set_phase(&mut self, phase: ImportPhase) {
        debug!("import phase {} -> {}", self.phase.name(), phase.name());
        self.phase = phase;
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Run the pipeline over an uploaded payload.
    ///
    /// Fail-fast only on the content-type check (no partial state is touched)
    /// and on backend store failures. A payload that is not a readable
    /// workbook, or is missing one or both sheets, produces a report with
    /// zero rows for the affected sheets - never an error.
    pub fn import(
        &mut self,
        content_type: &str,
        payload: &[u8],
    ) -> Result<ImportReport, ImportError> {
        if content_type != SPREADSHEET_CONTENT_TYPE {
            return Err(ImportError::UnsupportedContentType(content_type.to_string()));
        }

        let mut report = ImportReport::new();

        let mut reader = match WorkbookReader::open(payload) {
            Ok(reader) => Some(reader),
            Err(err) => {
                // unreadable payload is a silent-skip condition: zero rows
                warn!("workbook payload not readable, importing nothing: {err}");
                None
            }
        };

        // states first: cities depend on states being resolvable
        self.set_phase(ImportPhase::ReadingStates);
        let state_rows = sheet_rows_or_empty(reader.as_mut(), STATES_SHEET);

        self.set_phase(ImportPhase::ReconcilingStates);
        self.reconcile_states(state_rows, &mut report)?;

        if !report.cancelled {
            self.set_phase(ImportPhase::ReadingCities);
            let city_rows = sheet_rows_or_empty(reader.as_mut(), CITIES_SHEET);

            self.set_phase(ImportPhase::ReconcilingCities);
            self.reconcile_cities(city_rows, &mut report)?;
        }

        self.set_phase(ImportPhase::Done);
        report.outcome = if report.errors.is_empty() {
            ImportOutcome::Completed
        } else {
            ImportOutcome::PartialFailure
        };
        report.finished_at = Utc::now();
        Ok(report)
    }

    fn reconcile_states(
        &mut self,
        rows: Vec<RawRow>,
        report: &mut ImportReport,
    ) -> Result<(), ImportError> {
        for raw in rows {
            if self.is_cancelled() {
                report.cancelled = true;
                return Ok(());
            }

            let candidate = match map_state_row(&raw) {
                Ok(candidate) => candidate,
                Err(err) => {
                    report.states.skipped += 1;
                    report.errors.push(RowFailure {
                        sheet: STATES_SHEET.to_string(),
                        row: raw.row,
                        kind: RowErrorKind::Mapping,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            match self.store.upsert_state(
                candidate.code,
                &candidate.name,
                &candidate.abbreviation,
            ) {
                Ok(outcome) => tally(&mut report.states, outcome),
                Err(StoreError::Backend(err)) => {
                    return Err(ImportError::Store(StoreError::Backend(err)));
                }
                Err(err) => {
                    report.states.skipped += 1;
                    report.errors.push(RowFailure {
                        sheet: STATES_SHEET.to_string(),
                        row: candidate.row,
                        kind: row_error_kind(&err),
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn reconcile_cities(
        &mut self,
        rows: Vec<RawRow>,
        report: &mut ImportReport,
    ) -> Result<(), ImportError> {
        for raw in rows {
            if self.is_cancelled() {
                report.cancelled = true;
                return Ok(());
            }

            let candidate = match map_city_row(&raw) {
                Ok(candidate) => candidate,
                Err(err) => {
                    report.cities.skipped += 1;
                    report.errors.push(RowFailure {
                        sheet: CITIES_SHEET.to_string(),
                        row: raw.row,
                        kind: RowErrorKind::Mapping,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            match self
                .store
                .upsert_city(candidate.code, &candidate.name, candidate.state_code)
            {
                Ok(outcome) => tally(&mut report.cities, outcome),
                Err(StoreError::Backend(err)) => {
                    return Err(ImportError::Store(StoreError::Backend(err)));
                }
                Err(err) => {
                    report.cities.skipped += 1;
                    report.errors.push(RowFailure {
                        sheet: CITIES_SHEET.to_string(),
                        row: candidate.row,
                        kind: row_error_kind(&err),
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn sheet_rows_or_empty(reader: Option<&mut WorkbookReader>, sheet: &str) -> Vec<RawRow> {
    let Some(reader) = reader else {
        return Vec::new();
    };

    match reader.sheet_rows(sheet) {
        Ok(rows) => rows.collect(),
        Err(err) => {
            // absent sheet means zero rows for that sheet, never a failure
            debug!("skipping sheet: {err}");
            Vec::new()
        }
    }
}

fn tally(counts: &mut EntityCounts, outcome: crate::store::UpsertOutcome) {
    use crate::store::UpsertOutcome;
    match outcome {
        UpsertOutcome::Created => counts.created += 1,
        UpsertOutcome::Updated => counts.updated += 1,
        UpsertOutcome::Unchanged => counts.skipped += 1,
    }
}

fn row_error_kind(err: &StoreError) -> RowErrorKind {
    match err {
        StoreError::UnresolvedReference { .. } => RowErrorKind::UnresolvedReference,
        _ => RowErrorKind::Validation,
    }
}

// ============================================================================
// TESTS
// ============================================================================
