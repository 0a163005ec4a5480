// SQLite-backed reference-data store
//
// Durable implementation of the store contract. Both tables are keyed by the
// natural code (no surrogate ids); cities carry a foreign key to their state.
// Upsert is a single SELECT-then-write on one connection, so it is atomic per
// natural key from the caller's perspective.

use anyhow::Error as AnyError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::entities::{City, State};
use crate::error::StoreError;
use crate::store::{reconcile_city, reconcile_state, ReferenceDataStore, UpsertOutcome};

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(AnyError::new(err))
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Create tables if absent. Safe to call on every open.
pub fn setup_database(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS states (
            code INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            abbreviation TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cities (
            code INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            state_code INTEGER NOT NULL REFERENCES states(code),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cities_state_code ON cities(state_code)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a file-backed database with WAL journaling.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(backend)?;
        // WAL for crash recovery, as with any file-backed database here
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(backend)?;
        setup_database(&conn).map_err(backend)?;
        Ok(SqliteStore { conn })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        setup_database(&conn).map_err(backend)?;
        Ok(SqliteStore { conn })
    }

    pub fn state_count(&self) -> Result<usize, StoreError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM states", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(backend)
    }

    pub fn city_count(&self) -> Result<usize, StoreError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM cities", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(backend)
    }

    fn write_state(&self, state: &State) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO states (code, name, abbreviation) VALUES (?1, ?2, ?3)
                 ON CONFLICT(code) DO UPDATE SET name = ?2, abbreviation = ?3",
                params![state.code(), state.name(), state.abbreviation()],
            )
            .map_err(backend)?;
        Ok(())
    }

    fn write_city(&self, city: &City) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO cities (code, name, state_code) VALUES (?1, ?2, ?3)
                 ON CONFLICT(code) DO UPDATE SET name = ?2, state_code = ?3",
                params![city.code(), city.name(), city.state_code()],
            )
            .map_err(backend)?;
        Ok(())
    }
}

impl ReferenceDataStore for SqliteStore {
    fn get_state(&self, code: u32) -> Result<Option<State>, StoreError> {
        self.conn
            .query_row(
                "SELECT code, name, abbreviation FROM states WHERE code = ?1",
                params![code],
                |row| {
                    Ok(State::from_storage(
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                    ))
                },
            )
            .optional()
            .map_err(backend)
    }

    fn get_city(&self, code: u32) -> Result<Option<City>, StoreError> {
        self.conn
            .query_row(
                "SELECT code, name, state_code FROM cities WHERE code = ?1",
                params![code],
                |row| {
                    Ok(City::from_storage(
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                    ))
                },
            )
            .optional()
            .map_err(backend)
    }

    fn upsert_state(
        &mut self,
        code: u32,
        name: &str,
        abbreviation: &str,
    ) -> Result<UpsertOutcome, StoreError> {
        let existing = self.get_state(code)?;
        let (outcome, state) = reconcile_state(existing, code, name, abbreviation)?;
        if let Some(state) = state {
            self.write_state(&state)?;
        }
        Ok(outcome)
    }

    fn upsert_city(
        &mut self,
        code: u32,
        name: &str,
        state_code: u32,
    ) -> Result<UpsertOutcome, StoreError> {
        let state = self
            .get_state(state_code)?
            .ok_or(StoreError::UnresolvedReference { state_code })?;

        let existing = self.get_city(code)?;
        let (outcome, city) = reconcile_city(existing, code, name, &state)?;
        if let Some(city) = city {
            self.write_city(&city)?;
        }
        Ok(outcome)
    }

    fn add_states(&mut self, states: Vec<State>) -> Result<(), StoreError> {
        let tx = self.conn.transaction().map_err(backend)?;
        for state in &states {
            tx.execute(
                "INSERT INTO states (code, name, abbreviation) VALUES (?1, ?2, ?3)",
                params![state.code(), state.name(), state.abbreviation()],
            )
            .map_err(backend)?;
        }
        tx.commit().map_err(backend)
    }

    fn add_cities(&mut self, cities: Vec<City>) -> Result<(), StoreError> {
        let tx = self.conn.transaction().map_err(backend)?;
        for city in &cities {
            tx.execute(
                "INSERT INTO cities (code, name, state_code) VALUES (?1, ?2, ?3)",
                params![city.code(), city.name(), city.state_code()],
            )
            .map_err(backend)?;
        }
        tx.commit().map_err(backend)
    }

    fn cities_in_state(&self, state_code: u32) -> Result<Vec<City>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT code, name, state_code FROM cities
                 WHERE state_code = ?1 ORDER BY code",
            )
            .map_err(backend)?;

        let cities = stmt
            .query_map(params![state_code], |row| {
                Ok(City::from_storage(row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(backend)?
            .collect::<Result<Vec<City>, rusqlite::Error>>()
            .map_err(backend)?;

        Ok(cities)
    }

    fn find_city_by_name(&self, name: &str) -> Result<Option<City>, StoreError> {
        self.conn
            .query_row(
                "SELECT code, name, state_code FROM cities
                 WHERE name = ?1 ORDER BY code LIMIT 1",
                params![name],
                |row| {
                    Ok(City::from_storage(
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                    ))
                },
            )
            .optional()
            .map_err(backend)
    }
}

// ============================================================================
// TESTS
// ============================================================================
