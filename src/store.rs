// Reference-Data Store - the contract the import pipeline consumes
//
// The store is the system of record for states and cities. The pipeline only
// needs get-by-key and upsert; everything else (durability, concurrency
// discipline, timeouts) is the implementation's concern. Upsert must be
// atomic per natural key from the caller's perspective.

use std::collections::BTreeMap;

use crate::entities::{City, State};
use crate::error::StoreError;

// ============================================================================
// UPSERT OUTCOME
// ============================================================================

/// What a reconciliation decided for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record existed under the natural key; one was created.
    Created,
    /// A record existed and at least one field differed; it was updated.
    Updated,
    /// A record existed with identical fields; nothing was written.
    Unchanged,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
            UpsertOutcome::Unchanged => "unchanged",
        }
    }
}

// ============================================================================
// STORE CONTRACT
// ============================================================================

/// Get-by-key and upsert operations over persisted states and cities.
///
/// Implementations receive the store by explicit injection (constructor or
/// parameter), never through a global lookup.
pub trait ReferenceDataStore {
    fn get_state(&self, code: u32) -> Result<Option<State>, StoreError>;

    fn get_city(&self, code: u32) -> Result<Option<City>, StoreError>;

    /// Create-if-absent, validated-update-if-changed, no-op otherwise.
    fn upsert_state(
        &mut self,
        code: u32,
        name: &str,
        abbreviation: &str,
    ) -> Result<UpsertOutcome, StoreError>;

    /// As [`upsert_state`](ReferenceDataStore::upsert_state), but the owning
    /// state is resolved first; fails with `StoreError::UnresolvedReference`
    /// when no state with `state_code` exists.
    fn upsert_city(
        &mut self,
        code: u32,
        name: &str,
        state_code: u32,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Bulk insert for records the caller already knows are new. Skips the
    /// per-record existence check - an optimization path, not a correctness
    /// requirement.
    fn add_states(&mut self, states: Vec<State>) -> Result<(), StoreError>;

    /// Bulk insert of cities. See [`add_states`](ReferenceDataStore::add_states).
    fn add_cities(&mut self, cities: Vec<City>) -> Result<(), StoreError>;

    /// All cities owned by a state, ordered by city code.
    fn cities_in_state(&self, state_code: u32) -> Result<Vec<City>, StoreError>;

    /// First city with an exactly matching name, lowest code wins.
    fn find_city_by_name(&self, name: &str) -> Result<Option<City>, StoreError>;
}

// ============================================================================
// SHARED RECONCILIATION RULES
// ============================================================================

/// Decide create/update/no-op for a state row. Returns the entity to persist
/// when a write is needed.
pub(crate) fn reconcile_state(
    existing: Option<State>,
    code: u32,
    name: &str,
    abbreviation: &str,
) -> Result<(UpsertOutcome, Option<State>), StoreError> {
    match existing {
        None => {
            let state = State::new(code, name, abbreviation)?;
            Ok((UpsertOutcome::Created, Some(state)))
        }
        Some(mut state) => {
            if state.update(name, abbreviation)? {
                Ok((UpsertOutcome::Updated, Some(state)))
            } else {
                Ok((UpsertOutcome::Unchanged, None))
            }
        }
    }
}

/// Decide create/update/no-op for a city row. `state` must already be
/// resolved by the caller.
pub(crate) fn reconcile_city(
    existing: Option<City>,
    code: u32,
    name: &str,
    state: &State,
) -> Result<(UpsertOutcome, Option<City>), StoreError> {
    match existing {
        None => {
            let city = City::new(code, name, state)?;
            Ok((UpsertOutcome::Created, Some(city)))
        }
        Some(mut city) => {
            if city.update(name, state)? {
                Ok((UpsertOutcome::Updated, Some(city)))
            } else {
                Ok((UpsertOutcome::Unchanged, None))
            }
        }
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Map-backed store. Used by tests and small embeddings; the SQLite store in
/// `db` is the durable implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    states: BTreeMap<u32, State>,
    cities: BTreeMap<u32, City>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn city_count(&self) -> usize {
        self.cities.len()
    }
}

impl ReferenceDataStore for MemoryStore {
    fn get_state(&self, code: u32) -> Result<Option<State>, StoreError> {
        Ok(self.states.get(&code).cloned())
    }

    fn get_city(&self, code: u32) -> Result<Option<City>, StoreError> {
        Ok(self.cities.get(&code).cloned())
    }

    fn upsert_state(
        &mut self,
        code: u32,
        name: &str,
        abbreviation: &str,
    ) -> Result<UpsertOutcome, StoreError> {
        let existing = self.states.get(&code).cloned();
        let (outcome, state) = reconcile_state(existing, code, name, abbreviation)?;
        if let Some(state) = state {
            self.states.insert(code, state);
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

        let existing = self.cities.get(&code).cloned();
        let (outcome, city) = reconcile_city(existing, code, name, &state)?;
        if let Some(city) = city {
            self.cities.insert(code, city);
        }
        Ok(outcome)
    }

    fn add_states(&mut self, states: Vec<State>) -> Result<(), StoreError> {
        for state in states {
            self.states.insert(state.code(), state);
        }
        Ok(())
    }

    fn add_cities(&mut self, cities: Vec<City>) -> Result<(), StoreError> {
        for city in cities {
            self.cities.insert(city.code(), city);
        }
        Ok(())
    }

    fn cities_in_state(&self, state_code: u32) -> Result<Vec<City>, StoreError> {
        Ok(self
            .cities
            .values()
            .filter(|city| city.state_code() == state_code)
            .cloned()
            .collect())
    }

    fn find_city_by_name(&self, name: &str) -> Result<Option<City>, StoreError> {
        Ok(self
            .cities
            .values()
            .find(|city| city.name() == name)
            .cloned())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_state_creates_then_noops() {
        let mut store = MemoryStore::new();

        let first = store.upsert_state(11, "São Paulo", "SP").unwrap();
        assert_eq!(first, UpsertOutcome::Created);

        let second = store.upsert_state(11, "São Paulo", "SP").unwrap();
        assert_eq!(second, UpsertOutcome::Unchanged);

        assert_eq!(store.state_count(), 1);
    }

    #[test]
    fn test_upsert_state_updates_changed_fields() {
        let mut store = MemoryStore::new();
        store.upsert_state(11, "Sao Paulo", "SP").unwrap();

        let outcome = store.upsert_state(11, "São Paulo", "SP").unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let state = store.get_state(11).unwrap().unwrap();
        assert_eq!(state.name(), "São Paulo");
    }

    #[test]
    fn test_upsert_state_rejects_empty_name() {
        let mut store = MemoryStore::new();
        let result = store.upsert_state(11, "", "SP");
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(store.state_count(), 0);
    }

    #[test]
    fn test_upsert_city_requires_resolvable_state() {
        let mut store = MemoryStore::new();

        let result = store.upsert_city(3550308, "São Paulo", 11);
        assert!(matches!(
            result,
            Err(StoreError::UnresolvedReference { state_code: 11 })
        ));
        assert_eq!(store.city_count(), 0);
    }

    #[test]
    fn test_upsert_city_creates_with_resolved_state() {
        let mut store = MemoryStore::new();
        store.upsert_state(11, "São Paulo", "SP").unwrap();

        let outcome = store.upsert_city(3550308, "São Paulo", 11).unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);

        let city = store.get_city(3550308).unwrap().unwrap();
        assert_eq!(city.state_code(), 11);
    }

    #[test]
    fn test_upsert_city_reassigns_state_on_update() {
        let mut store = MemoryStore::new();
        store.upsert_state(11, "São Paulo", "SP").unwrap();
        store.upsert_state(33, "Rio de Janeiro", "RJ").unwrap();
        store.upsert_city(3550308, "São Paulo", 11).unwrap();

        let outcome = store.upsert_city(3550308, "São Paulo", 33).unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(store.get_city(3550308).unwrap().unwrap().state_code(), 33);
    }

    #[test]
    fn test_add_all_bulk_insert_is_readable() {
        let mut store = MemoryStore::new();
        let sp = State::new(11, "São Paulo", "SP").unwrap();
        let rj = State::new(33, "Rio de Janeiro", "RJ").unwrap();
        let city = City::new(3550308, "São Paulo", &sp).unwrap();

        store.add_states(vec![sp, rj]).unwrap();
        store.add_cities(vec![city]).unwrap();

        assert_eq!(store.state_count(), 2);
        assert!(store.get_city(3550308).unwrap().is_some());
    }

    #[test]
    fn test_cities_in_state_filters_and_orders_by_code() {
        let mut store = MemoryStore::new();
        store.upsert_state(11, "São Paulo", "SP").unwrap();
        store.upsert_state(33, "Rio de Janeiro", "RJ").unwrap();
        store.upsert_city(3550308, "São Paulo", 11).unwrap();
        store.upsert_city(3509502, "Campinas", 11).unwrap();
        store.upsert_city(3304557, "Rio de Janeiro", 33).unwrap();

        let cities = store.cities_in_state(11).unwrap();
        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].code(), 3509502);
        assert_eq!(cities[1].code(), 3550308);
    }

    #[test]
    fn test_find_city_by_name() {
        let mut store = MemoryStore::new();
        store.upsert_state(11, "São Paulo", "SP").unwrap();
        store.upsert_city(3509502, "Campinas", 11).unwrap();

        assert!(store.find_city_by_name("Campinas").unwrap().is_some());
        assert!(store.find_city_by_name("Atlantis").unwrap().is_none());
    }
}
