// City entity - natural key + mandatory state reference
//
// A city can only be constructed from a resolved `State`, so the stored
// state code always agrees with a state that existed at reconciliation time.
// Referential integrity is enforced here and re-checked on every update.

use serde::{Deserialize, Serialize};

use crate::entities::State;
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    code: u32,
    name: String,
    state_code: u32,
}

impl City {
    /// Create a city owned by an already-resolved state.
    pub fn new(code: u32, name: impl Into<String>, state: &State) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName { entity: "city" });
        }

        Ok(City {
            code,
            name,
            state_code: state.code(),
        })
    }

    /// Rehydrate from storage without re-validating. The row was validated
    /// when it was written.
    pub(crate) fn from_storage(code: u32, name: String, state_code: u32) -> Self {
        City {
            code,
            name,
            state_code,
        }
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state_code(&self) -> u32 {
        self.state_code
    }

    /// Apply a new name and owning state, re-validating both invariants.
    ///
    /// Returns `Ok(false)` when nothing differs (no-op update).
    pub fn update(&mut self, name: &str, state: &State) -> Result<bool, ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName { entity: "city" });
        }

        if self.name == name && self.state_code == state.code() {
            return Ok(false);
        }

        self.name = name.to_string();
        self.state_code = state.code();
        Ok(true)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> State {
        State::new(11, "São Paulo", "SP").unwrap()
    }

    #[test]
    fn test_city_creation_takes_state_code_from_resolved_state() {
        let city = City::new(3550308, "São Paulo", &sp()).unwrap();
        assert_eq!(city.code(), 3550308);
        assert_eq!(city.name(), "São Paulo");
        assert_eq!(city.state_code(), 11);
    }

    #[test]
    fn test_city_creation_rejects_empty_name() {
        let result = City::new(3550308, "  ", &sp());
        assert!(matches!(
            result,
            Err(ValidationError::EmptyName { entity: "city" })
        ));
    }

    #[test]
    fn test_update_reassigns_state() {
        let rj = State::new(33, "Rio de Janeiro", "RJ").unwrap();
        let mut city = City::new(3550308, "São Paulo", &sp()).unwrap();

        let changed = city.update("São Paulo", &rj).unwrap();
        assert!(changed);
        assert_eq!(city.state_code(), 33);
        assert_eq!(city.code(), 3550308); // identity untouched
    }

    #[test]
    fn test_update_with_identical_values_is_a_noop() {
        let state = sp();
        let mut city = City::new(3550308, "São Paulo", &state).unwrap();
        let changed = city.update("São Paulo", &state).unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_update_rejects_empty_name() {
        let state = sp();
        let mut city = City::new(3550308, "São Paulo", &state).unwrap();
        let result = city.update("", &state);

        assert!(result.is_err());
        assert_eq!(city.name(), "São Paulo");
    }
}
