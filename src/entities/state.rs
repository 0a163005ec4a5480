// State entity - natural key + validated mutation
//
// The code is a national administrative code (e.g. IBGE state code). It is
// the entity's identity and never changes; name and abbreviation change only
// through `update`, which re-validates.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    code: u32,
    name: String,
    abbreviation: String,
}

impl State {
    /// Create a state, validating that the name is non-empty.
    pub fn new(
        code: u32,
        name: impl Into<String>,
        abbreviation: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName { entity: "state" });
        }

        Ok(State {
            code,
            name,
            abbreviation: abbreviation.into(),
        })
    }

    /// Rehydrate from storage without re-validating. The row was validated
    /// when it was written.
    pub(crate) fn from_storage(code: u32, name: String, abbreviation: String) -> Self {
        State {
            code,
            name,
            abbreviation,
        }
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    /// Apply new field values, re-validating.
    ///
    /// Returns `Ok(false)` when nothing differs - the update is a no-op, not
    /// a rewrite.
    pub fn update(
        &mut self,
        name: &str,
        abbreviation: &str,
    ) -> Result<bool, ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName { entity: "state" });
        }

        if self.name == name && self.abbreviation == abbreviation {
            return Ok(false);
        }

        self.name = name.to_string();
        self.abbreviation = abbreviation.to_string();
        Ok(true)
    }
}

// ============================================================================
// TESTS
// ============================================================================
