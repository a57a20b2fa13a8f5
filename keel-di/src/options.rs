//! Populate options. Deserializable so hosts can keep them next to the rest of their settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulateOptions {
    /// Reject a second populate of the same container with `DiError::DuplicatePopulation`.
    pub check_duplicate_calls: bool,
}

impl PopulateOptions {
    pub fn checked() -> Self {
        Self {
            check_duplicate_calls: true,
        }
    }
}
