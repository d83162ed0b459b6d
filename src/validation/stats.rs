//! Diagnostics export mirroring the authored rotation layout

use serde::Serialize;

use super::sink::{EntryValidations, UuidValidations, Validation};

/// Diagnostics for one authored list line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionStats {
    pub validations: Vec<Validation>,
}

impl From<&EntryValidations> for ActionStats {
    fn from(entry: &EntryValidations) -> Self {
        Self {
            validations: entry.merged(),
        }
    }
}

/// One bundle per configured prepull and priority entry, hidden and
/// rejected entries included, plus the identity-keyed messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RotationStats {
    pub prepull_actions: Vec<ActionStats>,
    pub priority_list: Vec<ActionStats>,
    pub uuid_validations: Vec<UuidValidations>,
}

impl RotationStats {
    /// Every message in the export
    pub fn all_validations(&self) -> impl Iterator<Item = &Validation> {
        self.prepull_actions
            .iter()
            .chain(&self.priority_list)
            .flat_map(|stats| &stats.validations)
            .chain(self.uuid_validations.iter().flat_map(|u| &u.validations))
    }

    pub fn is_clean(&self) -> bool {
        self.all_validations().next().is_none()
    }
}
