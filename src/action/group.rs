//! Named action groups and references to them

use std::collections::BTreeMap;

use super::ActionKey;

/// Build progress of a group, tracked so references can detect cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// Not referenced yet
    Pending,
    /// Its actions are being finalized; a reference now closes a cycle
    Finalizing,
    Finalized,
    /// Failed to build; references to it never become ready
    Broken,
}

/// A group's actions, built once on first reference
#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub actions: Vec<ActionKey>,
    pub state: GroupState,
}

impl Group {
    pub fn is_usable(&self) -> bool {
        self.state == GroupState::Finalized
    }
}

#[derive(Debug, Clone)]
pub struct GroupReference {
    pub group_name: String,
    pub overrides: BTreeMap<String, String>,
    /// Index of the resolved group in the arena
    pub group: Option<usize>,
}

impl GroupReference {
    pub fn new(group_name: String, overrides: BTreeMap<String, String>) -> Self {
        Self {
            group_name,
            overrides,
            group: None,
        }
    }
}
