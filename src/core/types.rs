//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

pub use super::duration::SimDuration;

/// Identifies an ability, item or engine-level action in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionId {
    Spell {
        id: i32,
        #[serde(default)]
        tag: i32,
    },
    Item {
        id: i32,
        #[serde(default)]
        tag: i32,
    },
    Other(OtherAction),
}

impl ActionId {
    pub fn spell(id: i32) -> Self {
        ActionId::Spell { id, tag: 0 }
    }

    pub fn item(id: i32) -> Self {
        ActionId::Item { id, tag: 0 }
    }

    /// Same ability, ignoring the tag
    pub fn same_action(&self, other: &ActionId) -> bool {
        match (self, other) {
            (ActionId::Spell { id: a, .. }, ActionId::Spell { id: b, .. }) => a == b,
            (ActionId::Item { id: a, .. }, ActionId::Item { id: b, .. }) => a == b,
            (ActionId::Other(a), ActionId::Other(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_other(&self, other: OtherAction) -> bool {
        matches!(self, ActionId::Other(o) if *o == other)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionId::Spell { id, tag: 0 } => write!(f, "{{SpellID: {id}}}"),
            ActionId::Spell { id, tag } => write!(f, "{{SpellID: {id}, Tag: {tag}}}"),
            ActionId::Item { id, tag: 0 } => write!(f, "{{ItemID: {id}}}"),
            ActionId::Item { id, tag } => write!(f, "{{ItemID: {id}, Tag: {tag}}}"),
            ActionId::Other(other) => write!(f, "{{OtherID: {other:?}}}"),
        }
    }
}

/// Engine-level actions that are not tied to a single spell id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtherAction {
    /// Whichever potion the unit carries for the current phase
    Potion,
    AttackMainHand,
    AttackOffHand,
}

/// Reference to a unit, resolved against the live encounter when used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitRef {
    #[default]
    Player,
    CurrentTarget,
    NextTarget,
    PreviousTarget,
    Target(i32),
}

impl UnitRef {
    /// Whether the referenced unit can change while the simulation runs
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            UnitRef::CurrentTarget | UnitRef::NextTarget | UnitRef::PreviousTarget
        )
    }
}

/// Index of a concrete unit in the encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitIndex(pub u32);

/// Equipment sets a unit can swap between
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSet {
    #[default]
    Main,
    Swap1,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_action_ignores_tag() {
        let a = ActionId::Spell { id: 100, tag: 1 };
        let b = ActionId::Spell { id: 100, tag: 2 };
        assert!(a.same_action(&b));
        assert_ne!(a, b);
        assert!(!a.same_action(&ActionId::item(100)));
    }

    #[test]
    fn test_action_id_display() {
        assert_eq!(ActionId::spell(42).to_string(), "{SpellID: 42}");
        assert_eq!(
            ActionId::Other(OtherAction::Potion).to_string(),
            "{OtherID: Potion}"
        );
    }

    #[test]
    fn test_dynamic_unit_refs() {
        assert!(UnitRef::CurrentTarget.is_dynamic());
        assert!(!UnitRef::Player.is_dynamic());
        assert!(!UnitRef::Target(2).is_dynamic());
    }
}
