//! Sequence constructs

use super::ActionKey;
use crate::sim::SpellKey;

/// Runs its sub-actions one per execution, in order, then stays spent
/// until reset
#[derive(Debug, Clone)]
pub struct Sequence {
    pub name: String,
    pub actions: Vec<ActionKey>,
    pub cur: usize,
}

impl Sequence {
    pub fn new(name: String, actions: Vec<ActionKey>) -> Self {
        Self {
            name,
            actions,
            cur: 0,
        }
    }

    pub fn current(&self) -> Option<ActionKey> {
        self.actions.get(self.cur).copied()
    }
}

/// Rewinds a named sequence; resolved at finalize
#[derive(Debug, Clone)]
pub struct ResetSequence {
    pub sequence_name: String,
    pub sequence: Option<ActionKey>,
}

/// Takes control of action selection and hands out its sub-actions in order
/// until it finishes or its next step is not ready while the GCD is
#[derive(Debug, Clone)]
pub struct StrictSequence {
    pub actions: Vec<ActionKey>,
    /// Spells cast by the direct sub-actions, collected at finalize
    pub spells: Vec<SpellKey>,
    pub cur: usize,
}

impl StrictSequence {
    pub fn new(actions: Vec<ActionKey>) -> Self {
        Self {
            actions,
            spells: Vec::new(),
            cur: 0,
        }
    }
}
