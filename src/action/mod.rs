//! Action tree nodes and their execution contract
//!
//! Actions of one rotation live in an [`ActionArena`] and refer to each
//! other by [`ActionKey`]. Every node follows the same four-step contract:
//! finalize once after the whole tree exists, reset at the start of each
//! iteration, report readiness, and execute.

pub mod arena;
pub mod build;
pub mod controlling;
pub mod group;
pub mod sequence;
pub mod spell;

use serde::Serialize;
use std::fmt;

use crate::core::types::SimDuration;
use crate::sim::Simulation;
use crate::validation::ValidationSink;
use crate::value::Value;

pub use arena::{ActionArena, ExecContext};
pub use controlling::{ChannelPolicy, ControlStep, ControllingStack};
pub use group::{Group, GroupReference, GroupState};
pub use sequence::{ResetSequence, Sequence, StrictSequence};
pub use spell::{CastSpell, ChannelSpell, ItemSwap, Wait};

/// Handle to a node in its rotation's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActionKey(pub u32);

impl ActionKey {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Gate evaluated before the node's own readiness
#[derive(Debug)]
pub enum Condition {
    Always,
    When(Value),
    /// The configured condition could not be built
    Never,
}

impl Condition {
    pub fn holds(&self, sim: &dyn Simulation) -> bool {
        match self {
            Condition::Always => true,
            Condition::When(value) => value.get_bool(sim),
            Condition::Never => false,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Condition::When(value) => Some(value),
            _ => None,
        }
    }
}

/// Leaf action supplied by an embedding through [`crate::rules::Extensions`]
pub trait CustomAction: fmt::Debug + Send {
    fn values(&self) -> Vec<&Value> {
        Vec::new()
    }

    fn finalize(&mut self, _sim: &dyn Simulation, _sink: &mut ValidationSink) {}

    fn post_finalize(&mut self, _sim: &dyn Simulation, _sink: &mut ValidationSink) {}

    fn reset(&mut self, _sim: &dyn Simulation) {}

    fn is_ready(&self, sim: &dyn Simulation) -> bool;

    /// Perform the effect; returns false when it could not be carried out
    fn execute(&mut self, sim: &mut dyn Simulation) -> bool;

    fn describe(&self) -> String;
}

#[derive(Debug)]
pub enum ActionKind {
    CastSpell(CastSpell),
    ChannelSpell(ChannelSpell),
    Wait(Wait),
    Sequence(Sequence),
    ResetSequence(ResetSequence),
    StrictSequence(StrictSequence),
    GroupReference(GroupReference),
    ItemSwap(ItemSwap),
    Custom(Box<dyn CustomAction>),
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::CastSpell(_) => "cast_spell",
            ActionKind::ChannelSpell(_) => "channel_spell",
            ActionKind::Wait(_) => "wait",
            ActionKind::Sequence(_) => "sequence",
            ActionKind::ResetSequence(_) => "reset_sequence",
            ActionKind::StrictSequence(_) => "strict_sequence",
            ActionKind::GroupReference(_) => "group_reference",
            ActionKind::ItemSwap(_) => "item_swap",
            ActionKind::Custom(_) => "custom",
        }
    }
}

#[derive(Debug)]
pub struct ActionNode {
    pub condition: Condition,
    pub kind: ActionKind,
}

impl ActionNode {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            condition: Condition::Always,
            kind,
        }
    }

    /// Values held directly by this node, condition first
    pub fn values(&self) -> Vec<&Value> {
        let mut values: Vec<&Value> = self.condition.value().into_iter().collect();
        match &self.kind {
            ActionKind::ChannelSpell(channel) => values.extend(channel.interrupt_if.as_ref()),
            ActionKind::Wait(wait) => values.push(&wait.duration),
            ActionKind::Custom(custom) => values.extend(custom.values()),
            _ => {}
        }
        values
    }

    /// Restore per-iteration state
    pub fn reset(&mut self, sim: &dyn Simulation) {
        match &mut self.kind {
            ActionKind::Sequence(sequence) => sequence.cur = 0,
            ActionKind::StrictSequence(strict) => strict.cur = 0,
            ActionKind::Wait(wait) => wait.until = SimDuration::ZERO,
            ActionKind::Custom(custom) => custom.reset(sim),
            _ => {}
        }
    }
}
