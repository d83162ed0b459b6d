//! Per-unit rotation: configured lists, decision tick and diagnostics
//!
//! A `Rotation` is built once per simulated unit from a [`RotationConfig`]:
//! 1. parse: prepull entries (with their do-at offsets), then the priority list
//! 2. finalize: resolve sequences and groups, prepull first
//! 3. shaping: strip referenced auto cooldowns, inject implicit prepull steps
//!
//! After that the owning simulation calls [`Rotation::reset`] once per
//! iteration, runs the prepull steps at their offsets, and invokes
//! [`Rotation::do_next_action`] whenever the unit should decide.
//!
//! [`RotationConfig`]: crate::rules::RotationConfig

mod builder;
mod prepull;
mod shaping;
mod tick;

pub use builder::RotationBuilder;
pub use prepull::{PrepullStep, PrepullStepKind};

use crate::action::{ActionArena, ActionKey, ChannelPolicy, ControllingStack};
use crate::core::config::EngineConfig;
use crate::core::error::{AplError, Result};
use crate::rules::schema::RotationConfig;
use crate::sim::Simulation;
use crate::validation::{ActionStats, EntryValidations, Phase, RotationStats, ValidationSink};
use crate::value::Value;

pub struct Rotation {
    config: EngineConfig,
    arena: ActionArena,
    /// Accepted prepull actions with the configured entry they came from
    prepull_actions: Vec<(usize, ActionKey)>,
    /// Accepted priority actions with their configured entry, in list order
    priority_list: Vec<(usize, ActionKey)>,
    prepull_steps: Vec<PrepullStep>,
    controlling: ControllingStack,
    channel: ChannelPolicy,
    sink: ValidationSink,
    prepull_validations: Vec<EntryValidations>,
    priority_validations: Vec<EntryValidations>,
    post_finalized: bool,
    /// Set once an engine invariant broke; the unit must stop
    halted: bool,
}

impl Rotation {
    /// Build with the process-wide engine config and no extensions
    pub fn new(config: &RotationConfig, sim: &mut dyn Simulation) -> Self {
        RotationBuilder::new(config).build(sim)
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn arena(&self) -> &ActionArena {
        &self.arena
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn controlling(&self) -> &ControllingStack {
        &self.controlling
    }

    pub fn channel_policy(&self) -> ChannelPolicy {
        self.channel
    }

    /// Prepare for a new iteration
    ///
    /// Clears the controlling stack and channel policy and rewinds every
    /// action's per-iteration state. Configuration is never re-parsed.
    pub fn reset(&mut self, sim: &dyn Simulation) {
        self.controlling.clear();
        self.channel.clear();
        self.arena.reset_all(sim);
    }

    // === INTROSPECTION ===

    fn priority_roots(&self) -> Vec<ActionKey> {
        self.priority_list.iter().map(|&(_, key)| key).collect()
    }

    fn prepull_roots(&self) -> Vec<ActionKey> {
        self.prepull_actions.iter().map(|&(_, key)| key).collect()
    }

    /// Priority list actions and everything below them, group contents included
    pub fn all_actions(&self) -> Vec<ActionKey> {
        self.arena.all_actions(&self.priority_roots())
    }

    pub fn all_prepull_actions(&self) -> Vec<ActionKey> {
        self.arena.all_actions(&self.prepull_roots())
    }

    /// Every value node reachable from the priority list
    pub fn all_values(&self) -> Vec<&Value> {
        self.arena.values(&self.all_actions())
    }

    /// Accepted priority list actions, in scan order
    pub fn priority_list(&self) -> Vec<ActionKey> {
        self.priority_roots()
    }

    pub fn action_description(&self, key: ActionKey) -> String {
        self.arena.describe(key)
    }

    // === DIAGNOSTICS ===

    /// Diagnostics export, one bundle per configured entry
    ///
    /// The first call runs the post-finalize moment.
    pub fn stats(&mut self, sim: &dyn Simulation) -> RotationStats {
        if !self.post_finalized {
            self.post_finalize(sim);
        }

        RotationStats {
            prepull_actions: self.prepull_validations.iter().map(ActionStats::from).collect(),
            priority_list: self.priority_validations.iter().map(ActionStats::from).collect(),
            uuid_validations: self.sink.uuid_validations().to_vec(),
        }
    }

    fn post_finalize(&mut self, sim: &dyn Simulation) {
        self.post_finalized = true;

        let mut visited = vec![false; self.arena.len()];
        for &(entry, key) in &self.prepull_actions {
            self.arena.post_finalize(key, sim, &mut self.sink, &mut visited);
            self.prepull_validations[entry].record(Phase::PostFinalize, self.sink.take_current());
        }

        let mut visited = vec![false; self.arena.len()];
        for &(entry, key) in &self.priority_list {
            self.arena.post_finalize(key, sim, &mut self.sink, &mut visited);
            self.priority_validations[entry].record(Phase::PostFinalize, self.sink.take_current());
        }
    }

    /// Mark the rotation halted and log the failure
    fn halt(&mut self, error: AplError) -> AplError {
        tracing::error!("Rotation halted: {}", error);
        self.halted = true;
        error
    }

    fn ensure_running(&self) -> Result<()> {
        if self.halted {
            return Err(AplError::Halted);
        }
        Ok(())
    }
}
