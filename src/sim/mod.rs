//! Collaborator surface consumed by the decision engine
//!
//! The engine never owns simulation time, combat resolution or the spellbook.
//! Everything it needs from the surrounding simulation goes through the
//! [`Simulation`] trait, implemented once per simulated unit.

pub mod sandbox;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::{ActionId, ItemSet, SimDuration, UnitIndex, UnitRef};

pub use sandbox::{SandboxSpell, SandboxUnit};

/// Handle to a spell in the owning unit's spellbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpellKey(pub u32);

/// A spellbook entry resolved from a configured action id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpellRef {
    pub key: SpellKey,
    pub id: ActionId,
}

impl fmt::Display for SpellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

bitflags! {
    /// Properties of a spell that the engine branches on.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct SpellFlags: u16 {
        /// Preferred match when several spells share an action id
        const APL                   = 1 << 0;
        const CHANNELED             = 1 << 1;
        const POTION                = 1 << 2;
        const PREPULL_POTION        = 1 << 3;
        const COMBAT_POTION         = 1 << 4;
        /// Castable while another spell is being channeled
        const CAST_WHILE_CHANNELING = 1 << 5;
        /// Managed by the generic cooldown autocaster unless referenced explicitly
        const MAJOR_COOLDOWN        = 1 << 6;
    }
}

/// Read-only description of a spellbook entry
#[derive(Debug, Clone)]
pub struct SpellInfo {
    pub key: SpellKey,
    pub action_id: ActionId,
    pub label: String,
    pub flags: SpellFlags,
}

/// The channel currently occupying the unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    pub spell: SpellKey,
    /// Ticks still to land; zero once the final tick fired
    pub remaining_ticks: u32,
}

/// Live state of an aura or damage-over-time effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuraState {
    pub active: bool,
    pub remaining: SimDuration,
}

/// Capabilities the engine consumes from the simulation, scoped to one unit
///
/// Query methods take `&self` and must not change simulation state; they are
/// called freely while evaluating conditions.
pub trait Simulation {
    // === TIME ===
    fn current_time(&self) -> SimDuration;

    /// Time left in the encounter
    fn remaining_time(&self) -> SimDuration;

    fn reaction_time(&self) -> SimDuration;

    fn is_moving(&self) -> bool;

    // === DECISION GATES ===
    /// Shared decision-gate timer; no decision is made while it is pending
    fn rotation_ready(&self) -> bool;

    fn gcd_ready(&self) -> bool;

    fn next_gcd_at(&self) -> SimDuration;

    /// Ask the scheduler to invoke the decision tick again at `at`
    fn wait_until(&mut self, at: SimDuration);

    /// Block the decision gate until `at`
    fn hold_rotation_until(&mut self, at: SimDuration);

    // === ABILITIES ===
    fn spellbook(&self) -> &[SpellInfo];

    fn spell_is_ready(&self, spell: SpellKey) -> bool;

    fn spell_time_to_ready(&self, spell: SpellKey) -> SimDuration;

    fn can_cast(&self, spell: SpellKey, target: Option<UnitIndex>) -> bool;

    /// Cast `spell`; returns false when the cast failed
    fn cast(&mut self, spell: SpellKey, target: Option<UnitIndex>) -> bool;

    fn channel(&self) -> Option<ChannelState>;

    /// Stop the generic cooldown autocaster from using `spell`
    fn remove_auto_cooldown(&mut self, spell: SpellKey);

    // === UNITS ===
    fn resolve_unit(&self, unit: UnitRef) -> Option<UnitIndex>;

    fn unit_label(&self, unit: UnitIndex) -> String;

    fn aura(&self, unit: UnitIndex, aura: &ActionId) -> Option<AuraState>;

    fn dot(&self, unit: UnitIndex, spell: SpellKey) -> Option<AuraState>;

    /// Health as a fraction in `0.0..=1.0`
    fn health_percent(&self, unit: UnitIndex) -> f64;

    // === LOADOUT ===
    fn item_swap_enabled(&self) -> bool;

    /// Equipment set currently worn
    fn item_set(&self) -> ItemSet;

    fn swap_items(&mut self, set: ItemSet);

    /// Spell metadata by key
    fn spell_info(&self, spell: SpellKey) -> Option<&SpellInfo> {
        self.spellbook().iter().find(|info| info.key == spell)
    }

    /// Label of the unit owning the rotation
    fn player_label(&self) -> String {
        self.resolve_unit(UnitRef::Player)
            .map(|unit| self.unit_label(unit))
            .unwrap_or_else(|| "Unit".to_string())
    }
}
