//! Leaf actions: casting, channeling, waiting and loadout swaps

use crate::core::types::{ItemSet, SimDuration, UnitRef};
use crate::sim::{Simulation, SpellRef};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct CastSpell {
    pub spell: SpellRef,
    pub target: UnitRef,
}

impl CastSpell {
    pub fn is_ready(&self, sim: &dyn Simulation) -> bool {
        sim.can_cast(self.spell.key, sim.resolve_unit(self.target))
    }

    pub fn execute(&self, sim: &mut dyn Simulation) -> bool {
        let target = sim.resolve_unit(self.target);
        let cast = sim.cast(self.spell.key, target);
        if !cast {
            tracing::debug!("Cast of {} failed at {}", self.spell, sim.current_time());
        }
        cast
    }
}

/// Cast of a channeled spell that also arms the interrupt policy
#[derive(Debug)]
pub struct ChannelSpell {
    pub cast: CastSpell,
    /// Interrupt the channel once this turns true
    pub interrupt_if: Option<Value>,
    /// Whether the same spell may cut its own channel short
    pub allow_recast: bool,
}

/// Pause decisions for a computed duration
#[derive(Debug)]
pub struct Wait {
    pub duration: Value,
    /// End of the wait currently in progress
    pub until: SimDuration,
}

impl Wait {
    pub fn new(duration: Value) -> Self {
        Self {
            duration,
            until: SimDuration::ZERO,
        }
    }

    pub fn is_ready(&self, sim: &dyn Simulation) -> bool {
        self.duration.get_duration(sim) > SimDuration::ZERO
    }

    /// Start waiting; returns the time the wait ends
    pub fn begin(&mut self, sim: &mut dyn Simulation) -> SimDuration {
        self.until = sim.current_time() + self.duration.get_duration(sim);
        sim.hold_rotation_until(self.until);
        self.until
    }

    pub fn elapsed(&self, sim: &dyn Simulation) -> bool {
        sim.current_time() >= self.until
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ItemSwap {
    pub set: ItemSet,
}

impl ItemSwap {
    pub fn is_ready(&self, sim: &dyn Simulation) -> bool {
        sim.item_swap_enabled() && sim.item_set() != self.set
    }

    pub fn execute(&self, sim: &mut dyn Simulation) -> bool {
        sim.swap_items(self.set);
        true
    }
}
