//! Built-in leaf values reading live simulation state

use std::fmt;

use super::kind::ValueType;
use crate::core::types::{ActionId, SimDuration, UnitRef};
use crate::sim::{AuraState, Simulation, SpellRef};

/// A query against the owning unit, evaluated on every read
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    CurrentTime,
    RemainingTime,
    IsMoving,
    GcdIsReady,
    SpellIsReady(SpellRef),
    SpellCanCast(SpellRef),
    SpellTimeToReady(SpellRef),
    AuraIsActive { unit: UnitRef, aura: ActionId },
    AuraRemainingTime { unit: UnitRef, aura: ActionId },
    DotIsActive { unit: UnitRef, spell: SpellRef },
    DotRemainingTime { unit: UnitRef, spell: SpellRef },
    HealthPercent(UnitRef),
    ChannelTicksRemaining,
}

impl Query {
    pub fn value_type(&self) -> ValueType {
        match self {
            Query::IsMoving
            | Query::GcdIsReady
            | Query::SpellIsReady(_)
            | Query::SpellCanCast(_)
            | Query::AuraIsActive { .. }
            | Query::DotIsActive { .. } => ValueType::Bool,
            Query::CurrentTime
            | Query::RemainingTime
            | Query::SpellTimeToReady(_)
            | Query::AuraRemainingTime { .. }
            | Query::DotRemainingTime { .. } => ValueType::Duration,
            Query::HealthPercent(_) => ValueType::Float,
            Query::ChannelTicksRemaining => ValueType::Int,
        }
    }

    fn aura(&self, sim: &dyn Simulation) -> Option<AuraState> {
        match self {
            Query::AuraIsActive { unit, aura } | Query::AuraRemainingTime { unit, aura } => {
                sim.aura(sim.resolve_unit(*unit)?, aura)
            }
            Query::DotIsActive { unit, spell } | Query::DotRemainingTime { unit, spell } => {
                sim.dot(sim.resolve_unit(*unit)?, spell.key)
            }
            _ => None,
        }
    }

    pub fn get_bool(&self, sim: &dyn Simulation) -> bool {
        match self {
            Query::IsMoving => sim.is_moving(),
            Query::GcdIsReady => sim.gcd_ready(),
            Query::SpellIsReady(spell) => sim.spell_is_ready(spell.key),
            Query::SpellCanCast(spell) => {
                let target = sim.resolve_unit(UnitRef::CurrentTarget);
                sim.can_cast(spell.key, target)
            }
            Query::AuraIsActive { .. } | Query::DotIsActive { .. } => {
                self.aura(sim).is_some_and(|state| state.active)
            }
            _ => false,
        }
    }

    pub fn get_int(&self, sim: &dyn Simulation) -> i32 {
        match self {
            Query::ChannelTicksRemaining => sim
                .channel()
                .map(|channel| channel.remaining_ticks as i32)
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub fn get_float(&self, sim: &dyn Simulation) -> f64 {
        match self {
            Query::HealthPercent(unit) => sim
                .resolve_unit(*unit)
                .map(|unit| sim.health_percent(unit))
                .unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn get_duration(&self, sim: &dyn Simulation) -> SimDuration {
        match self {
            Query::CurrentTime => sim.current_time(),
            Query::RemainingTime => sim.remaining_time(),
            Query::SpellTimeToReady(spell) => sim.spell_time_to_ready(spell.key),
            Query::AuraRemainingTime { .. } | Query::DotRemainingTime { .. } => self
                .aura(sim)
                .filter(|state| state.active)
                .map(|state| state.remaining)
                .unwrap_or(SimDuration::ZERO),
            _ => SimDuration::ZERO,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::CurrentTime => write!(f, "Current Time"),
            Query::RemainingTime => write!(f, "Remaining Time"),
            Query::IsMoving => write!(f, "Is Moving"),
            Query::GcdIsReady => write!(f, "GCD Is Ready"),
            Query::SpellIsReady(spell) => write!(f, "Spell Is Ready({spell})"),
            Query::SpellCanCast(spell) => write!(f, "Spell Can Cast({spell})"),
            Query::SpellTimeToReady(spell) => write!(f, "Spell Time To Ready({spell})"),
            Query::AuraIsActive { aura, .. } => write!(f, "Aura Active({aura})"),
            Query::AuraRemainingTime { aura, .. } => write!(f, "Aura Remaining Time({aura})"),
            Query::DotIsActive { spell, .. } => write!(f, "Dot Is Active({spell})"),
            Query::DotRemainingTime { spell, .. } => write!(f, "Dot Remaining Time({spell})"),
            Query::HealthPercent(unit) => write!(f, "Health Percent({unit:?})"),
            Query::ChannelTicksRemaining => write!(f, "Channel Ticks Remaining"),
        }
    }
}
