//! Timed actions run before the pull

use super::Rotation;
use crate::action::{ActionKey, ExecContext};
use crate::core::error::Result;
use crate::core::types::{ItemSet, SimDuration};
use crate::sim::{Simulation, SpellRef};
use crate::validation::{LogLevel, Phase, Validation};

/// One callback the scheduler runs at a fixed offset before the pull
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepullStep {
    /// Offset from the pull; always negative
    pub do_at: SimDuration,
    pub kind: PrepullStepKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepullStepKind {
    /// An authored prepull entry
    Action { entry: usize, action: ActionKey },
    /// Swap back to the main set after authored prepull swaps
    RestoreMainLoadout,
    /// Pre-combat potion the author never cast explicitly
    PrecombatConsumable(SpellRef),
}

impl Rotation {
    /// Every step to schedule, authored ones first, implicit ones after
    pub fn prepull_steps(&self) -> &[PrepullStep] {
        &self.prepull_steps
    }

    /// Accepted authored prepull actions with their do-at offsets
    pub fn prepull_schedule(&self) -> Vec<(SimDuration, ActionKey)> {
        self.prepull_steps
            .iter()
            .filter_map(|step| match step.kind {
                PrepullStepKind::Action { action, .. } => Some((step.do_at, action)),
                _ => None,
            })
            .collect()
    }

    /// Run one prepull step; the scheduler calls this at `do_at`
    pub fn run_prepull_step(&mut self, index: usize, sim: &mut dyn Simulation) -> Result<()> {
        self.ensure_running()?;
        let Some(step) = self.prepull_steps.get(index).copied() else {
            return Ok(());
        };
        self.perform_step(step, sim)?;
        Ok(())
    }

    /// Returns whether the step's effect was carried out
    fn perform_step(&mut self, step: PrepullStep, sim: &mut dyn Simulation) -> Result<bool> {
        match step.kind {
            PrepullStepKind::Action { action, .. } => {
                let mut ctx = ExecContext {
                    sim: &mut *sim,
                    controlling: &mut self.controlling,
                    channel: &mut self.channel,
                };
                match self.arena.execute(action, &mut ctx) {
                    Ok(performed) => Ok(performed),
                    Err(e) => Err(self.halt(e)),
                }
            }
            PrepullStepKind::RestoreMainLoadout => {
                tracing::debug!("Restoring main loadout at {}", step.do_at);
                sim.swap_items(ItemSet::Main);
                Ok(true)
            }
            PrepullStepKind::PrecombatConsumable(spell) => {
                tracing::debug!("Using pre-combat consumable {} at {}", spell, step.do_at);
                Ok(sim.cast(spell.key, None))
            }
        }
    }

    /// Dry-run every step in do-at order against a scratch unit
    ///
    /// Authored steps that fail are recorded as warnings on their entry.
    /// The rotation is reset afterwards, so the live run starts clean.
    pub fn preview_prepull(&mut self, sim: &mut dyn Simulation) -> Result<()> {
        self.ensure_running()?;
        let mut steps = self.prepull_steps.clone();
        steps.sort_by_key(|step| step.do_at);

        for step in steps {
            let performed = self.perform_step(step, sim)?;
            if let PrepullStepKind::Action { entry, action } = step.kind {
                if !performed {
                    let message = format!(
                        "{} could not be performed at {}",
                        self.arena.describe_action(action),
                        step.do_at
                    );
                    tracing::warn!("{}", message);
                    self.prepull_validations[entry].record(
                        Phase::PostFinalize,
                        vec![Validation::new(LogLevel::Warning, message)],
                    );
                }
            }
        }

        self.reset(sim);
        Ok(())
    }
}
