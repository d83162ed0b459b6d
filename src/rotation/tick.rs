//! The decision tick and channel interruption policy

use super::Rotation;
use crate::action::{ActionKey, ActionKind, ControlStep, ExecContext};
use crate::core::error::{AplError, Result};
use crate::core::types::SimDuration;
use crate::sim::{Simulation, SpellFlags};

impl Rotation {
    /// Decide and execute until nothing is ready, then ask to be woken
    ///
    /// Returns the number of actions executed. Does nothing before the pull,
    /// while a channel blocks casting, or while the decision gate is closed.
    /// An engine invariant failure halts the rotation for good.
    ///
    /// Taking `&mut self` is the re-entrancy guard: a call from inside a
    /// running tick cannot borrow the rotation, and a rotation shared
    /// through a `RefCell` must be skipped with `try_borrow_mut` rather
    /// than borrowed again.
    pub fn do_next_action(&mut self, sim: &mut dyn Simulation) -> Result<usize> {
        self.ensure_running()?;

        if sim.current_time() < SimDuration::ZERO {
            return Ok(0);
        }
        let cast_while_channeling = sim
            .spellbook()
            .iter()
            .any(|spell| spell.flags.contains(SpellFlags::CAST_WHILE_CHANNELING));
        if sim.channel().is_some() && !cast_while_channeling {
            return Ok(0);
        }
        if !sim.rotation_ready() {
            return Ok(0);
        }

        let executed = match self.run_loop(sim) {
            Ok(executed) => executed,
            Err(e) => return Err(self.halt(e)),
        };
        if executed == 0 {
            tracing::trace!("No available actions!");
        }

        if sim.rotation_ready() {
            let now = sim.current_time();
            let mut next = now + self.reaction_time(sim);
            if !sim.is_moving() {
                next = next.max(sim.next_gcd_at());
            }
            sim.wait_until(next);
        }

        Ok(executed)
    }

    fn run_loop(&mut self, sim: &mut dyn Simulation) -> Result<usize> {
        let limit = self.config.max_actions_per_tick;
        let mut executed = 0;

        while let Some(action) = self.next_action(sim)? {
            if executed > limit {
                return Err(AplError::ActionLoopLimit {
                    limit,
                    action: self.arena.describe(action),
                });
            }

            let mut ctx = ExecContext {
                sim: &mut *sim,
                controlling: &mut self.controlling,
                channel: &mut self.channel,
            };
            self.arena.execute(action, &mut ctx)?;
            executed += 1;
        }

        Ok(executed)
    }

    fn reaction_time(&self, sim: &dyn Simulation) -> SimDuration {
        let reaction = sim.reaction_time();
        if reaction > SimDuration::ZERO {
            reaction
        } else {
            self.config.default_reaction_time
        }
    }

    /// The action to run next, handing the choice to the controlling
    /// action on top of the stack when there is one
    fn next_action(&mut self, sim: &dyn Simulation) -> Result<Option<ActionKey>> {
        while let Some(top) = self.controlling.top() {
            match self.arena.control_step(top, &mut self.controlling, sim)? {
                ControlStep::Run(action) => return Ok(Some(action)),
                ControlStep::Hold => return Ok(None),
                ControlStep::Released => {}
            }
        }
        Ok(self.scan_priority_list(sim))
    }

    /// What `next_action` would return, without changing any state
    pub fn peek_next_action(&self, sim: &dyn Simulation) -> Option<ActionKey> {
        for controller in self.controlling.iter() {
            match self.arena.peek_control(controller, sim) {
                ControlStep::Run(action) => return Some(action),
                ControlStep::Hold => return None,
                ControlStep::Released => {}
            }
        }
        self.scan_priority_list(sim)
    }

    /// First ready entry; list order breaks ties
    fn scan_priority_list(&self, sim: &dyn Simulation) -> Option<ActionKey> {
        self.priority_list
            .iter()
            .map(|&(_, key)| key)
            .find(|&key| self.arena.is_ready(key, sim))
    }

    /// Whether the active channel should be cut short now
    ///
    /// Called by the scheduler after each channel tick. The channel keeps
    /// going when its ticks are spent, when no interrupt condition was armed
    /// or it is false, when nothing else is ready, or when the next action
    /// would channel the same spell and recasting is not allowed.
    pub fn should_interrupt_channel(&self, sim: &dyn Simulation) -> Result<bool> {
        self.ensure_running()?;

        let Some(channel) = sim.channel() else {
            return Ok(false);
        };
        if channel.remaining_ticks == 0 {
            return Ok(false);
        }

        let interrupt_if = self.channel.interrupt_if.and_then(|key| match &self.arena.get(key).kind {
            ActionKind::ChannelSpell(spell) => spell.interrupt_if.as_ref(),
            _ => None,
        });
        if !interrupt_if.is_some_and(|condition| condition.get_bool(sim)) {
            return Ok(false);
        }

        let Some(next) = self.peek_next_action(sim) else {
            return Ok(false);
        };
        if let ActionKind::ChannelSpell(next_channel) = &self.arena.get(next).kind {
            if next_channel.cast.spell.key == channel.spell {
                return Ok(self.channel.allow_recast);
            }
        }
        Ok(true)
    }
}
