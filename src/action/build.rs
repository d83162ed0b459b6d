//! Construction of action nodes from configuration

use uuid::Uuid;

use super::arena::ActionArena;
use super::group::GroupReference;
use super::sequence::{ResetSequence, Sequence, StrictSequence};
use super::spell::{CastSpell, ChannelSpell, ItemSwap, Wait};
use super::{ActionKey, ActionKind, ActionNode, Condition};
use crate::core::types::UnitRef;
use crate::rules::schema::{ActionConfig, ActionKindConfig};
use crate::sim::SpellFlags;
use crate::validation::LogLevel;
use crate::value::{BuildContext, ValueType};

impl ActionArena {
    /// Build `config` and its sub-actions into the arena
    ///
    /// Returns `None` with a recorded diagnostic when the action cannot be
    /// used. A condition that fails to build keeps the action but makes it
    /// permanently not ready.
    pub fn build(&mut self, config: &ActionConfig, ctx: &mut BuildContext<'_>) -> Option<ActionKey> {
        let uuid = config.uuid;
        let kind = self.build_kind(&config.kind, uuid, ctx)?;

        let condition = match &config.condition {
            None => Condition::Always,
            Some(condition) => {
                let value = ctx.build_value(condition);
                match ctx.coerce(value, ValueType::Bool, condition.uuid) {
                    Some(value) => Condition::When(value),
                    None => Condition::Never,
                }
            }
        };

        Some(self.push(ActionNode { condition, kind }))
    }

    fn build_kind(
        &mut self,
        config: &ActionKindConfig,
        uuid: Option<Uuid>,
        ctx: &mut BuildContext<'_>,
    ) -> Option<ActionKind> {
        let kind = match config {
            ActionKindConfig::CastSpell { spell_id, target } => {
                let spell = ctx.lookup_spell(spell_id)?;
                let target = ctx.unit_ref(*target, UnitRef::CurrentTarget);
                ActionKind::CastSpell(CastSpell { spell, target })
            }
            ActionKindConfig::ChannelSpell {
                spell_id,
                target,
                interrupt_if,
                allow_recast,
            } => {
                let spell = ctx.lookup_spell(spell_id)?;
                let channeled = ctx
                    .sim
                    .spell_info(spell.key)
                    .is_some_and(|info| info.flags.contains(SpellFlags::CHANNELED));
                if !channeled {
                    warn(ctx, uuid, format!("Spell {spell_id} is not channeled"));
                    return None;
                }
                let target = ctx.unit_ref(*target, UnitRef::CurrentTarget);
                let interrupt_if = interrupt_if.as_ref().and_then(|condition| {
                    let value = ctx.build_value(condition);
                    ctx.coerce(value, ValueType::Bool, condition.uuid)
                });
                ActionKind::ChannelSpell(ChannelSpell {
                    cast: CastSpell { spell, target },
                    interrupt_if,
                    allow_recast: *allow_recast,
                })
            }
            ActionKindConfig::Wait { duration } => {
                let value = ctx.build_value(duration);
                let duration = ctx.coerce(value, ValueType::Duration, duration.uuid)?;
                ActionKind::Wait(Wait::new(duration))
            }
            ActionKindConfig::Sequence { name, actions } => {
                let actions = self.build_all(actions, ctx);
                ActionKind::Sequence(Sequence::new(name.clone(), actions))
            }
            ActionKindConfig::ResetSequence { sequence_name } => {
                if sequence_name.is_empty() {
                    warn(ctx, uuid, "Reset Sequence must provide a sequence name");
                    return None;
                }
                ActionKind::ResetSequence(ResetSequence {
                    sequence_name: sequence_name.clone(),
                    sequence: None,
                })
            }
            ActionKindConfig::StrictSequence { actions } => {
                let actions = self.build_all(actions, ctx);
                if actions.is_empty() {
                    warn(ctx, uuid, "Strict Sequence must have at least one valid action");
                    return None;
                }
                ActionKind::StrictSequence(StrictSequence::new(actions))
            }
            ActionKindConfig::GroupReference {
                group_name,
                variable_overrides,
            } => {
                if !variable_overrides.is_empty() {
                    warn(
                        ctx,
                        uuid,
                        format!("Variable overrides not yet implemented for group '{group_name}'"),
                    );
                }
                ActionKind::GroupReference(GroupReference::new(
                    group_name.clone(),
                    variable_overrides.clone(),
                ))
            }
            ActionKindConfig::ItemSwap { swap_set } => {
                if !ctx.sim.item_swap_enabled() {
                    warn(ctx, uuid, "No swap set configured in Settings.");
                    return None;
                }
                ActionKind::ItemSwap(ItemSwap { set: *swap_set })
            }
            ActionKindConfig::Custom { kind, params } => {
                let extensions = ctx.extensions;
                let Some(factory) = extensions.action_factory(kind) else {
                    warn(ctx, uuid, format!("Unknown action kind '{kind}'"));
                    return None;
                };
                ActionKind::Custom(factory(params, ctx)?)
            }
        };
        Some(kind)
    }

    fn build_all(&mut self, configs: &[ActionConfig], ctx: &mut BuildContext<'_>) -> Vec<ActionKey> {
        configs
            .iter()
            .filter_map(|config| self.build(config, ctx))
            .collect()
    }
}

fn warn(ctx: &mut BuildContext<'_>, uuid: Option<Uuid>, message: impl Into<String>) {
    ctx.sink.message_by_uuid(uuid, LogLevel::Warning, message);
}
