//! One-time passes that adjust the unit around the authored rotation

use super::prepull::{PrepullStep, PrepullStepKind};
use super::Rotation;
use crate::action::{ActionKey, ActionKind};
use crate::core::types::{ActionId, ItemSet, OtherAction};
use crate::sim::{Simulation, SpellFlags, SpellKey, SpellRef};
use crate::value::build::find_spell;

impl Rotation {
    pub(super) fn apply_shaping(&mut self, sim: &mut dyn Simulation) {
        self.remove_referenced_cooldowns(sim);
        self.inject_loadout_restore(sim);
        self.inject_precombat_consumable(sim);
    }

    /// Spells cast by the given actions
    fn cast_spells(&self, actions: &[ActionKey]) -> Vec<SpellRef> {
        actions
            .iter()
            .filter_map(|&key| match &self.arena.get(key).kind {
                ActionKind::CastSpell(cast) => Some(cast.spell),
                ActionKind::ChannelSpell(channel) => Some(channel.cast.spell),
                _ => None,
            })
            .collect()
    }

    /// Explicitly referenced spells are no longer managed by the generic
    /// cooldown autocaster
    fn remove_referenced_cooldowns(&mut self, sim: &mut dyn Simulation) {
        let mut removed: Vec<SpellKey> = Vec::new();
        for spell in self.cast_spells(&self.all_actions()) {
            if !removed.contains(&spell.key) {
                tracing::debug!("Removing {} from auto cooldowns", spell);
                sim.remove_auto_cooldown(spell.key);
                removed.push(spell.key);
            }
        }
    }

    /// Swap back to the main set before the pull when the last prepull swap
    /// left another set equipped
    fn inject_loadout_restore(&mut self, sim: &dyn Simulation) {
        if !sim.item_swap_enabled() {
            return;
        }

        let last_swap = self
            .all_prepull_actions()
            .into_iter()
            .filter_map(|key| match &self.arena.get(key).kind {
                ActionKind::ItemSwap(swap) => Some(swap.set),
                _ => None,
            })
            .last();

        if matches!(last_swap, Some(set) if set != ItemSet::Main) {
            let do_at = self.config.implicit_loadout_offset;
            tracing::debug!("Injecting main loadout restore at {}", do_at);
            self.prepull_steps.push(PrepullStep {
                do_at,
                kind: PrepullStepKind::RestoreMainLoadout,
            });
        }
    }

    /// Use the unit's pre-combat potion when no prepull action casts a potion
    fn inject_precombat_consumable(&mut self, sim: &dyn Simulation) {
        // A unit without a pre-combat potion is not an authoring problem
        let Some(potion) = find_spell(sim, &ActionId::Other(OtherAction::Potion), true) else {
            return;
        };

        let used = self.cast_spells(&self.all_prepull_actions()).iter().any(|spell| {
            spell.key == potion.key
                || sim
                    .spell_info(spell.key)
                    .is_some_and(|info| info.flags.contains(SpellFlags::POTION))
        });
        if !used {
            let do_at = self.config.implicit_consumable_offset;
            tracing::debug!("Injecting pre-combat consumable {} at {}", potion, do_at);
            self.prepull_steps.push(PrepullStep {
                do_at,
                kind: PrepullStepKind::PrecombatConsumable(potion),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SimDuration;
    use crate::rules::schema::{ActionConfig, ActionKindConfig, ListItem, RotationConfig};
    use crate::sim::{SandboxSpell, SandboxUnit};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    #[test]
    fn test_referenced_cooldown_removed() {
        let mut sim = SandboxUnit::new(vec![
            SandboxSpell::instant(1, "Strike"),
            SandboxSpell::instant(2, "Avatar").major_cooldown().off_gcd(),
            SandboxSpell::instant(3, "Recklessness").major_cooldown().off_gcd(),
        ]);
        let config = RotationConfig {
            priority_list: vec![ListItem {
                action: ActionConfig::new(ActionKindConfig::CastSpell {
                    spell_id: ActionId::spell(2),
                    target: None,
                }),
                hide: false,
            }],
            ..Default::default()
        };
        let _rotation = Rotation::new(&config, &mut sim);
        let remaining: Vec<_> = sim.auto_cooldowns().to_vec();
        assert_eq!(remaining, vec![sim.key_of(ActionId::spell(3)).unwrap()]);
    }

    #[test]
    fn test_unused_potion_is_injected() {
        let mut sim = SandboxUnit::new(vec![
            SandboxSpell::instant(1, "Strike"),
            SandboxSpell::instant(2, "Flask").prepull_potion().off_gcd(),
        ]);
        let rotation = Rotation::new(&RotationConfig::default(), &mut sim);
        let steps = rotation.prepull_steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].do_at, SimDuration::from_secs(-1));
        assert!(matches!(steps[0].kind, PrepullStepKind::PrecombatConsumable(_)));
    }

    /// Counts warnings emitted while it is the active subscriber
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_missing_potion_is_silent() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));

        let mut sim = SandboxUnit::new(vec![SandboxSpell::instant(1, "Strike")]);
        let rotation = tracing::subscriber::with_default(subscriber, || {
            Rotation::new(&RotationConfig::default(), &mut sim)
        });

        assert!(rotation.prepull_steps().is_empty());
        assert_eq!(warnings.load(Ordering::SeqCst), 0);
    }
}
