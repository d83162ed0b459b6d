//! Deterministic in-memory unit for driving rotations
//!
//! `SandboxUnit` models just enough of a combat unit (clock, GCD, cooldowns,
//! channels, auras, damage-over-time effects, loadout) to exercise every
//! branch of the decision engine. It also owns a tiny event loop,
//! [`SandboxUnit::run_encounter`], standing in for the discrete-event
//! scheduler of a full simulation.

use ahash::AHashMap;
use serde::Deserialize;

use super::{AuraState, ChannelState, Simulation, SpellFlags, SpellInfo, SpellKey};
use crate::core::error::Result;
use crate::core::types::{ActionId, ItemSet, SimDuration, UnitIndex, UnitRef};
use crate::rotation::Rotation;

const PLAYER: UnitIndex = UnitIndex(0);
const GCD_DEFAULT: SimDuration = SimDuration::from_millis(1500);

/// Spell definition as written in a sandbox spellbook file
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxSpell {
    pub action_id: ActionId,
    pub label: String,
    /// Cooldown in milliseconds
    #[serde(default)]
    pub cooldown_ms: i64,
    /// Whether casting triggers the global cooldown
    #[serde(default = "default_on_gcd")]
    pub on_gcd: bool,
    /// Number of channel ticks; zero for instant spells
    #[serde(default)]
    pub channel_ticks: u32,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: i64,
    /// Length of the damage-over-time effect left on the target
    #[serde(default)]
    pub dot_ms: i64,
    /// Length of the self-buff applied by the cast
    #[serde(default)]
    pub aura_ms: i64,
    #[serde(default)]
    pub apl: bool,
    #[serde(default)]
    pub potion: bool,
    #[serde(default)]
    pub prepull_potion: bool,
    #[serde(default)]
    pub combat_potion: bool,
    #[serde(default)]
    pub cast_while_channeling: bool,
    #[serde(default)]
    pub major_cooldown: bool,
}

fn default_on_gcd() -> bool {
    true
}

fn default_tick_interval() -> i64 {
    1000
}

impl SandboxSpell {
    /// An instant, on-GCD spell with no cooldown
    pub fn instant(id: i32, label: &str) -> Self {
        Self {
            action_id: ActionId::spell(id),
            label: label.to_string(),
            cooldown_ms: 0,
            on_gcd: true,
            channel_ticks: 0,
            tick_interval_ms: default_tick_interval(),
            dot_ms: 0,
            aura_ms: 0,
            apl: false,
            potion: false,
            prepull_potion: false,
            combat_potion: false,
            cast_while_channeling: false,
            major_cooldown: false,
        }
    }

    pub fn with_cooldown_ms(mut self, cooldown_ms: i64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    pub fn off_gcd(mut self) -> Self {
        self.on_gcd = false;
        self
    }

    pub fn channeled(mut self, ticks: u32, tick_interval_ms: i64) -> Self {
        self.channel_ticks = ticks;
        self.tick_interval_ms = tick_interval_ms;
        self
    }

    pub fn with_dot_ms(mut self, dot_ms: i64) -> Self {
        self.dot_ms = dot_ms;
        self
    }

    pub fn with_aura_ms(mut self, aura_ms: i64) -> Self {
        self.aura_ms = aura_ms;
        self
    }

    pub fn prepull_potion(mut self) -> Self {
        self.potion = true;
        self.prepull_potion = true;
        self
    }

    pub fn major_cooldown(mut self) -> Self {
        self.major_cooldown = true;
        self
    }

    pub fn cast_while_channeling(mut self) -> Self {
        self.cast_while_channeling = true;
        self
    }

    fn flags(&self) -> SpellFlags {
        let mut flags = SpellFlags::empty();
        flags.set(SpellFlags::APL, self.apl);
        flags.set(SpellFlags::CHANNELED, self.channel_ticks > 0);
        flags.set(SpellFlags::POTION, self.potion);
        flags.set(SpellFlags::PREPULL_POTION, self.prepull_potion);
        flags.set(SpellFlags::COMBAT_POTION, self.combat_potion);
        flags.set(SpellFlags::CAST_WHILE_CHANNELING, self.cast_while_channeling);
        flags.set(SpellFlags::MAJOR_COOLDOWN, self.major_cooldown);
        flags
    }
}

/// Top-level layout of a sandbox spellbook file
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    pub spells: Vec<SandboxSpell>,
    #[serde(default = "default_targets")]
    pub targets: u32,
    #[serde(default = "default_fight_length")]
    pub fight_length_secs: f64,
    #[serde(default = "default_reaction_ms")]
    pub reaction_ms: i64,
    #[serde(default)]
    pub item_swap: bool,
}

fn default_targets() -> u32 {
    1
}

fn default_fight_length() -> f64 {
    180.0
}

fn default_reaction_ms() -> i64 {
    100
}

/// One successful cast, as recorded by the sandbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastRecord {
    pub at: SimDuration,
    pub spell: SpellKey,
    pub target: Option<UnitIndex>,
}

#[derive(Debug, Clone)]
struct ActiveChannel {
    spell: SpellKey,
    remaining_ticks: u32,
    next_tick_at: SimDuration,
    interval: SimDuration,
}

/// In-memory unit implementing [`Simulation`]
#[derive(Debug, Clone)]
pub struct SandboxUnit {
    now: SimDuration,
    fight_length: SimDuration,
    reaction_time: SimDuration,
    moving: bool,
    gcd_ready_at: SimDuration,
    rotation_ready_at: SimDuration,
    pending_wake: Option<SimDuration>,
    spells: Vec<SandboxSpell>,
    infos: Vec<SpellInfo>,
    cooldown_ready_at: Vec<SimDuration>,
    auto_cooldowns: Vec<SpellKey>,
    channel: Option<ActiveChannel>,
    targets: u32,
    current_target: u32,
    health: Vec<f64>,
    auras: AHashMap<(UnitIndex, ActionId), SimDuration>,
    dots: AHashMap<(UnitIndex, SpellKey), SimDuration>,
    item_swap_enabled: bool,
    current_set: ItemSet,
    swaps: Vec<ItemSet>,
    casts: Vec<CastRecord>,
    failed_casts: usize,
}

impl SandboxUnit {
    pub fn new(spells: Vec<SandboxSpell>) -> Self {
        let infos: Vec<SpellInfo> = spells
            .iter()
            .enumerate()
            .map(|(i, spell)| SpellInfo {
                key: SpellKey(i as u32),
                action_id: spell.action_id,
                label: spell.label.clone(),
                flags: spell.flags(),
            })
            .collect();
        let auto_cooldowns = infos
            .iter()
            .filter(|info| info.flags.contains(SpellFlags::MAJOR_COOLDOWN))
            .map(|info| info.key)
            .collect();
        let spell_count = spells.len();

        Self {
            now: SimDuration::ZERO,
            fight_length: SimDuration::from_secs(180),
            reaction_time: SimDuration::from_millis(100),
            moving: false,
            gcd_ready_at: -SimDuration::NEVER,
            rotation_ready_at: -SimDuration::NEVER,
            pending_wake: None,
            spells,
            infos,
            cooldown_ready_at: vec![-SimDuration::NEVER; spell_count],
            auto_cooldowns,
            channel: None,
            targets: 1,
            current_target: 1,
            health: vec![1.0; 2],
            auras: AHashMap::new(),
            dots: AHashMap::new(),
            item_swap_enabled: false,
            current_set: ItemSet::Main,
            swaps: Vec::new(),
            casts: Vec::new(),
            failed_casts: 0,
        }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(config.spells.clone())
            .with_targets(config.targets)
            .with_fight_length(SimDuration::from_secs_f64(config.fight_length_secs))
            .with_reaction_time(SimDuration::from_millis(config.reaction_ms))
            .with_item_swap(config.item_swap)
    }

    pub fn with_targets(mut self, targets: u32) -> Self {
        self.targets = targets.max(1);
        self.health = vec![1.0; self.targets as usize + 1];
        self
    }

    pub fn with_fight_length(mut self, fight_length: SimDuration) -> Self {
        self.fight_length = fight_length;
        self
    }

    pub fn with_reaction_time(mut self, reaction_time: SimDuration) -> Self {
        self.reaction_time = reaction_time;
        self
    }

    pub fn with_item_swap(mut self, enabled: bool) -> Self {
        self.item_swap_enabled = enabled;
        self
    }

    // === TEST CONTROLS ===

    pub fn set_time(&mut self, time: SimDuration) {
        self.now = time;
    }

    pub fn set_moving(&mut self, moving: bool) {
        self.moving = moving;
    }

    pub fn set_health(&mut self, unit: UnitIndex, percent: f64) {
        if let Some(slot) = self.health.get_mut(unit.0 as usize) {
            *slot = percent;
        }
    }

    pub fn set_aura(&mut self, unit: UnitIndex, aura: ActionId, remaining: SimDuration) {
        self.auras.insert((unit, aura), self.now + remaining);
    }

    /// Put the unit into a channel of `spell` with `remaining_ticks` left
    pub fn set_channel(&mut self, spell: SpellKey, remaining_ticks: u32) {
        let interval = SimDuration::from_millis(self.spell(spell).tick_interval_ms);
        self.channel = Some(ActiveChannel {
            spell,
            remaining_ticks,
            next_tick_at: self.now + interval,
            interval,
        });
    }

    pub fn cancel_channel(&mut self) {
        self.channel = None;
    }

    pub fn change_target(&mut self, target: u32) {
        if target >= 1 && target <= self.targets {
            self.current_target = target;
        }
    }

    // === OBSERVATION ===

    pub fn now(&self) -> SimDuration {
        self.now
    }

    pub fn fight_length(&self) -> SimDuration {
        self.fight_length
    }

    pub fn casts(&self) -> &[CastRecord] {
        &self.casts
    }

    pub fn cast_count(&self, spell: SpellKey) -> usize {
        self.casts.iter().filter(|cast| cast.spell == spell).count()
    }

    pub fn failed_casts(&self) -> usize {
        self.failed_casts
    }

    pub fn auto_cooldowns(&self) -> &[SpellKey] {
        &self.auto_cooldowns
    }

    pub fn current_set(&self) -> ItemSet {
        self.current_set
    }

    pub fn swaps(&self) -> &[ItemSet] {
        &self.swaps
    }

    pub fn pending_wake(&self) -> Option<SimDuration> {
        self.pending_wake
    }

    pub fn spell_label(&self, spell: SpellKey) -> Option<&str> {
        self.infos.get(spell.0 as usize).map(|info| info.label.as_str())
    }

    /// Key of the first spell with the given action id
    pub fn key_of(&self, action_id: ActionId) -> Option<SpellKey> {
        self.infos
            .iter()
            .find(|info| info.action_id.same_action(&action_id))
            .map(|info| info.key)
    }

    fn spell(&self, key: SpellKey) -> &SandboxSpell {
        &self.spells[key.0 as usize]
    }

    /// Move the clock forward, landing channel ticks on the way
    ///
    /// Returns true when at least one channel tick landed.
    pub fn advance_to(&mut self, time: SimDuration) -> bool {
        let mut ticked = false;
        while let Some(channel) = self.channel.as_mut() {
            if channel.next_tick_at > time {
                break;
            }
            channel.remaining_ticks = channel.remaining_ticks.saturating_sub(1);
            channel.next_tick_at += channel.interval;
            ticked = true;
            if channel.remaining_ticks == 0 {
                self.channel = None;
            }
        }
        if time > self.now {
            self.now = time;
        }
        ticked
    }

    fn next_event_time(&mut self) -> SimDuration {
        let now = self.now;
        let mut candidates = vec![self.rotation_ready_at, self.gcd_ready_at];
        candidates.extend(self.pending_wake.take());
        if let Some(channel) = &self.channel {
            candidates.push(channel.next_tick_at);
        }

        let fallback = now + self.reaction_time.max(SimDuration::MILLISECOND);
        candidates
            .into_iter()
            .filter(|at| *at > now)
            .min()
            .unwrap_or(fallback)
            .min(self.fight_length)
            .max(now + SimDuration::NANOSECOND)
    }

    /// Drive `rotation` through prepull and one full encounter
    ///
    /// Stands in for the discrete-event scheduler: prepull steps run at their
    /// do-at offsets, then the decision tick is invoked whenever the unit
    /// asked to be woken, a gate opened, or a channel ticked.
    pub fn run_encounter(&mut self, rotation: &mut Rotation) -> Result<()> {
        rotation.reset(self);

        let mut steps: Vec<(usize, SimDuration)> = rotation
            .prepull_steps()
            .iter()
            .enumerate()
            .map(|(i, step)| (i, step.do_at))
            .collect();
        steps.sort_by_key(|(_, do_at)| *do_at);

        for (index, do_at) in steps {
            self.advance_to(do_at);
            self.now = do_at;
            rotation.run_prepull_step(index, self)?;
        }
        self.advance_to(SimDuration::ZERO);
        self.now = SimDuration::ZERO;

        loop {
            rotation.do_next_action(self)?;
            if self.now >= self.fight_length {
                break;
            }

            let next = self.next_event_time();
            let ticked = self.advance_to(next);
            if ticked && self.channel.is_some() && rotation.should_interrupt_channel(self)? {
                tracing::trace!("Interrupting channel at {}", self.now);
                self.channel = None;
            }
        }

        Ok(())
    }
}

impl Simulation for SandboxUnit {
    fn current_time(&self) -> SimDuration {
        self.now
    }

    fn remaining_time(&self) -> SimDuration {
        (self.fight_length - self.now).max(SimDuration::ZERO)
    }

    fn reaction_time(&self) -> SimDuration {
        self.reaction_time
    }

    fn is_moving(&self) -> bool {
        self.moving
    }

    fn rotation_ready(&self) -> bool {
        self.now >= self.rotation_ready_at
    }

    fn gcd_ready(&self) -> bool {
        self.now >= self.gcd_ready_at
    }

    fn next_gcd_at(&self) -> SimDuration {
        self.gcd_ready_at
    }

    fn wait_until(&mut self, at: SimDuration) {
        self.pending_wake = Some(at);
    }

    fn hold_rotation_until(&mut self, at: SimDuration) {
        self.rotation_ready_at = at;
        self.pending_wake = Some(at);
    }

    fn spellbook(&self) -> &[SpellInfo] {
        &self.infos
    }

    fn spell_is_ready(&self, spell: SpellKey) -> bool {
        self.cooldown_ready_at
            .get(spell.0 as usize)
            .is_some_and(|ready_at| self.now >= *ready_at)
    }

    fn spell_time_to_ready(&self, spell: SpellKey) -> SimDuration {
        self.cooldown_ready_at
            .get(spell.0 as usize)
            .map(|ready_at| (*ready_at - self.now).max(SimDuration::ZERO))
            .unwrap_or(SimDuration::NEVER)
    }

    fn can_cast(&self, spell: SpellKey, _target: Option<UnitIndex>) -> bool {
        let Some(definition) = self.spells.get(spell.0 as usize) else {
            return false;
        };
        self.spell_is_ready(spell)
            && self.rotation_ready()
            && (!definition.on_gcd || self.gcd_ready())
    }

    fn cast(&mut self, spell: SpellKey, target: Option<UnitIndex>) -> bool {
        if !self.can_cast(spell, target) {
            self.failed_casts += 1;
            return false;
        }

        let definition = self.spell(spell).clone();
        let now = self.now;
        // Any other cast cuts the active channel short
        if !definition.cast_while_channeling {
            self.channel = None;
        }
        self.casts.push(CastRecord {
            at: now,
            spell,
            target,
        });
        self.cooldown_ready_at[spell.0 as usize] =
            now + SimDuration::from_millis(definition.cooldown_ms);
        if definition.on_gcd {
            self.gcd_ready_at = now + GCD_DEFAULT;
        }
        if definition.channel_ticks > 0 {
            let interval = SimDuration::from_millis(definition.tick_interval_ms);
            self.channel = Some(ActiveChannel {
                spell,
                remaining_ticks: definition.channel_ticks,
                next_tick_at: now + interval,
                interval,
            });
        }
        if definition.dot_ms > 0 {
            let unit = target.unwrap_or(UnitIndex(self.current_target));
            self.dots
                .insert((unit, spell), now + SimDuration::from_millis(definition.dot_ms));
        }
        if definition.aura_ms > 0 {
            self.auras.insert(
                (PLAYER, definition.action_id),
                now + SimDuration::from_millis(definition.aura_ms),
            );
        }
        true
    }

    fn channel(&self) -> Option<ChannelState> {
        self.channel.as_ref().map(|channel| ChannelState {
            spell: channel.spell,
            remaining_ticks: channel.remaining_ticks,
        })
    }

    fn remove_auto_cooldown(&mut self, spell: SpellKey) {
        self.auto_cooldowns.retain(|key| *key != spell);
    }

    fn resolve_unit(&self, unit: UnitRef) -> Option<UnitIndex> {
        match unit {
            UnitRef::Player => Some(PLAYER),
            UnitRef::CurrentTarget => Some(UnitIndex(self.current_target)),
            UnitRef::NextTarget => Some(UnitIndex(self.current_target % self.targets + 1)),
            UnitRef::PreviousTarget => {
                let previous = if self.current_target == 1 {
                    self.targets
                } else {
                    self.current_target - 1
                };
                Some(UnitIndex(previous))
            }
            UnitRef::Target(index) if index >= 0 && (index as u32) < self.targets => {
                Some(UnitIndex(index as u32 + 1))
            }
            UnitRef::Target(_) => None,
        }
    }

    fn unit_label(&self, unit: UnitIndex) -> String {
        if unit == PLAYER {
            "Player".to_string()
        } else {
            format!("Target {}", unit.0 - 1)
        }
    }

    fn aura(&self, unit: UnitIndex, aura: &ActionId) -> Option<AuraState> {
        let expires = match self.auras.get(&(unit, *aura)) {
            Some(expires) => *expires,
            // Buffs from the spellbook exist before their first application
            None if unit == PLAYER
                && self
                    .spells
                    .iter()
                    .any(|spell| spell.aura_ms > 0 && spell.action_id.same_action(aura)) =>
            {
                SimDuration::ZERO
            }
            None => return None,
        };
        Some(AuraState {
            active: expires > self.now,
            remaining: (expires - self.now).max(SimDuration::ZERO),
        })
    }

    fn dot(&self, unit: UnitIndex, spell: SpellKey) -> Option<AuraState> {
        if self.spell(spell).dot_ms == 0 {
            return None;
        }
        let expires = self
            .dots
            .get(&(unit, spell))
            .copied()
            .unwrap_or(SimDuration::ZERO);
        Some(AuraState {
            active: expires > self.now,
            remaining: (expires - self.now).max(SimDuration::ZERO),
        })
    }

    fn health_percent(&self, unit: UnitIndex) -> f64 {
        self.health.get(unit.0 as usize).copied().unwrap_or(0.0)
    }

    fn item_swap_enabled(&self) -> bool {
        self.item_swap_enabled
    }

    fn item_set(&self) -> ItemSet {
        self.current_set
    }

    fn swap_items(&mut self, set: ItemSet) {
        self.current_set = set;
        self.swaps.push(set);
    }
}
