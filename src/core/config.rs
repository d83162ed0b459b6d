//! Engine configuration with documented constants
//!
//! Every tunable the decision engine relies on lives here, next to the
//! reason it has the value it has.

use super::duration::SimDuration;

/// Configuration for the decision engine
///
/// Each `Rotation` copies the active config when it is built, so a unit's
/// behaviour never changes mid-run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // === DECISION LOOP ===
    /// Maximum number of actions executed in a single decision tick
    ///
    /// A tick keeps executing until nothing is ready. An action that never
    /// becomes not-ready after executing would spin forever, so crossing this
    /// limit is reported as an authoring defect and halts the unit.
    pub max_actions_per_tick: usize,

    /// Reaction time used when the unit does not report its own
    ///
    /// The next evaluation is never scheduled sooner than `now + reaction`.
    /// 100ms matches a typical human reaction to a ready ability.
    pub default_reaction_time: SimDuration,

    // === IMPLICIT PREPULL STEPS ===
    /// Offset at which an unused pre-combat consumable is injected
    ///
    /// One second before the pull leaves room for the consumable's own
    /// cast animation without overlapping opener casts at time zero.
    pub implicit_consumable_offset: SimDuration,

    /// Offset at which the main loadout is restored after prepull swaps
    ///
    /// One nanosecond before the pull, i.e. after every authored prepull
    /// action but before combat starts.
    pub implicit_loadout_offset: SimDuration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_actions_per_tick: 1000,
            default_reaction_time: SimDuration::from_millis(100),
            implicit_consumable_offset: SimDuration::from_secs(-1),
            implicit_loadout_offset: SimDuration::from_nanos(-1),
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.max_actions_per_tick == 0 {
            return Err("max_actions_per_tick must be at least 1".into());
        }

        if self.default_reaction_time < SimDuration::ZERO {
            return Err(format!(
                "default_reaction_time ({}) must not be negative",
                self.default_reaction_time
            ));
        }

        // Implicit steps are prepull steps, so they must land before the pull
        if self.implicit_consumable_offset >= SimDuration::ZERO
            || self.implicit_loadout_offset >= SimDuration::ZERO
        {
            return Err("implicit prepull offsets must be negative".into());
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Get the global engine config (initializes with defaults if not set)
pub fn config() -> &'static EngineConfig {
    CONFIG.get_or_init(EngineConfig::default)
}

/// Set the global engine config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: EngineConfig) -> Result<(), EngineConfig> {
    CONFIG.set(config)
}
