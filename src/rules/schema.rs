//! Rotation schema types for TOML/JSON deserialization.
//!
//! This module defines the authored shape of a rotation: prepull entries,
//! the priority list, reusable groups and named value variables. Actions and
//! values are tagged by `type` and may carry a `uuid` so diagnostics can be
//! attached to nodes that have no list position.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::core::types::{ActionId, ItemSet, UnitRef};
use crate::value::{CompareOp, MathOp};

/// A complete rotation as authored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotationConfig {
    #[serde(default)]
    pub prepull_actions: Vec<PrepullItem>,
    #[serde(default)]
    pub priority_list: Vec<ListItem>,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub value_variables: Vec<VariableConfig>,
}

/// Action queued before the pull at a computed offset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepullItem {
    pub action: ActionConfig,
    /// When to run, relative to the pull; must evaluate to a negative duration
    #[serde(default)]
    pub do_at_value: Option<ValueConfig>,
    #[serde(default)]
    pub hide: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItem {
    pub action: ActionConfig,
    #[serde(default)]
    pub hide: bool,
}

/// Named, reusable action list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub actions: Vec<ListItem>,
    /// Substituted for `variable_placeholder` nodes in the group's actions
    #[serde(default)]
    pub variables: Vec<VariableConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableConfig {
    pub name: String,
    pub value: ValueConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ValueConfig>,
    #[serde(flatten)]
    pub kind: ActionKindConfig,
}

impl ActionConfig {
    pub fn new(kind: ActionKindConfig) -> Self {
        Self {
            uuid: None,
            condition: None,
            kind,
        }
    }

    pub fn with_condition(mut self, condition: ValueConfig) -> Self {
        self.condition = Some(condition);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKindConfig {
    CastSpell {
        spell_id: ActionId,
        #[serde(default)]
        target: Option<UnitRef>,
    },
    ChannelSpell {
        spell_id: ActionId,
        #[serde(default)]
        target: Option<UnitRef>,
        #[serde(default)]
        interrupt_if: Option<ValueConfig>,
        #[serde(default)]
        allow_recast: bool,
    },
    Wait {
        duration: ValueConfig,
    },
    Sequence {
        #[serde(default)]
        name: String,
        actions: Vec<ActionConfig>,
    },
    ResetSequence {
        sequence_name: String,
    },
    StrictSequence {
        actions: Vec<ActionConfig>,
    },
    GroupReference {
        group_name: String,
        #[serde(default)]
        variable_overrides: BTreeMap<String, String>,
    },
    ItemSwap {
        swap_set: ItemSet,
    },
    Custom {
        kind: String,
        #[serde(default)]
        params: serde_json::Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(flatten)]
    pub kind: ValueKindConfig,
}

impl ValueConfig {
    pub fn new(kind: ValueKindConfig) -> Self {
        Self { uuid: None, kind }
    }

    pub fn constant(val: impl Into<String>) -> Self {
        Self::new(ValueKindConfig::Const { val: val.into() })
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueKindConfig {
    Const {
        val: String,
    },
    Compare {
        op: CompareOp,
        lhs: Box<ValueConfig>,
        rhs: Box<ValueConfig>,
    },
    Math {
        op: MathOp,
        lhs: Box<ValueConfig>,
        rhs: Box<ValueConfig>,
    },
    Max {
        vals: Vec<ValueConfig>,
    },
    Min {
        vals: Vec<ValueConfig>,
    },
    And {
        vals: Vec<ValueConfig>,
    },
    Or {
        vals: Vec<ValueConfig>,
    },
    Not {
        val: Box<ValueConfig>,
    },
    VariableRef {
        name: String,
    },
    VariablePlaceholder {
        #[serde(default)]
        name: String,
    },
    CurrentTime,
    RemainingTime,
    IsMoving,
    GcdIsReady,
    SpellIsReady {
        spell_id: ActionId,
    },
    SpellCanCast {
        spell_id: ActionId,
    },
    SpellTimeToReady {
        spell_id: ActionId,
    },
    AuraIsActive {
        #[serde(default)]
        source_unit: Option<UnitRef>,
        aura_id: ActionId,
    },
    AuraRemainingTime {
        #[serde(default)]
        source_unit: Option<UnitRef>,
        aura_id: ActionId,
    },
    DotIsActive {
        #[serde(default)]
        target_unit: Option<UnitRef>,
        spell_id: ActionId,
    },
    DotRemainingTime {
        #[serde(default)]
        target_unit: Option<UnitRef>,
        spell_id: ActionId,
    },
    HealthPercent {
        #[serde(default)]
        unit: Option<UnitRef>,
    },
    ChannelTicksRemaining,
    Custom {
        kind: String,
        #[serde(default)]
        params: serde_json::Value,
    },
}
