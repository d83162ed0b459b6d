//! Construction of value trees from configuration
//!
//! Building never fails hard: a malformed node records a diagnostic and
//! comes back as `None`, which every consumer reads as "condition false".

use uuid::Uuid;

use super::coerce::{coerce_all, coerce_to, CoercionError};
use super::constant::Const;
use super::kind::ValueType;
use super::operators::{CompareOp, MathOp};
use super::query::Query;
use super::Value;
use crate::core::types::{ActionId, OtherAction, UnitRef};
use crate::rules::schema::{GroupConfig, ValueConfig, ValueKindConfig, VariableConfig};
use crate::rules::Extensions;
use crate::sim::{Simulation, SpellFlags, SpellRef};
use crate::validation::{LogLevel, ValidationSink};

/// Everything needed to turn configuration into live nodes for one unit
pub struct BuildContext<'a> {
    pub sim: &'a dyn Simulation,
    pub sink: &'a mut ValidationSink,
    pub extensions: &'a Extensions,
    variables: &'a [VariableConfig],
    /// Variables declared before this point; later ones are invisible
    visible_variables: usize,
    group_variables: Option<&'a [VariableConfig]>,
    groups: &'a [GroupConfig],
    parsing_prepull: bool,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        sim: &'a dyn Simulation,
        sink: &'a mut ValidationSink,
        variables: &'a [VariableConfig],
        extensions: &'a Extensions,
    ) -> Self {
        Self {
            sim,
            sink,
            extensions,
            variables,
            visible_variables: variables.len(),
            group_variables: None,
            groups: &[],
            parsing_prepull: false,
        }
    }

    /// Make the rotation's groups available to group references
    pub fn with_groups(mut self, groups: &'a [GroupConfig]) -> Self {
        self.groups = groups;
        self
    }

    pub fn groups(&self) -> &'a [GroupConfig] {
        self.groups
    }

    pub fn parsing_prepull(&self) -> bool {
        self.parsing_prepull
    }

    pub fn set_parsing_prepull(&mut self, parsing_prepull: bool) {
        self.parsing_prepull = parsing_prepull;
    }

    /// Run `f` with a group's variables substituting its placeholders
    pub fn with_group_variables<R>(
        &mut self,
        variables: &'a [VariableConfig],
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let saved = self.group_variables.replace(variables);
        let result = f(self);
        self.group_variables = saved;
        result
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.sink.message(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.sink.message(LogLevel::Error, message);
    }

    /// Resolve a configured action id against the unit's spellbook,
    /// warning when the unit does not know it
    pub fn lookup_spell(&mut self, id: &ActionId) -> Option<SpellRef> {
        let found = find_spell(self.sim, id, self.parsing_prepull);
        if found.is_none() {
            let unit = self.sim.player_label();
            self.warn(format!("{unit} does not know spell {id}"));
        }
        found
    }

    /// Pick the configured unit reference or `default`, warning when it
    /// does not currently resolve
    pub fn unit_ref(&mut self, unit: Option<UnitRef>, default: UnitRef) -> UnitRef {
        let Some(unit) = unit else {
            return default;
        };
        if self.sim.resolve_unit(unit).is_none() {
            self.warn(format!("No unit found matching reference: {unit:?}"));
        }
        unit
    }

    pub fn build_optional(&mut self, config: Option<&ValueConfig>) -> Option<Value> {
        config.and_then(|config| self.build_value(config))
    }

    /// Coerce with a diagnostic on failure
    pub fn coerce(&mut self, value: Option<Value>, target: ValueType, uuid: Option<Uuid>) -> Option<Value> {
        match coerce_to(value?, target) {
            Ok(value) => Some(value),
            Err(e) => {
                self.record_coercion_errors(uuid, vec![e]);
                None
            }
        }
    }

    fn record_coercion_errors(&mut self, uuid: Option<Uuid>, errors: Vec<CoercionError>) {
        for e in errors {
            self.sink.message_by_uuid(uuid, LogLevel::Warning, e.to_string());
        }
    }

    pub fn build_value(&mut self, config: &ValueConfig) -> Option<Value> {
        let uuid = config.uuid;
        match &config.kind {
            ValueKindConfig::Const { val } => Some(Value::Const(Const::parse(val))),
            ValueKindConfig::Compare { op, lhs, rhs } => self.build_compare(*op, lhs, rhs, uuid),
            ValueKindConfig::Math { op, lhs, rhs } => self.build_math(*op, lhs, rhs, uuid),
            ValueKindConfig::Max { vals } => self.build_min_max(vals, true, uuid),
            ValueKindConfig::Min { vals } => self.build_min_max(vals, false, uuid),
            ValueKindConfig::And { vals } => self.build_logical(vals, true, uuid),
            ValueKindConfig::Or { vals } => self.build_logical(vals, false, uuid),
            ValueKindConfig::Not { val } => {
                let inner = self.build_value(val);
                let inner = self.coerce(inner, ValueType::Bool, uuid)?;
                Some(Value::Not(Box::new(inner)))
            }
            ValueKindConfig::VariableRef { name } => self.build_variable_ref(name, uuid),
            ValueKindConfig::VariablePlaceholder { name } => self.build_placeholder(name, uuid),
            ValueKindConfig::CurrentTime => Some(Value::Query(Query::CurrentTime)),
            ValueKindConfig::RemainingTime => Some(Value::Query(Query::RemainingTime)),
            ValueKindConfig::IsMoving => Some(Value::Query(Query::IsMoving)),
            ValueKindConfig::GcdIsReady => Some(Value::Query(Query::GcdIsReady)),
            ValueKindConfig::SpellIsReady { spell_id } => {
                Some(Value::Query(Query::SpellIsReady(self.lookup_spell(spell_id)?)))
            }
            ValueKindConfig::SpellCanCast { spell_id } => {
                Some(Value::Query(Query::SpellCanCast(self.lookup_spell(spell_id)?)))
            }
            ValueKindConfig::SpellTimeToReady { spell_id } => {
                Some(Value::Query(Query::SpellTimeToReady(self.lookup_spell(spell_id)?)))
            }
            ValueKindConfig::AuraIsActive {
                source_unit,
                aura_id,
            } => {
                let unit = self.aura_source(*source_unit, aura_id)?;
                Some(Value::Query(Query::AuraIsActive {
                    unit,
                    aura: *aura_id,
                }))
            }
            ValueKindConfig::AuraRemainingTime {
                source_unit,
                aura_id,
            } => {
                let unit = self.aura_source(*source_unit, aura_id)?;
                Some(Value::Query(Query::AuraRemainingTime {
                    unit,
                    aura: *aura_id,
                }))
            }
            ValueKindConfig::DotIsActive {
                target_unit,
                spell_id,
            } => {
                let (unit, spell) = self.dot_target(*target_unit, spell_id)?;
                Some(Value::Query(Query::DotIsActive { unit, spell }))
            }
            ValueKindConfig::DotRemainingTime {
                target_unit,
                spell_id,
            } => {
                let (unit, spell) = self.dot_target(*target_unit, spell_id)?;
                Some(Value::Query(Query::DotRemainingTime { unit, spell }))
            }
            ValueKindConfig::HealthPercent { unit } => {
                let unit = self.unit_ref(*unit, UnitRef::CurrentTarget);
                Some(Value::Query(Query::HealthPercent(unit)))
            }
            ValueKindConfig::ChannelTicksRemaining => {
                Some(Value::Query(Query::ChannelTicksRemaining))
            }
            ValueKindConfig::Custom { kind, params } => {
                let extensions = self.extensions;
                let Some(factory) = extensions.value_factory(kind) else {
                    self.sink.message_by_uuid(
                        uuid,
                        LogLevel::Warning,
                        format!("Unknown value kind '{kind}'"),
                    );
                    return None;
                };
                factory(params, self).map(Value::Custom)
            }
        }
    }

    fn aura_source(&mut self, source: Option<UnitRef>, aura: &ActionId) -> Option<UnitRef> {
        let unit = self.unit_ref(source, UnitRef::Player);
        let resolved = self.sim.resolve_unit(unit)?;
        if self.sim.aura(resolved, aura).is_none() {
            let label = self.sim.unit_label(resolved);
            self.warn(format!("No aura found on {label} for: {aura}"));
            return None;
        }
        Some(unit)
    }

    fn dot_target(&mut self, target: Option<UnitRef>, spell_id: &ActionId) -> Option<(UnitRef, SpellRef)> {
        let unit = self.unit_ref(target, UnitRef::CurrentTarget);
        let spell = self.lookup_spell(spell_id)?;
        let resolved = self.sim.resolve_unit(unit)?;
        if self.sim.dot(resolved, spell.key).is_none() {
            self.warn(format!("No dot found for {spell_id}"));
            return None;
        }
        Some((unit, spell))
    }

    fn build_compare(
        &mut self,
        op: CompareOp,
        lhs: &ValueConfig,
        rhs: &ValueConfig,
        uuid: Option<Uuid>,
    ) -> Option<Value> {
        let operands = vec![self.build_value(lhs), self.build_value(rhs)];
        let (operands, errors) = coerce_all(operands);
        self.record_coercion_errors(uuid, errors);
        let (lhs, rhs) = pair(operands)?;

        let (lt, rt) = (lhs.value_type(), rhs.value_type());
        if lt != ValueType::Unknown
            && rt != ValueType::Unknown
            && lt == ValueType::Bool
            && !op.allowed_on_bool()
        {
            self.sink.message_by_uuid(
                uuid,
                LogLevel::Warning,
                "Bool types only allow Equals and NotEquals comparisons!",
            );
            return None;
        }

        Some(Value::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn build_math(
        &mut self,
        op: MathOp,
        lhs: &ValueConfig,
        rhs: &ValueConfig,
        uuid: Option<Uuid>,
    ) -> Option<Value> {
        let mut operands = vec![self.build_value(lhs), self.build_value(rhs)];
        if op.coerces_operands() {
            let (coerced, errors) = coerce_all(operands);
            self.record_coercion_errors(uuid, errors);
            operands = coerced;
        }
        let (lhs, rhs) = pair(operands)?;

        let (lt, rt) = (lhs.value_type(), rhs.value_type());
        if lt != ValueType::Unknown && rt != ValueType::Unknown {
            if lt == ValueType::Bool || rt == ValueType::Bool {
                self.sink.message_by_uuid(
                    uuid,
                    LogLevel::Warning,
                    "Bool types not allowed in Math Operations!",
                );
                return None;
            }
            if lt == ValueType::String || rt == ValueType::String {
                self.sink.message_by_uuid(
                    uuid,
                    LogLevel::Warning,
                    "String types not allowed in Math Operations!",
                );
                return None;
            }
        }

        Some(Value::Math {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn build_min_max(&mut self, vals: &[ValueConfig], max: bool, uuid: Option<Uuid>) -> Option<Value> {
        let built = vals.iter().map(|v| self.build_value(v)).collect();
        let (coerced, errors) = coerce_all(built);
        self.record_coercion_errors(uuid, errors);
        let mut vals: Vec<Value> = coerced.into_iter().flatten().collect();

        match vals.len() {
            0 => None,
            1 => vals.pop(),
            _ => {
                let value_type = vals[0].value_type();
                if matches!(value_type, ValueType::Bool | ValueType::String) {
                    self.sink.message_by_uuid(
                        uuid,
                        LogLevel::Warning,
                        format!("{value_type} types not allowed in Min/Max Operations!"),
                    );
                    return None;
                }
                Some(if max { Value::Max(vals) } else { Value::Min(vals) })
            }
        }
    }

    fn build_logical(&mut self, vals: &[ValueConfig], and: bool, uuid: Option<Uuid>) -> Option<Value> {
        let mut vals: Vec<Value> = vals
            .iter()
            .filter_map(|v| {
                let built = self.build_value(v);
                self.coerce(built, ValueType::Bool, uuid)
            })
            .collect();

        match vals.len() {
            0 => None,
            1 => vals.pop(),
            _ => Some(if and { Value::And(vals) } else { Value::Or(vals) }),
        }
    }

    fn build_variable_ref(&mut self, name: &str, uuid: Option<Uuid>) -> Option<Value> {
        let variables = self.variables;
        let Some(index) = variables[..self.visible_variables]
            .iter()
            .position(|v| v.name == name)
        else {
            self.sink.message_by_uuid(
                uuid,
                LogLevel::Error,
                format!("Value variable '{name}' not found"),
            );
            return None;
        };

        // A variable only sees the ones declared before it, and never the
        // substitutions of the group it is referenced from.
        let variable = &variables[index];
        let saved_visible = std::mem::replace(&mut self.visible_variables, index);
        let saved_group = self.group_variables.take();
        let resolved = self.build_value(&variable.value);
        self.visible_variables = saved_visible;
        self.group_variables = saved_group;

        match resolved {
            Some(resolved) => Some(Value::VariableRef {
                name: name.to_string(),
                resolved: Box::new(resolved),
            }),
            None => {
                self.sink.message_by_uuid(
                    uuid,
                    LogLevel::Error,
                    format!("Value variable '{name}' is empty or invalid"),
                );
                None
            }
        }
    }

    fn build_placeholder(&mut self, name: &str, uuid: Option<Uuid>) -> Option<Value> {
        if name.is_empty() {
            self.sink.message_by_uuid(
                uuid,
                LogLevel::Warning,
                "Variable Placeholder must have a name",
            );
            return None;
        }

        let substitute = self
            .group_variables
            .and_then(|vars| vars.iter().find(|v| v.name == name));
        match substitute {
            Some(variable) => {
                let saved_group = self.group_variables.take();
                let value = self.build_value(&variable.value);
                self.group_variables = saved_group;
                value
            }
            None if self.group_variables.is_none() => {
                self.sink.message_by_uuid(
                    uuid,
                    LogLevel::Warning,
                    format!("Variable Placeholder '{name}' is only valid inside a group"),
                );
                None
            }
            None => Some(Value::Placeholder {
                name: name.to_string(),
            }),
        }
    }
}

/// Look up `id` in the unit's spellbook without recording anything
///
/// The generic potion id maps to the pre-combat or in-combat potion
/// depending on which list is being parsed; other ids prefer a spell
/// flagged for list use.
pub fn find_spell(sim: &dyn Simulation, id: &ActionId, parsing_prepull: bool) -> Option<SpellRef> {
    let book = sim.spellbook();
    let found = if id.is_other(OtherAction::Potion) {
        let flag = if parsing_prepull {
            SpellFlags::PREPULL_POTION
        } else {
            SpellFlags::COMBAT_POTION
        };
        book.iter().find(|spell| spell.flags.contains(flag))
    } else {
        book.iter()
            .find(|spell| spell.flags.contains(SpellFlags::APL) && spell.action_id.same_action(id))
            .or_else(|| book.iter().find(|spell| spell.action_id.same_action(id)))
    };
    found.map(|spell| SpellRef {
        key: spell.key,
        id: spell.action_id,
    })
}

fn pair(operands: Vec<Option<Value>>) -> Option<(Value, Value)> {
    let mut iter = operands.into_iter();
    let lhs = iter.next().flatten()?;
    let rhs = iter.next().flatten()?;
    Some((lhs, rhs))
}
