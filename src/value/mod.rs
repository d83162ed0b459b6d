//! Typed expression trees used for conditions and parameters
//!
//! Every node reports a [`ValueType`] and answers all five accessors. The
//! accessor matching the node's own type reads it directly; the others
//! convert from it (Bool is 0/1, Duration converts through seconds, Float
//! truncates to Int). Nodes are re-evaluated on every read.

pub mod build;
pub mod coerce;
pub mod constant;
pub mod kind;
pub mod operators;
pub mod query;

use std::fmt;

use crate::core::types::SimDuration;
use crate::sim::Simulation;

pub use build::BuildContext;
pub use coerce::{coerce_all, coerce_to, common_type, CoercionError};
pub use constant::{parse_duration, Const};
pub use kind::ValueType;
pub use operators::{CompareOp, MathOp};
pub use query::Query;

/// Value supplied by an embedding through [`crate::rules::Extensions`]
pub trait CustomValue: fmt::Debug + Send {
    fn value_type(&self) -> ValueType;

    fn get_bool(&self, _sim: &dyn Simulation) -> bool {
        false
    }

    fn get_int(&self, _sim: &dyn Simulation) -> i32 {
        0
    }

    fn get_float(&self, _sim: &dyn Simulation) -> f64 {
        0.0
    }

    fn get_duration(&self, _sim: &dyn Simulation) -> SimDuration {
        SimDuration::ZERO
    }

    fn get_string(&self, _sim: &dyn Simulation) -> String {
        String::new()
    }

    fn inner_values(&self) -> Vec<&Value> {
        Vec::new()
    }

    fn describe(&self) -> String;
}

/// Expression node
#[derive(Debug)]
pub enum Value {
    Const(Const),
    /// Reports `value_type` and reads through to `inner`
    Coerced {
        value_type: ValueType,
        inner: Box<Value>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Value>,
        rhs: Box<Value>,
    },
    /// Typed like its left operand
    Math {
        op: MathOp,
        lhs: Box<Value>,
        rhs: Box<Value>,
    },
    Min(Vec<Value>),
    Max(Vec<Value>),
    And(Vec<Value>),
    Or(Vec<Value>),
    Not(Box<Value>),
    VariableRef {
        name: String,
        resolved: Box<Value>,
    },
    /// Group template slot; must be substituted before evaluation
    Placeholder {
        name: String,
    },
    Query(Query),
    Custom(Box<dyn CustomValue>),
}

impl Value {
    pub fn constant(text: &str) -> Value {
        Value::Const(Const::parse(text))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Const(c) => c.value_type(),
            Value::Coerced { value_type, .. } => *value_type,
            Value::Compare { .. } | Value::And(_) | Value::Or(_) | Value::Not(_) => {
                ValueType::Bool
            }
            Value::Math { lhs, .. } => lhs.value_type(),
            Value::Min(vals) | Value::Max(vals) => vals
                .first()
                .map(Value::value_type)
                .unwrap_or(ValueType::Unknown),
            Value::VariableRef { resolved, .. } => resolved.value_type(),
            Value::Placeholder { .. } => ValueType::Unknown,
            Value::Query(q) => q.value_type(),
            Value::Custom(c) => c.value_type(),
        }
    }

    /// Direct children, for tree-walking passes
    pub fn inner_values(&self) -> Vec<&Value> {
        match self {
            Value::Coerced { inner, .. } | Value::Not(inner) => vec![inner.as_ref()],
            Value::VariableRef { resolved, .. } => vec![resolved.as_ref()],
            Value::Compare { lhs, rhs, .. } | Value::Math { lhs, rhs, .. } => {
                vec![lhs.as_ref(), rhs.as_ref()]
            }
            Value::Min(vals) | Value::Max(vals) | Value::And(vals) | Value::Or(vals) => {
                vals.iter().collect()
            }
            Value::Custom(c) => c.inner_values(),
            Value::Const(_) | Value::Placeholder { .. } | Value::Query(_) => Vec::new(),
        }
    }

    /// This node and every descendant, breadth first
    pub fn walk(&self) -> Vec<&Value> {
        let mut out = vec![self];
        let mut i = 0;
        while i < out.len() {
            let node: &Value = out[i];
            out.extend(node.inner_values());
            i += 1;
        }
        out
    }

    /// Name of the first unsubstituted placeholder in this tree
    pub fn find_placeholder(&self) -> Option<&str> {
        self.walk().into_iter().find_map(|value| match value {
            Value::Placeholder { name } => Some(name.as_str()),
            _ => None,
        })
    }

    // === ACCESSORS ===

    pub fn get_bool(&self, sim: &dyn Simulation) -> bool {
        match self.value_type() {
            ValueType::Bool => self.native_bool(sim),
            ValueType::Int => self.native_int(sim) != 0,
            ValueType::Float => self.native_float(sim) != 0.0,
            ValueType::Duration => self.native_duration(sim) != SimDuration::ZERO,
            ValueType::String => !self.native_string(sim).is_empty(),
            ValueType::Unknown => false,
        }
    }

    pub fn get_int(&self, sim: &dyn Simulation) -> i32 {
        match self.value_type() {
            ValueType::Bool => self.native_bool(sim) as i32,
            ValueType::Int => self.native_int(sim),
            ValueType::Float => self.native_float(sim) as i32,
            ValueType::Duration => self.native_duration(sim).whole_secs() as i32,
            ValueType::String | ValueType::Unknown => 0,
        }
    }

    pub fn get_float(&self, sim: &dyn Simulation) -> f64 {
        match self.value_type() {
            ValueType::Bool => {
                if self.native_bool(sim) {
                    1.0
                } else {
                    0.0
                }
            }
            ValueType::Int => self.native_int(sim) as f64,
            ValueType::Float => self.native_float(sim),
            ValueType::Duration => self.native_duration(sim).as_secs_f64(),
            ValueType::String | ValueType::Unknown => 0.0,
        }
    }

    pub fn get_duration(&self, sim: &dyn Simulation) -> SimDuration {
        match self.value_type() {
            ValueType::Int => SimDuration::from_secs(self.native_int(sim) as i64),
            ValueType::Float => SimDuration::from_secs_f64(self.native_float(sim)),
            ValueType::Duration => self.native_duration(sim),
            ValueType::Bool | ValueType::String | ValueType::Unknown => SimDuration::ZERO,
        }
    }

    pub fn get_string(&self, sim: &dyn Simulation) -> String {
        match self.value_type() {
            ValueType::Bool => self.native_bool(sim).to_string(),
            ValueType::Int => self.native_int(sim).to_string(),
            ValueType::Float => format!("{:.3}", self.native_float(sim)),
            ValueType::Duration => self.native_duration(sim).to_string(),
            ValueType::String => self.native_string(sim),
            ValueType::Unknown => String::new(),
        }
    }

    // Native readers: only called when the node reports the matching type.

    fn native_bool(&self, sim: &dyn Simulation) -> bool {
        match self {
            Value::Const(c) => c.get_bool(),
            Value::Coerced { inner, .. } => inner.get_bool(sim),
            Value::Compare { op, lhs, rhs } => operators::compare(*op, lhs, rhs, sim),
            Value::And(vals) => vals.iter().all(|v| v.get_bool(sim)),
            Value::Or(vals) => vals.iter().any(|v| v.get_bool(sim)),
            Value::Not(inner) => !inner.get_bool(sim),
            Value::VariableRef { resolved, .. } => resolved.get_bool(sim),
            Value::Query(q) => q.get_bool(sim),
            Value::Custom(c) => c.get_bool(sim),
            Value::Math { .. } | Value::Min(_) | Value::Max(_) | Value::Placeholder { .. } => {
                false
            }
        }
    }

    fn native_int(&self, sim: &dyn Simulation) -> i32 {
        match self {
            Value::Const(c) => c.get_int(),
            Value::Coerced { inner, .. } => inner.get_int(sim),
            Value::Math { op, lhs, rhs } => operators::math_int(*op, lhs, rhs, sim),
            Value::Min(vals) => operators::min_max_int(vals, sim, false),
            Value::Max(vals) => operators::min_max_int(vals, sim, true),
            Value::VariableRef { resolved, .. } => resolved.get_int(sim),
            Value::Query(q) => q.get_int(sim),
            Value::Custom(c) => c.get_int(sim),
            _ => 0,
        }
    }

    fn native_float(&self, sim: &dyn Simulation) -> f64 {
        match self {
            Value::Const(c) => c.get_float(),
            Value::Coerced { inner, .. } => inner.get_float(sim),
            Value::Math { op, lhs, rhs } => operators::math_float(*op, lhs, rhs, sim),
            Value::Min(vals) => operators::min_max_float(vals, sim, false),
            Value::Max(vals) => operators::min_max_float(vals, sim, true),
            Value::VariableRef { resolved, .. } => resolved.get_float(sim),
            Value::Query(q) => q.get_float(sim),
            Value::Custom(c) => c.get_float(sim),
            _ => 0.0,
        }
    }

    fn native_duration(&self, sim: &dyn Simulation) -> SimDuration {
        match self {
            Value::Const(c) => c.get_duration(),
            Value::Coerced { inner, .. } => inner.get_duration(sim),
            Value::Math { op, lhs, rhs } => operators::math_duration(*op, lhs, rhs, sim),
            Value::Min(vals) => operators::min_max_duration(vals, sim, false),
            Value::Max(vals) => operators::min_max_duration(vals, sim, true),
            Value::VariableRef { resolved, .. } => resolved.get_duration(sim),
            Value::Query(q) => q.get_duration(sim),
            Value::Custom(c) => c.get_duration(sim),
            _ => SimDuration::ZERO,
        }
    }

    fn native_string(&self, sim: &dyn Simulation) -> String {
        match self {
            Value::Const(c) => c.get_string(),
            Value::Coerced { inner, .. } => inner.get_string(sim),
            Value::VariableRef { resolved, .. } => resolved.get_string(sim),
            Value::Custom(c) => c.get_string(sim),
            _ => String::new(),
        }
    }
}

fn join(vals: &[Value], separator: &str) -> String {
    vals.iter()
        .map(|v| format!("({v})"))
        .collect::<Vec<_>>()
        .join(separator)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Const(c) => f.write_str(c.text()),
            Value::Coerced { inner, .. } => write!(f, "{inner}"),
            Value::Compare { op, lhs, rhs } => write!(f, "{lhs} {op} {rhs}"),
            Value::Math { op, lhs, rhs } => write!(f, "Math({lhs} {op} {rhs})"),
            Value::Min(vals) => write!(f, "Min({})", join(vals, ", ")),
            Value::Max(vals) => write!(f, "Max({})", join(vals, ", ")),
            Value::And(vals) => f.write_str(&join(vals, " AND ")),
            Value::Or(vals) => f.write_str(&join(vals, " OR ")),
            Value::Not(inner) => write!(f, "Not({inner})"),
            Value::VariableRef { name, .. } => write!(f, "Var({name})"),
            Value::Placeholder { name } => write!(f, "VarPlaceholder({name})"),
            Value::Query(q) => write!(f, "{q}"),
            Value::Custom(c) => f.write_str(&c.describe()),
        }
    }
}
