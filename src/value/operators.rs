//! Comparison and arithmetic over typed values

use serde::{Deserialize, Serialize};
use std::fmt;

use super::kind::ValueType;
use super::Value;
use crate::core::types::SimDuration;
use crate::sim::Simulation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Only equality tests are meaningful on booleans
    pub fn allowed_on_bool(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    fn apply<T: PartialOrd + ?Sized>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl MathOp {
    /// Add and Sub bring both operands to a common type first
    pub fn coerces_operands(self) -> bool {
        matches!(self, MathOp::Add | MathOp::Sub)
    }
}

impl fmt::Display for MathOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            MathOp::Add => "+",
            MathOp::Sub => "-",
            MathOp::Mul => "*",
            MathOp::Div => "/",
        };
        f.write_str(symbol)
    }
}

/// Evaluate `lhs op rhs`; both operands already share a type
pub(crate) fn compare(op: CompareOp, lhs: &Value, rhs: &Value, sim: &dyn Simulation) -> bool {
    match lhs.value_type() {
        ValueType::Bool => match op {
            CompareOp::Eq => lhs.get_bool(sim) == rhs.get_bool(sim),
            CompareOp::Ne => lhs.get_bool(sim) != rhs.get_bool(sim),
            _ => false,
        },
        ValueType::Int => op.apply(&lhs.get_int(sim), &rhs.get_int(sim)),
        ValueType::Float => op.apply(&lhs.get_float(sim), &rhs.get_float(sim)),
        ValueType::Duration => op.apply(&lhs.get_duration(sim), &rhs.get_duration(sim)),
        ValueType::String => op.apply(lhs.get_string(sim).as_str(), rhs.get_string(sim).as_str()),
        ValueType::Unknown => false,
    }
}

pub(crate) fn math_int(op: MathOp, lhs: &Value, rhs: &Value, sim: &dyn Simulation) -> i32 {
    let (l, r) = (lhs.get_int(sim), rhs.get_int(sim));
    match op {
        MathOp::Add => l.wrapping_add(r),
        MathOp::Sub => l.wrapping_sub(r),
        MathOp::Mul => l.wrapping_mul(r),
        MathOp::Div if r == 0 => 0,
        MathOp::Div => l.wrapping_div(r),
    }
}

pub(crate) fn math_float(op: MathOp, lhs: &Value, rhs: &Value, sim: &dyn Simulation) -> f64 {
    let (l, r) = (lhs.get_float(sim), rhs.get_float(sim));
    match op {
        MathOp::Add => l + r,
        MathOp::Sub => l - r,
        MathOp::Mul => l * r,
        MathOp::Div => l / r,
    }
}

/// Duration arithmetic
///
/// Add and Sub see two durations. For Mul and Div an Int or Float operand is
/// a raw scale factor, never a number of seconds.
pub(crate) fn math_duration(
    op: MathOp,
    lhs: &Value,
    rhs: &Value,
    sim: &dyn Simulation,
) -> SimDuration {
    match op {
        MathOp::Add => lhs.get_duration(sim) + rhs.get_duration(sim),
        MathOp::Sub => lhs.get_duration(sim) - rhs.get_duration(sim),
        MathOp::Mul => match (lhs.value_type(), rhs.value_type()) {
            (_, ValueType::Int) => scale_int(lhs.get_duration(sim), rhs.get_int(sim)),
            (_, ValueType::Float) => lhs.get_duration(sim).mul_f64(rhs.get_float(sim)),
            (ValueType::Int, _) => scale_int(rhs.get_duration(sim), lhs.get_int(sim)),
            (ValueType::Float, _) => rhs.get_duration(sim).mul_f64(lhs.get_float(sim)),
            _ => SimDuration::from_nanos(
                lhs.get_duration(sim)
                    .as_nanos()
                    .saturating_mul(rhs.get_duration(sim).as_nanos()),
            ),
        },
        MathOp::Div => {
            let dividend = lhs.get_duration(sim);
            match rhs.value_type() {
                ValueType::Int => match rhs.get_int(sim) {
                    0 => SimDuration::ZERO,
                    divisor => SimDuration::from_nanos(dividend.as_nanos() / divisor as i64),
                },
                ValueType::Float => {
                    let divisor = rhs.get_float(sim);
                    if divisor == 0.0 {
                        SimDuration::ZERO
                    } else {
                        SimDuration::from_nanos((dividend.as_nanos() as f64 / divisor) as i64)
                    }
                }
                _ => match rhs.get_duration(sim).as_nanos() {
                    0 => SimDuration::ZERO,
                    divisor => SimDuration::from_nanos(dividend.as_nanos() / divisor),
                },
            }
        }
    }
}

fn scale_int(duration: SimDuration, factor: i32) -> SimDuration {
    SimDuration::from_nanos(duration.as_nanos().saturating_mul(factor as i64))
}

pub(crate) fn min_max_int(values: &[Value], sim: &dyn Simulation, max: bool) -> i32 {
    let mut iter = values.iter().map(|v| v.get_int(sim));
    let first = iter.next().unwrap_or_default();
    iter.fold(first, |acc, v| if max { acc.max(v) } else { acc.min(v) })
}

pub(crate) fn min_max_float(values: &[Value], sim: &dyn Simulation, max: bool) -> f64 {
    let mut iter = values.iter().map(|v| v.get_float(sim));
    let first = iter.next().unwrap_or_default();
    iter.fold(first, |acc, v| if max { acc.max(v) } else { acc.min(v) })
}

pub(crate) fn min_max_duration(values: &[Value], sim: &dyn Simulation, max: bool) -> SimDuration {
    let mut iter = values.iter().map(|v| v.get_duration(sim));
    let first = iter.next().unwrap_or_default();
    iter.fold(first, |acc, v| if max { acc.max(v) } else { acc.min(v) })
}
