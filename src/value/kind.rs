//! Value types and their coercion priority

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type reported by a value node
///
/// Declaration order is the coercion priority: when operands disagree the
/// later variant wins, so Bool beats everything and String beats the
/// numeric types.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Unresolved placeholder; coercion is deferred
    #[default]
    Unknown,
    Int,
    Float,
    Duration,
    String,
    Bool,
}

impl ValueType {
    /// The winning type when two operands meet
    pub fn higher(self, other: ValueType) -> ValueType {
        self.max(other)
    }

    /// Whether a value of this type may be coerced into `target`
    ///
    /// Strings are output-only, and booleans have no duration or text form.
    pub fn can_coerce_to(self, target: ValueType) -> bool {
        match (self, target) {
            (from, to) if from == to => true,
            (ValueType::Unknown, _) | (_, ValueType::Unknown) => true,
            (ValueType::String, _) => false,
            (ValueType::Bool, ValueType::Duration | ValueType::String) => false,
            _ => true,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Int | ValueType::Float | ValueType::Duration)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Unknown => "Unknown",
            ValueType::Int => "Int",
            ValueType::Float => "Float",
            ValueType::Duration => "Duration",
            ValueType::String => "String",
            ValueType::Bool => "Bool",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert_eq!(ValueType::Int.higher(ValueType::Duration), ValueType::Duration);
        assert_eq!(ValueType::Float.higher(ValueType::Bool), ValueType::Bool);
        assert_eq!(ValueType::String.higher(ValueType::Duration), ValueType::String);
        assert_eq!(ValueType::Bool.higher(ValueType::String), ValueType::Bool);
        assert_eq!(ValueType::Unknown.higher(ValueType::Int), ValueType::Int);
    }

    #[test]
    fn test_string_is_terminal() {
        assert!(!ValueType::String.can_coerce_to(ValueType::Int));
        assert!(!ValueType::String.can_coerce_to(ValueType::Bool));
        assert!(ValueType::Int.can_coerce_to(ValueType::String));
        assert!(!ValueType::Bool.can_coerce_to(ValueType::Duration));
        assert!(ValueType::Bool.can_coerce_to(ValueType::Int));
    }
}
