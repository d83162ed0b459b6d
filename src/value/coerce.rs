//! Common-type coercion for operator operands

use thiserror::Error;

use super::kind::ValueType;
use super::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cannot coerce {from} to {to}")]
pub struct CoercionError {
    pub from: ValueType,
    pub to: ValueType,
}

/// Re-type `value` as `target`
///
/// A value already of the target type comes back untouched, and constants
/// are copied with the new type instead of being wrapped.
pub fn coerce_to(value: Value, target: ValueType) -> Result<Value, CoercionError> {
    let from = value.value_type();
    if from == target {
        return Ok(value);
    }
    if !from.can_coerce_to(target) {
        return Err(CoercionError { from, to: target });
    }
    Ok(match value {
        Value::Const(c) => Value::Const(c.retyped(target)),
        other => Value::Coerced {
            value_type: target,
            inner: Box::new(other),
        },
    })
}

/// Highest-priority type among the present operands
///
/// Any direct placeholder defers the decision and yields `Unknown`.
pub fn common_type(values: &[Option<Value>]) -> ValueType {
    let mut result = ValueType::Unknown;
    for value in values.iter().flatten() {
        if matches!(value, Value::Placeholder { .. }) {
            return ValueType::Unknown;
        }
        result = result.higher(value.value_type());
    }
    result
}

/// Coerce every operand to their common type
///
/// Operands that cannot be coerced become `None`; the errors are returned
/// alongside so the caller can record them.
pub fn coerce_all(values: Vec<Option<Value>>) -> (Vec<Option<Value>>, Vec<CoercionError>) {
    let target = common_type(&values);
    if target == ValueType::Unknown {
        return (values, Vec::new());
    }

    let mut errors = Vec::new();
    let coerced = values
        .into_iter()
        .map(|value| {
            value.and_then(|v| match coerce_to(v, target) {
                Ok(v) => Some(v),
                Err(e) => {
                    errors.push(e);
                    None
                }
            })
        })
        .collect();
    (coerced, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Query;

    #[test]
    fn test_same_type_is_not_wrapped() {
        let value = Value::Query(Query::CurrentTime);
        let coerced = coerce_to(value, ValueType::Duration).unwrap();
        assert!(matches!(coerced, Value::Query(Query::CurrentTime)));
    }

    #[test]
    fn test_const_is_copied_not_wrapped() {
        let coerced = coerce_to(Value::constant("5"), ValueType::Duration).unwrap();
        match coerced {
            Value::Const(c) => assert_eq!(c.value_type(), ValueType::Duration),
            other => panic!("expected const, got {other:?}"),
        }
    }

    #[test]
    fn test_int_and_duration_become_duration() {
        let (values, errors) = coerce_all(vec![
            Some(Value::constant("3")),
            Some(Value::Query(Query::RemainingTime)),
        ]);
        assert!(errors.is_empty());
        assert!(values
            .iter()
            .all(|v| v.as_ref().map(Value::value_type) == Some(ValueType::Duration)));
    }

    #[test]
    fn test_float_and_bool_become_bool() {
        let (values, _) = coerce_all(vec![
            Some(Value::Query(Query::HealthPercent(Default::default()))),
            Some(Value::Query(Query::IsMoving)),
        ]);
        assert!(values
            .iter()
            .all(|v| v.as_ref().map(Value::value_type) == Some(ValueType::Bool)));
        assert!(matches!(values[0], Some(Value::Coerced { .. })));
    }

    #[test]
    fn test_placeholder_defers_coercion() {
        let values = vec![
            Some(Value::constant("3")),
            Some(Value::Placeholder {
                name: "x".to_string(),
            }),
        ];
        assert_eq!(common_type(&values), ValueType::Unknown);
        let (values, _) = coerce_all(values);
        assert_eq!(
            values[0].as_ref().map(Value::value_type),
            Some(ValueType::Int)
        );
    }

    #[test]
    fn test_text_cannot_become_bool() {
        let (values, errors) = coerce_all(vec![
            Some(Value::constant("abc")),
            Some(Value::constant("true")),
        ]);
        assert!(values[0].is_none());
        assert!(values[1].is_some());
        assert_eq!(
            errors,
            vec![CoercionError {
                from: ValueType::String,
                to: ValueType::Bool
            }]
        );
    }
}
