//! Registry of embedding-supplied value and action kinds

use ahash::AHashMap;
use std::fmt;

use crate::action::CustomAction;
use crate::value::{BuildContext, CustomValue};

/// Builds a custom value from its `params`; `None` after recording a
/// diagnostic when the parameters are unusable
pub type CustomValueFactory = Box<
    dyn Fn(&serde_json::Value, &mut BuildContext<'_>) -> Option<Box<dyn CustomValue>> + Send + Sync,
>;

pub type CustomActionFactory = Box<
    dyn Fn(&serde_json::Value, &mut BuildContext<'_>) -> Option<Box<dyn CustomAction>> + Send + Sync,
>;

/// Central storage for custom kinds, looked up by the `kind` field of
/// `custom` configuration nodes
#[derive(Default)]
pub struct Extensions {
    values: AHashMap<String, CustomValueFactory>,
    actions: AHashMap<String, CustomActionFactory>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_value(&mut self, kind: impl Into<String>, factory: CustomValueFactory) {
        self.values.insert(kind.into(), factory);
    }

    pub fn register_action(&mut self, kind: impl Into<String>, factory: CustomActionFactory) {
        self.actions.insert(kind.into(), factory);
    }

    pub fn value_factory(&self, kind: &str) -> Option<&CustomValueFactory> {
        self.values.get(kind)
    }

    pub fn action_factory(&self, kind: &str) -> Option<&CustomActionFactory> {
        self.actions.get(kind)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.actions.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut values: Vec<_> = self.values.keys().collect();
        let mut actions: Vec<_> = self.actions.keys().collect();
        values.sort();
        actions.sort();
        f.debug_struct("Extensions")
            .field("values", &values)
            .field("actions", &actions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::schema::{ValueConfig, ValueKindConfig};
    use crate::sim::{SandboxUnit, Simulation};
    use crate::validation::ValidationSink;
    use crate::value::{Value, ValueType};

    #[derive(Debug)]
    struct Fixed(i32);

    impl CustomValue for Fixed {
        fn value_type(&self) -> ValueType {
            ValueType::Int
        }

        fn get_int(&self, _sim: &dyn Simulation) -> i32 {
            self.0
        }

        fn describe(&self) -> String {
            format!("Fixed({})", self.0)
        }
    }

    #[test]
    fn test_registered_value_kind_is_built() {
        let mut extensions = Extensions::new();
        extensions.register_value(
            "fixed",
            Box::new(|params: &serde_json::Value, _ctx: &mut BuildContext<'_>| {
                let n = params.get("n")?.as_i64()? as i32;
                Some(Box::new(Fixed(n)) as Box<dyn CustomValue>)
            }),
        );

        let sim = SandboxUnit::new(Vec::new());
        let mut sink = ValidationSink::new();
        let mut ctx = BuildContext::new(&sim, &mut sink, &[], &extensions);
        let config = ValueConfig::new(ValueKindConfig::Custom {
            kind: "fixed".to_string(),
            params: serde_json::json!({ "n": 12 }),
        });
        let value = ctx.build_value(&config).unwrap();
        assert!(matches!(value, Value::Custom(_)));
        assert_eq!(value.get_int(&sim), 12);
    }

    #[test]
    fn test_unregistered_kind_warns() {
        let extensions = Extensions::new();
        let sim = SandboxUnit::new(Vec::new());
        let mut sink = ValidationSink::new();
        let value = {
            let mut ctx = BuildContext::new(&sim, &mut sink, &[], &extensions);
            ctx.build_value(&ValueConfig::new(ValueKindConfig::Custom {
                kind: "missing".to_string(),
                params: serde_json::Value::Null,
            }))
        };
        assert!(value.is_none());
        assert_eq!(sink.current()[0].validation, "Unknown value kind 'missing'");
    }
}
