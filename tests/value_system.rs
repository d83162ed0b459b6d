//! Integration tests for value trees evaluated through a live rotation
//!
//! Values are authored in TOML exactly as rotation files carry them, built
//! against a sandbox unit and observed through what the rotation casts.

use apl_engine::core::types::ActionId;
use apl_engine::rules::parse_rotation_toml;
use apl_engine::sim::{SandboxSpell, SandboxUnit};
use apl_engine::value::{CompareOp, MathOp, Value};
use apl_engine::{LogLevel, Rotation, SimDuration, Simulation};
use proptest::prelude::*;
use uuid::Uuid;

fn unit() -> SandboxUnit {
    SandboxUnit::new(vec![
        SandboxSpell::instant(1, "Strike"),
        SandboxSpell::instant(2, "Execute"),
    ])
}

fn last_cast(sim: &SandboxUnit) -> Option<ActionId> {
    sim.casts()
        .last()
        .and_then(|record| sim.spell_info(record.spell))
        .map(|info| info.action_id)
}

/// Test 1: Named variables are shared by reference and re-evaluated every read
#[test]
fn test_variable_reference_tracks_simulation_state() {
    let config = parse_rotation_toml(
        r#"
        [[value_variables]]
        name = "burst_window"
        value = { type = "compare", op = "lt", lhs = { type = "remaining_time" }, rhs = { type = "const", val = "30s" } }

        [[priority_list]]
        action = { type = "cast_spell", spell_id = { spell = { id = 2 } }, condition = { type = "variable_ref", name = "burst_window" } }

        [[priority_list]]
        action = { type = "cast_spell", spell_id = { spell = { id = 1 } } }
        "#,
    )
    .unwrap();

    let mut sim = unit();
    let mut rotation = Rotation::new(&config, &mut sim);
    assert!(rotation.stats(&sim).is_clean());

    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 1);
    assert_eq!(last_cast(&sim), Some(ActionId::spell(1)));

    // 20s left in a 180s fight
    sim.set_time(SimDuration::from_secs(160));
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 1);
    assert_eq!(last_cast(&sim), Some(ActionId::spell(2)));
}

/// Test 2: A variable only sees variables declared before it
#[test]
fn test_later_variables_are_invisible() {
    let config = parse_rotation_toml(
        r#"
        [[value_variables]]
        name = "first"
        value = { type = "variable_ref", name = "second" }

        [[value_variables]]
        name = "second"
        value = { type = "const", val = "true" }

        [[priority_list]]
        action = { type = "cast_spell", spell_id = { spell = { id = 1 } }, condition = { type = "variable_ref", name = "first" } }
        "#,
    )
    .unwrap();

    let mut sim = unit();
    let mut rotation = Rotation::new(&config, &mut sim);
    let stats = rotation.stats(&sim);
    let messages: Vec<&str> = stats.priority_list[0]
        .validations
        .iter()
        .map(|v| v.validation.as_str())
        .collect();
    assert_eq!(
        messages,
        vec![
            "Value variable 'second' not found",
            "Value variable 'first' is empty or invalid",
        ]
    );
    assert!(stats.priority_list[0]
        .validations
        .iter()
        .all(|v| v.log_level == LogLevel::Error));

    // The action stays in the list but can never run
    assert_eq!(rotation.priority_list().len(), 1);
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 0);
    assert!(sim.casts().is_empty());
}

/// Test 3: Math coerces its operands, so time arithmetic reads naturally
#[test]
fn test_duration_math_in_condition() {
    let config = parse_rotation_toml(
        r#"
        [[priority_list]]
        [priority_list.action]
        type = "cast_spell"
        spell_id = { spell = { id = 1 } }
        condition = { type = "compare", op = "gt", lhs = { type = "math", op = "add", lhs = { type = "current_time" }, rhs = { type = "const", val = "1s" } }, rhs = { type = "const", val = "2s" } }
        "#,
    )
    .unwrap();

    let mut sim = unit();
    let mut rotation = Rotation::new(&config, &mut sim);
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 0);

    sim.set_time(SimDuration::from_millis(1500));
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 1);
}

/// Test 4: Diagnostics of keyed nodes are exported under their uuid
#[test]
fn test_keyed_diagnostics_use_uuid() {
    let uuid = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
    let config = parse_rotation_toml(&format!(
        r#"
        [[priority_list]]
        [priority_list.action]
        type = "cast_spell"
        spell_id = {{ spell = {{ id = 1 }} }}
        condition = {{ type = "compare", uuid = "{uuid}", op = "lt", lhs = {{ type = "is_moving" }}, rhs = {{ type = "const", val = "true" }} }}
        "#
    ))
    .unwrap();

    let mut sim = unit();
    let mut rotation = Rotation::new(&config, &mut sim);
    let stats = rotation.stats(&sim);

    assert!(stats.priority_list[0].validations.is_empty());
    assert_eq!(stats.uuid_validations.len(), 1);
    assert_eq!(stats.uuid_validations[0].uuid, uuid);
    assert_eq!(
        stats.uuid_validations[0].validations[0].validation,
        "Bool types only allow Equals and NotEquals comparisons!"
    );
}

/// Test 5: Every read goes back to the simulation
#[test]
fn test_queries_are_not_cached() {
    let sim = unit();
    let value = Value::Compare {
        op: CompareOp::Ge,
        lhs: Box::new(Value::Query(apl_engine::value::Query::CurrentTime)),
        rhs: Box::new(Value::constant("5s")),
    };
    assert!(!value.get_bool(&sim));

    let mut later = sim.clone();
    later.set_time(SimDuration::from_secs(5));
    assert!(value.get_bool(&later));
}

proptest! {
    #[test]
    fn test_int_comparison_matches_native(a in -10_000i32..10_000, b in -10_000i32..10_000) {
        let sim = unit();
        let value = Value::Compare {
            op: CompareOp::Lt,
            lhs: Box::new(Value::constant(&a.to_string())),
            rhs: Box::new(Value::constant(&b.to_string())),
        };
        prop_assert_eq!(value.get_bool(&sim), a < b);
    }

    #[test]
    fn test_duration_sum_matches_native(a in 0i64..100_000, b in 0i64..100_000) {
        let sim = unit();
        let value = Value::Math {
            op: MathOp::Add,
            lhs: Box::new(Value::constant(&format!("{a}ms"))),
            rhs: Box::new(Value::constant(&format!("{b}ms"))),
        };
        prop_assert_eq!(value.get_duration(&sim), SimDuration::from_millis(a + b));
    }
}
