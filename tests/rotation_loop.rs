//! Integration tests for the per-tick decision loop

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use apl_engine::action::{ActionKey, ControllingStack, CustomAction};
use apl_engine::core::types::ActionId;
use apl_engine::rules::{parse_rotation_toml, ActionConfig, ActionKindConfig, ListItem};
use apl_engine::sim::{SandboxSpell, SandboxUnit};
use apl_engine::value::BuildContext;
use apl_engine::{
    AplError, EngineConfig, Extensions, Rotation, RotationBuilder, RotationConfig, SimDuration,
    Simulation,
};

/// Custom action that is always ready and counts its executions
#[derive(Debug)]
struct Spin(Arc<AtomicUsize>);

impl CustomAction for Spin {
    fn is_ready(&self, _sim: &dyn Simulation) -> bool {
        true
    }

    fn execute(&mut self, _sim: &mut dyn Simulation) -> bool {
        self.0.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn describe(&self) -> String {
        "Spin".to_string()
    }
}

/// Custom action that is ready for a fixed number of executions
#[derive(Debug)]
struct Burst {
    count: Arc<AtomicUsize>,
    cap: usize,
}

impl CustomAction for Burst {
    fn is_ready(&self, _sim: &dyn Simulation) -> bool {
        self.count.load(Ordering::SeqCst) < self.cap
    }

    fn execute(&mut self, _sim: &mut dyn Simulation) -> bool {
        self.count.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn describe(&self) -> String {
        format!("Burst({})", self.cap)
    }
}

fn spin_extensions(counter: Arc<AtomicUsize>) -> Extensions {
    let mut extensions = Extensions::new();
    extensions.register_action(
        "spin",
        Box::new(move |_params: &serde_json::Value, _ctx: &mut BuildContext<'_>| {
            Some(Box::new(Spin(counter.clone())) as Box<dyn CustomAction>)
        }),
    );
    extensions
}

fn item(kind: ActionKindConfig) -> ListItem {
    ListItem {
        action: ActionConfig::new(kind),
        hide: false,
    }
}

/// Test 1: An action that never stops being ready trips the loop limit and
/// halts the unit for good
#[test]
fn test_runaway_action_halts_rotation() {
    let counter = Arc::new(AtomicUsize::new(0));
    let extensions = spin_extensions(counter.clone());
    let config = RotationConfig {
        priority_list: vec![item(ActionKindConfig::Custom {
            kind: "spin".to_string(),
            params: serde_json::Value::Null,
        })],
        ..Default::default()
    };

    let mut sim = SandboxUnit::new(Vec::new());
    let mut rotation = RotationBuilder::new(&config)
        .with_engine_config(EngineConfig {
            max_actions_per_tick: 10,
            ..EngineConfig::default()
        })
        .with_extensions(&extensions)
        .build(&mut sim);

    let err = rotation.do_next_action(&mut sim).unwrap_err();
    match &err {
        AplError::ActionLoopLimit { limit, action } => {
            assert_eq!(*limit, 10);
            assert_eq!(action, "ACTION = Spin\nCONDITION = None");
        }
        other => panic!("expected loop limit, got {other:?}"),
    }
    assert!(err.to_string().starts_with("[USER_ERROR]"));
    assert_eq!(counter.load(Ordering::SeqCst), 11);
    assert!(rotation.is_halted());

    // Later ticks refuse to run at all
    sim.set_time(SimDuration::from_secs(5));
    assert!(matches!(rotation.do_next_action(&mut sim), Err(AplError::Halted)));
    assert!(matches!(rotation.should_interrupt_channel(&sim), Err(AplError::Halted)));
    assert_eq!(counter.load(Ordering::SeqCst), 11);
}

/// Test 2: The first ready entry wins every tick; an entry that is never
/// ready is never run
#[test]
fn test_priority_scan_skips_unready_entries() {
    let config = parse_rotation_toml(
        r#"
        [[priority_list]]
        action = { type = "cast_spell", spell_id = { spell = { id = 1 } }, condition = { type = "const", val = "false" } }

        [[priority_list]]
        action = { type = "cast_spell", spell_id = { spell = { id = 2 } } }
        "#,
    )
    .unwrap();

    let mut sim = SandboxUnit::new(vec![
        SandboxSpell::instant(1, "Never"),
        SandboxSpell::instant(2, "Always"),
    ])
    .with_fight_length(SimDuration::from_secs(3600));
    let mut rotation = Rotation::new(&config, &mut sim);
    let b = sim.key_of(ActionId::spell(2)).unwrap();

    for tick in 0..1000i64 {
        sim.set_time(SimDuration::from_millis(1500 * tick));
        assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 1);
    }
    assert_eq!(sim.casts().len(), 1000);
    assert!(sim.casts().iter().all(|record| record.spell == b));
}

/// Test 3: Controlling actions must be released in reverse order
#[test]
fn test_controlling_stack_nesting() {
    let (outer, inner) = (ActionKey(0), ActionKey(1));
    let mut stack = ControllingStack::new();
    stack.push(outer);
    stack.push(inner);

    match stack.pop(outer) {
        Err(AplError::ControllingStackMismatch { expected, found }) => {
            assert_eq!(expected, outer);
            assert_eq!(found, Some(inner));
        }
        other => panic!("expected a mismatch, got {other:?}"),
    }

    stack.pop(inner).unwrap();
    stack.pop(outer).unwrap();
    assert!(stack.is_empty());
}

/// Test 4: A strict sequence runs back to back inside one tick
#[test]
fn test_strict_sequence_through_rotation() {
    let config = parse_rotation_toml(
        r#"
        [[priority_list]]
        [priority_list.action]
        type = "strict_sequence"
        actions = [
            { type = "cast_spell", spell_id = { spell = { id = 1 } } },
            { type = "cast_spell", spell_id = { spell = { id = 2 } } },
        ]

        [[priority_list]]
        action = { type = "cast_spell", spell_id = { spell = { id = 3 } } }
        "#,
    )
    .unwrap();

    let mut sim = SandboxUnit::new(vec![
        SandboxSpell::instant(1, "Opener"),
        SandboxSpell::instant(2, "Burst").off_gcd().with_cooldown_ms(30_000),
        SandboxSpell::instant(3, "Filler"),
    ]);
    let mut rotation = Rotation::new(&config, &mut sim);
    let keys: Vec<_> = (1..=3).map(|id| sim.key_of(ActionId::spell(id)).unwrap()).collect();

    // The sequence itself plus both children
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 3);
    assert!(rotation.controlling().is_empty());
    let cast: Vec<_> = sim.casts().iter().map(|record| record.spell).collect();
    assert_eq!(cast, vec![keys[0], keys[1]]);
    assert!(sim.casts().iter().all(|record| record.at == SimDuration::ZERO));

    // Burst is on cooldown, so the sequence is not ready again
    sim.set_time(SimDuration::from_millis(1500));
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 1);
    assert_eq!(sim.casts().last().map(|record| record.spell), Some(keys[2]));
}

/// Test 5: Reset clears per-iteration state so iterations are independent
#[test]
fn test_reset_between_iterations() {
    let config = parse_rotation_toml(
        r#"
        [[priority_list]]
        [priority_list.action]
        type = "sequence"
        name = "opener"
        actions = [
            { type = "cast_spell", spell_id = { spell = { id = 1 } } },
            { type = "cast_spell", spell_id = { spell = { id = 2 } } },
        ]

        [[priority_list]]
        action = { type = "cast_spell", spell_id = { spell = { id = 3 } } }
        "#,
    )
    .unwrap();

    let spells = vec![
        SandboxSpell::instant(1, "First"),
        SandboxSpell::instant(2, "Second"),
        SandboxSpell::instant(3, "Filler"),
    ];
    let mut sim = SandboxUnit::new(spells.clone()).with_fight_length(SimDuration::from_secs(6));
    let mut rotation = Rotation::new(&config, &mut sim);
    sim.run_encounter(&mut rotation).unwrap();
    let first_run: Vec<_> = sim.casts().iter().map(|record| record.spell).collect();

    let mut again = SandboxUnit::new(spells).with_fight_length(SimDuration::from_secs(6));
    again.run_encounter(&mut rotation).unwrap();
    let second_run: Vec<_> = again.casts().iter().map(|record| record.spell).collect();

    assert!(first_run.len() >= 3);
    assert_eq!(first_run, second_run);
    let opener = [
        again.key_of(ActionId::spell(1)).unwrap(),
        again.key_of(ActionId::spell(2)).unwrap(),
    ];
    assert_eq!(&first_run[..2], &opener);
}

/// Test 6: The default limit lets a tick run 1000 actions and halts a
/// runaway spell with its description in the error
#[test]
fn test_default_loop_limit() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut extensions = Extensions::new();
    let burst_count = count.clone();
    extensions.register_action(
        "burst",
        Box::new(move |_params: &serde_json::Value, _ctx: &mut BuildContext<'_>| {
            Some(Box::new(Burst {
                count: burst_count.clone(),
                cap: 1000,
            }) as Box<dyn CustomAction>)
        }),
    );
    let bounded = RotationConfig {
        priority_list: vec![item(ActionKindConfig::Custom {
            kind: "burst".to_string(),
            params: serde_json::Value::Null,
        })],
        ..Default::default()
    };
    let mut sim = SandboxUnit::new(Vec::new());
    let mut rotation = RotationBuilder::new(&bounded)
        .with_engine_config(EngineConfig::default())
        .with_extensions(&extensions)
        .build(&mut sim);
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 1000);
    assert!(!rotation.is_halted());

    let runaway = parse_rotation_toml(
        r#"
        [[priority_list]]
        action = { type = "cast_spell", spell_id = { spell = { id = 1 } } }
        "#,
    )
    .unwrap();
    let mut sim = SandboxUnit::new(vec![SandboxSpell::instant(1, "Spam").off_gcd()]);
    let mut rotation = RotationBuilder::new(&runaway)
        .with_engine_config(EngineConfig::default())
        .build(&mut sim);

    let err = rotation.do_next_action(&mut sim).unwrap_err();
    assert!(matches!(err, AplError::ActionLoopLimit { limit: 1000, .. }));
    let message = err.to_string();
    assert!(message.starts_with("[USER_ERROR] Infinite loop detected after 1000 actions"));
    assert!(message.contains("Cast Spell({SpellID: 1})"));
    assert!(rotation.is_halted());
}

/// Test 7: Nested strict sequences unwind completely and ordinary
/// scanning resumes on the next tick
#[test]
fn test_nested_strict_sequences_release_control() {
    let config = parse_rotation_toml(
        r#"
        [[priority_list]]
        [priority_list.action]
        type = "strict_sequence"
        actions = [
            { type = "cast_spell", spell_id = { spell = { id = 1 } } },
            { type = "strict_sequence", actions = [
                { type = "cast_spell", spell_id = { spell = { id = 2 } } },
                { type = "cast_spell", spell_id = { spell = { id = 3 } } },
            ] },
        ]

        [[priority_list]]
        action = { type = "cast_spell", spell_id = { spell = { id = 4 } } }
        "#,
    )
    .unwrap();

    let mut sim = SandboxUnit::new(vec![
        SandboxSpell::instant(1, "Opener").with_cooldown_ms(30_000),
        SandboxSpell::instant(2, "Burst").off_gcd().with_cooldown_ms(30_000),
        SandboxSpell::instant(3, "Surge").off_gcd().with_cooldown_ms(30_000),
        SandboxSpell::instant(4, "Filler"),
    ]);
    let mut rotation = Rotation::new(&config, &mut sim);
    let keys: Vec<_> = (1..=4).map(|id| sim.key_of(ActionId::spell(id)).unwrap()).collect();

    // Both sequences plus their three casts
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 5);
    assert!(rotation.controlling().is_empty());
    let cast: Vec<_> = sim.casts().iter().map(|record| record.spell).collect();
    assert_eq!(cast, keys[..3].to_vec());

    sim.set_time(SimDuration::from_millis(1500));
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 1);
    assert_eq!(sim.casts().last().map(|record| record.spell), Some(keys[3]));
    assert!(rotation.controlling().is_empty());
}

/// Test 8: A rotation shared through a RefCell is skipped, not re-entered,
/// while a tick holds it
#[test]
fn test_shared_rotation_is_not_reentered() {
    let config = parse_rotation_toml(
        r#"
        [[priority_list]]
        action = { type = "cast_spell", spell_id = { spell = { id = 1 } } }
        "#,
    )
    .unwrap();
    let mut sim = SandboxUnit::new(vec![SandboxSpell::instant(1, "Strike")]);
    let shared = RefCell::new(Rotation::new(&config, &mut sim));

    {
        let running = shared.borrow_mut();
        assert!(shared.try_borrow_mut().is_err());
        drop(running);
    }

    let executed = match shared.try_borrow_mut() {
        Ok(mut rotation) => rotation.do_next_action(&mut sim).unwrap(),
        Err(_) => 0,
    };
    assert_eq!(executed, 1);
    assert_eq!(sim.casts().len(), 1);
}
