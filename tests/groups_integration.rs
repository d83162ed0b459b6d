//! Integration tests for named action groups and their references

use apl_engine::action::GroupState;
use apl_engine::core::types::ActionId;
use apl_engine::rules::parse_rotation_toml;
use apl_engine::sim::{SandboxSpell, SandboxUnit};
use apl_engine::{LogLevel, Rotation};

fn unit() -> SandboxUnit {
    SandboxUnit::new(vec![
        SandboxSpell::instant(1, "Strike"),
        SandboxSpell::instant(2, "Cleave"),
        SandboxSpell::instant(3, "Whirlwind"),
    ])
}

fn messages(rotation: &mut Rotation, sim: &SandboxUnit, entry: usize) -> Vec<(LogLevel, String)> {
    rotation.stats(sim).priority_list[entry]
        .validations
        .iter()
        .map(|v| (v.log_level, v.validation.clone()))
        .collect()
}

/// Test 1: A group defined after the list that uses it is resolved lazily
#[test]
fn test_group_reference_runs_group_actions() {
    let config = parse_rotation_toml(
        r#"
        [[priority_list]]
        action = { type = "group_reference", group_name = "aoe" }

        [[priority_list]]
        action = { type = "cast_spell", spell_id = { spell = { id = 1 } } }

        [[groups]]
        name = "aoe"
        actions = [
            { action = { type = "cast_spell", spell_id = { spell = { id = 2 } }, condition = { type = "const", val = "false" } } },
            { action = { type = "cast_spell", spell_id = { spell = { id = 3 } } } },
        ]
        "#,
    )
    .unwrap();

    let mut sim = unit();
    let mut rotation = Rotation::new(&config, &mut sim);
    let group = rotation.arena().group("aoe").unwrap();
    assert_eq!(group.state, GroupState::Finalized);
    assert_eq!(group.actions.len(), 2);
    assert!(messages(&mut rotation, &sim, 0).is_empty());

    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 1);
    let whirlwind = sim.key_of(ActionId::spell(3)).unwrap();
    assert_eq!(sim.casts()[0].spell, whirlwind);

    // Group contents count as rotation actions
    assert_eq!(rotation.all_actions().len(), 4);
}

/// Test 2: Unknown group names are an error on the referencing entry
#[test]
fn test_missing_group() {
    let config = parse_rotation_toml(
        r#"
        [[priority_list]]
        action = { type = "group_reference", group_name = "nope" }
        "#,
    )
    .unwrap();

    let mut sim = unit();
    let mut rotation = Rotation::new(&config, &mut sim);
    assert_eq!(
        messages(&mut rotation, &sim, 0),
        vec![(LogLevel::Error, "Group reference 'nope' not found".to_string())]
    );
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 0);
}

/// Test 3: Groups referencing each other are detected instead of recursing
#[test]
fn test_group_cycle_is_reported() {
    let config = parse_rotation_toml(
        r#"
        [[priority_list]]
        action = { type = "group_reference", group_name = "a" }

        [[groups]]
        name = "a"
        actions = [{ action = { type = "group_reference", group_name = "b" } }]

        [[groups]]
        name = "b"
        actions = [{ action = { type = "group_reference", group_name = "a" } }]
        "#,
    )
    .unwrap();

    let mut sim = unit();
    let mut rotation = Rotation::new(&config, &mut sim);
    let found = messages(&mut rotation, &sim, 0);
    assert!(found.contains(&(
        LogLevel::Error,
        "Group reference cycle detected at 'a'".to_string()
    )));
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 0);
}

/// Test 4: Placeholders take the group's variables; a leftover one breaks the group
#[test]
fn test_group_placeholders() {
    let config = parse_rotation_toml(
        r#"
        [[priority_list]]
        action = { type = "group_reference", group_name = "filled" }

        [[priority_list]]
        action = { type = "group_reference", group_name = "unfilled" }

        [[groups]]
        name = "filled"
        actions = [{ action = { type = "cast_spell", spell_id = { spell = { id = 2 } }, condition = { type = "variable_placeholder", name = "burst" } } }]
        variables = [{ name = "burst", value = { type = "const", val = "false" } }]

        [[groups]]
        name = "unfilled"
        actions = [{ action = { type = "cast_spell", spell_id = { spell = { id = 3 } }, condition = { type = "variable_placeholder", name = "burst" } } }]
        "#,
    )
    .unwrap();

    let mut sim = unit();
    let mut rotation = Rotation::new(&config, &mut sim);
    assert!(messages(&mut rotation, &sim, 0).is_empty());
    assert_eq!(rotation.arena().group("filled").unwrap().state, GroupState::Finalized);

    assert_eq!(
        messages(&mut rotation, &sim, 1),
        vec![(
            LogLevel::Error,
            "Unresolved variable placeholder 'burst' in group 'unfilled'".to_string()
        )]
    );
    assert_eq!(rotation.arena().group("unfilled").unwrap().state, GroupState::Broken);

    // Neither group has a usable action
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 0);
}

/// Test 5: Overrides are reported and the group is used unchanged
#[test]
fn test_variable_overrides_are_not_applied() {
    let config = parse_rotation_toml(
        r#"
        [[priority_list]]
        action = { type = "group_reference", group_name = "st", variable_overrides = { target = "2" } }

        [[groups]]
        name = "st"
        actions = [{ action = { type = "cast_spell", spell_id = { spell = { id = 1 } } } }]
        "#,
    )
    .unwrap();

    let mut sim = unit();
    let mut rotation = Rotation::new(&config, &mut sim);
    assert_eq!(
        messages(&mut rotation, &sim, 0),
        vec![(
            LogLevel::Warning,
            "Variable overrides not yet implemented for group 'st'".to_string()
        )]
    );
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 1);
}

/// Test 6: A group shared by two entries is built once; its diagnostics
/// land on the first entry that referenced it
#[test]
fn test_shared_group_built_once() {
    let config = parse_rotation_toml(
        r#"
        [[priority_list]]
        action = { type = "group_reference", group_name = "shared" }

        [[priority_list]]
        action = { type = "group_reference", group_name = "shared" }

        [[groups]]
        name = "shared"
        actions = [{ action = { type = "cast_spell", spell_id = { spell = { id = 99 } } } }]

        [[groups]]
        name = "shared"
        actions = [{ action = { type = "cast_spell", spell_id = { spell = { id = 1 } } } }]
        "#,
    )
    .unwrap();

    let mut sim = unit();
    let mut rotation = Rotation::new(&config, &mut sim);
    assert_eq!(rotation.arena().groups().len(), 1);
    assert_eq!(messages(&mut rotation, &sim, 0).len(), 1);
    assert!(messages(&mut rotation, &sim, 1).is_empty());

    // First definition wins, and its only action was rejected
    assert_eq!(rotation.do_next_action(&mut sim).unwrap(), 0);
}
