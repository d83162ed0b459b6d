use criterion::{black_box, criterion_group, criterion_main, Criterion};

use apl_engine::core::types::ActionId;
use apl_engine::rules::{ActionConfig, ActionKindConfig, ListItem, ValueConfig, ValueKindConfig};
use apl_engine::sim::{SandboxSpell, SandboxUnit};
use apl_engine::value::CompareOp;
use apl_engine::{Rotation, RotationConfig, SimDuration};

const ENTRIES: i32 = 50;

/// Every entry but the last is gated on a condition that stays false
fn deep_rotation() -> RotationConfig {
    let gated = (1..ENTRIES).map(|id| {
        let condition = ValueConfig::new(ValueKindConfig::Compare {
            op: CompareOp::Lt,
            lhs: Box::new(ValueConfig::new(ValueKindConfig::RemainingTime)),
            rhs: Box::new(ValueConfig::constant(format!("-{id}s"))),
        });
        ListItem {
            action: ActionConfig::new(ActionKindConfig::CastSpell {
                spell_id: ActionId::spell(id),
                target: None,
            })
            .with_condition(condition),
            hide: false,
        }
    });
    let filler = ListItem {
        action: ActionConfig::new(ActionKindConfig::CastSpell {
            spell_id: ActionId::spell(ENTRIES),
            target: None,
        }),
        hide: false,
    };
    RotationConfig {
        priority_list: gated.chain(std::iter::once(filler)).collect(),
        ..Default::default()
    }
}

fn spellbook() -> SandboxUnit {
    SandboxUnit::new(
        (1..=ENTRIES)
            .map(|id| SandboxSpell::instant(id, &format!("Spell {id}")))
            .collect(),
    )
}

fn bench_build_rotation(c: &mut Criterion) {
    let config = deep_rotation();
    let mut sim = spellbook();
    c.bench_function("build_rotation_50", |b| {
        b.iter(|| Rotation::new(black_box(&config), &mut sim))
    });
}

fn bench_priority_scan(c: &mut Criterion) {
    let config = deep_rotation();
    let mut sim = spellbook();
    let rotation = Rotation::new(&config, &mut sim);
    c.bench_function("priority_scan_50", |b| {
        b.iter(|| rotation.peek_next_action(black_box(&sim)))
    });
}

fn bench_encounter(c: &mut Criterion) {
    let config = deep_rotation();
    let template = spellbook().with_fight_length(SimDuration::from_secs(180));
    let mut rotation = Rotation::new(&config, &mut template.clone());
    c.bench_function("encounter_180s", |b| {
        b.iter(|| {
            let mut sim = template.clone();
            sim.run_encounter(&mut rotation).map(|_| sim.casts().len())
        })
    });
}

criterion_group!(benches, bench_build_rotation, bench_priority_scan, bench_encounter);
criterion_main!(benches);
