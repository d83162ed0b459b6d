//! The shipped rotations build cleanly against the shipped spellbook

use std::fs;
use std::path::{Path, PathBuf};

use apl_engine::rules::load_sandbox;
use apl_engine::{load_rotation, LogLevel, Rotation, SandboxUnit};

fn data(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join(relative)
}

/// Test 1: Every bundled rotation builds without errors and casts something
#[test]
fn test_bundled_rotations_run() {
    let sandbox = load_sandbox(&data("sandbox/spellbook.toml")).unwrap();

    for entry in fs::read_dir(data("rotations")).unwrap() {
        let path = entry.unwrap().path();
        let config = load_rotation(&path).unwrap();

        let mut unit = SandboxUnit::from_config(&sandbox);
        let mut rotation = Rotation::new(&config, &mut unit);
        let mut scratch = SandboxUnit::from_config(&sandbox);
        rotation.preview_prepull(&mut scratch).unwrap();

        let stats = rotation.stats(&unit);
        let errors: Vec<_> = stats
            .all_validations()
            .filter(|v| v.log_level == LogLevel::Error)
            .map(|v| v.validation.clone())
            .collect();
        assert!(errors.is_empty(), "{}: {errors:?}", path.display());

        unit.run_encounter(&mut rotation).unwrap();
        assert!(!unit.casts().is_empty(), "{} never cast", path.display());
    }
}
