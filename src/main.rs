//! APL Engine - Runner
//!
//! Loads a rotation and a sandbox spellbook, runs independent encounter
//! iterations in parallel and prints a JSON report of casts and diagnostics.

use std::collections::BTreeMap;
use std::path::PathBuf;

use apl_engine::core::error::Result;
use apl_engine::rules::{load_rotation, load_sandbox};
use apl_engine::sim::SandboxUnit;
use apl_engine::{Rotation, RotationStats, SimDuration};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Run a rotation against the sandbox unit and report what it did
#[derive(Parser, Debug)]
#[command(name = "apl-engine")]
#[command(about = "Run an action priority list against a sandbox unit")]
struct Args {
    /// Rotation file (.toml or .json)
    #[arg(long)]
    rotation: PathBuf,

    /// Sandbox spellbook file (.toml)
    #[arg(long, default_value = "data/sandbox/spellbook.toml")]
    spellbook: PathBuf,

    /// Number of independent iterations
    #[arg(long, default_value_t = 100)]
    iterations: u32,

    /// Random seed for deterministic reaction-time jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum reaction-time jitter in milliseconds
    #[arg(long, default_value_t = 50)]
    jitter_ms: i64,
}

/// JSON output structure
#[derive(Serialize)]
struct Report {
    seed: u64,
    iterations: u32,
    /// Average casts per iteration, by spell label
    average_casts: BTreeMap<String, f64>,
    failed_iterations: usize,
    diagnostics: RotationStats,
}

struct IterationResult {
    casts: BTreeMap<String, usize>,
    failed: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("apl_engine=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let rotation_config = load_rotation(&args.rotation)?;
    let sandbox_config = load_sandbox(&args.spellbook)?;
    tracing::info!(
        "Running {} iterations of {} (seed {})",
        args.iterations,
        args.rotation.display(),
        seed
    );

    // Diagnostics do not depend on the iteration, so they come from one
    // reference unit with a prepull preview on a scratch copy.
    let mut reference = SandboxUnit::from_config(&sandbox_config);
    let mut rotation = Rotation::new(&rotation_config, &mut reference);
    let mut scratch = SandboxUnit::from_config(&sandbox_config);
    rotation.preview_prepull(&mut scratch)?;
    let diagnostics = rotation.stats(&reference);

    let results: Vec<IterationResult> = (0..args.iterations)
        .into_par_iter()
        .map(|i| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(u64::from(i)));
            let jitter = rng.gen_range(0..=args.jitter_ms.max(0));
            let base = SimDuration::from_millis(sandbox_config.reaction_ms);

            let mut unit = SandboxUnit::from_config(&sandbox_config)
                .with_reaction_time(base + SimDuration::from_millis(jitter));
            let mut rotation = Rotation::new(&rotation_config, &mut unit);
            let failed = match unit.run_encounter(&mut rotation) {
                Ok(()) => false,
                Err(e) => {
                    tracing::error!("Iteration {} aborted: {}", i, e);
                    true
                }
            };

            let mut casts = BTreeMap::new();
            for record in unit.casts() {
                let label = unit
                    .spell_label(record.spell)
                    .unwrap_or("unknown")
                    .to_string();
                *casts.entry(label).or_insert(0) += 1;
            }
            IterationResult { casts, failed }
        })
        .collect();

    let mut totals: BTreeMap<String, usize> = BTreeMap::new();
    for result in &results {
        for (label, count) in &result.casts {
            *totals.entry(label.clone()).or_insert(0) += count;
        }
    }
    let iterations = f64::from(args.iterations.max(1));
    let report = Report {
        seed,
        iterations: args.iterations,
        average_casts: totals
            .into_iter()
            .map(|(label, total)| (label, total as f64 / iterations))
            .collect(),
        failed_iterations: results.iter().filter(|r| r.failed).count(),
        diagnostics,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
