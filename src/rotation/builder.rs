//! Rotation construction: parse, finalize and shape

use super::prepull::{PrepullStep, PrepullStepKind};
use super::Rotation;
use crate::action::{ActionArena, ChannelPolicy, ControllingStack};
use crate::core::config::{self as engine, EngineConfig};
use crate::core::types::SimDuration;
use crate::rules::schema::RotationConfig;
use crate::rules::Extensions;
use crate::sim::Simulation;
use crate::validation::{EntryValidations, Phase, ValidationSink};
use crate::value::BuildContext;

const INVALID_DO_AT: &str = "Invalid time for 'Do At', ignoring this Prepull Action";

/// Builder for a [`Rotation`]
///
/// # Example
///
/// ```ignore
/// let rotation = RotationBuilder::new(&config)
///     .with_engine_config(EngineConfig::default())
///     .build(&mut unit);
/// ```
pub struct RotationBuilder<'a> {
    config: &'a RotationConfig,
    engine_config: Option<EngineConfig>,
    extensions: Option<&'a Extensions>,
}

impl<'a> RotationBuilder<'a> {
    pub fn new(config: &'a RotationConfig) -> Self {
        Self {
            config,
            engine_config: None,
            extensions: None,
        }
    }

    /// Override the process-wide engine config for this unit
    pub fn with_engine_config(mut self, engine_config: EngineConfig) -> Self {
        self.engine_config = Some(engine_config);
        self
    }

    pub fn with_extensions(mut self, extensions: &'a Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn build(self, sim: &mut dyn Simulation) -> Rotation {
        let config = self.config;
        let engine_config = self.engine_config.unwrap_or_else(|| engine::config().clone());
        let default_extensions = Extensions::default();
        let extensions = self.extensions.unwrap_or(&default_extensions);

        let mut arena = ActionArena::new();
        arena.declare_groups(&config.groups);
        let mut sink = ValidationSink::new();
        let mut prepull_validations = vec![EntryValidations::default(); config.prepull_actions.len()];
        let mut priority_validations = vec![EntryValidations::default(); config.priority_list.len()];
        let mut prepull_actions = Vec::new();
        let mut priority_list = Vec::new();
        let mut prepull_steps = Vec::new();

        {
            let mut ctx = BuildContext::new(&*sim, &mut sink, &config.value_variables, extensions)
                .with_groups(&config.groups);

            // === PARSE ===
            ctx.set_parsing_prepull(true);
            for (entry, item) in config.prepull_actions.iter().enumerate() {
                if !item.hide {
                    let do_at = item
                        .do_at_value
                        .as_ref()
                        .and_then(|value| ctx.build_value(value))
                        .map(|value| value.get_duration(ctx.sim));
                    match do_at {
                        Some(do_at) if do_at < SimDuration::ZERO => {
                            if let Some(action) = arena.build(&item.action, &mut ctx) {
                                prepull_actions.push((entry, action));
                                prepull_steps.push(PrepullStep {
                                    do_at,
                                    kind: PrepullStepKind::Action { entry, action },
                                });
                            }
                        }
                        _ => ctx.warn(INVALID_DO_AT),
                    }
                }
                prepull_validations[entry].record(Phase::Parse, ctx.sink.take_current());
            }

            ctx.set_parsing_prepull(false);
            for (entry, item) in config.priority_list.iter().enumerate() {
                if !item.hide {
                    if let Some(action) = arena.build(&item.action, &mut ctx) {
                        priority_list.push((entry, action));
                    }
                }
                priority_validations[entry].record(Phase::Parse, ctx.sink.take_current());
            }

            // === FINALIZE ===
            ctx.set_parsing_prepull(true);
            for &(entry, action) in &prepull_actions {
                arena.finalize(action, &mut ctx);
                prepull_validations[entry].record(Phase::Finalize, ctx.sink.take_current());
            }
            ctx.set_parsing_prepull(false);
            for &(entry, action) in &priority_list {
                arena.finalize(action, &mut ctx);
                priority_validations[entry].record(Phase::Finalize, ctx.sink.take_current());
            }
        }

        tracing::debug!(
            "Built rotation: {} prepull actions, {} priority actions, {} nodes",
            prepull_actions.len(),
            priority_list.len(),
            arena.len()
        );

        let mut rotation = Rotation {
            config: engine_config,
            arena,
            prepull_actions,
            priority_list,
            prepull_steps,
            controlling: ControllingStack::new(),
            channel: ChannelPolicy::default(),
            sink,
            prepull_validations,
            priority_validations,
            post_finalized: false,
            halted: false,
        };
        rotation.apply_shaping(sim);
        rotation
    }
}
