//! Storage and dispatch for one rotation's action tree

use super::controlling::{ChannelPolicy, ControlStep, ControllingStack};
use super::group::{Group, GroupState};
use super::{ActionKey, ActionKind, ActionNode, Condition};
use crate::core::error::Result;
use crate::rules::schema::GroupConfig;
use crate::sim::Simulation;
use crate::validation::ValidationSink;
use crate::value::{BuildContext, Value};

/// Follow-up of a composite once its own borrow is released
enum Delegate {
    Child(Option<ActionKey>),
    Rewind(Option<ActionKey>),
    Group(Option<usize>),
}

/// Reference still to resolve after a node's children are finalized
enum Pending {
    Rewind(String),
    StrictSpells,
    Group(String),
}

/// Mutable rotation state an executing action may touch
pub struct ExecContext<'a> {
    pub sim: &'a mut dyn Simulation,
    pub controlling: &'a mut ControllingStack,
    pub channel: &'a mut ChannelPolicy,
}

/// Every action node of one rotation, addressed by [`ActionKey`]
#[derive(Debug, Default)]
pub struct ActionArena {
    nodes: Vec<ActionNode>,
    groups: Vec<Group>,
}

impl ActionArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: ActionNode) -> ActionKey {
        let key = ActionKey(self.nodes.len() as u32);
        self.nodes.push(node);
        key
    }

    pub fn get(&self, key: ActionKey) -> &ActionNode {
        &self.nodes[key.index()]
    }

    pub fn get_mut(&mut self, key: ActionKey) -> &mut ActionNode {
        &mut self.nodes[key.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Register every configured group as pending; the first of several
    /// groups sharing a name wins
    pub fn declare_groups(&mut self, configs: &[GroupConfig]) {
        for config in configs {
            if self.group(&config.name).is_none() {
                self.groups.push(Group {
                    name: config.name.clone(),
                    actions: Vec::new(),
                    state: GroupState::Pending,
                });
            }
        }
    }

    /// Direct sub-actions, following a resolved group reference into the group
    pub fn children(&self, key: ActionKey) -> Vec<ActionKey> {
        match &self.get(key).kind {
            ActionKind::Sequence(sequence) => sequence.actions.clone(),
            ActionKind::StrictSequence(strict) => strict.actions.clone(),
            ActionKind::GroupReference(reference) => reference
                .group
                .map(|index| self.groups[index].actions.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// `roots` and everything reachable from them, each once, depth first
    pub fn all_actions(&self, roots: &[ActionKey]) -> Vec<ActionKey> {
        let mut visited = vec![false; self.nodes.len()];
        let mut out = Vec::new();
        for &root in roots {
            self.collect(root, &mut visited, &mut out);
        }
        out
    }

    fn collect(&self, key: ActionKey, visited: &mut [bool], out: &mut Vec<ActionKey>) {
        if std::mem::replace(&mut visited[key.index()], true) {
            return;
        }
        out.push(key);
        for child in self.children(key) {
            self.collect(child, visited, out);
        }
    }

    /// Every value node held by the given actions, nested ones included
    pub fn values(&self, actions: &[ActionKey]) -> Vec<&Value> {
        actions
            .iter()
            .flat_map(|&key| self.get(key).values())
            .flat_map(Value::walk)
            .collect()
    }

    // === EXECUTION CONTRACT ===

    /// Restore per-iteration state of every node
    pub fn reset_all(&mut self, sim: &dyn Simulation) {
        for node in &mut self.nodes {
            node.reset(sim);
        }
    }

    pub fn is_ready(&self, key: ActionKey, sim: &dyn Simulation) -> bool {
        let node = self.get(key);
        if !node.condition.holds(sim) {
            return false;
        }

        match &node.kind {
            ActionKind::CastSpell(cast) => cast.is_ready(sim),
            ActionKind::ChannelSpell(channel) => channel.cast.is_ready(sim),
            ActionKind::Wait(wait) => wait.is_ready(sim),
            ActionKind::Sequence(sequence) => sequence
                .current()
                .is_some_and(|child| self.is_ready(child, sim)),
            ActionKind::ResetSequence(reset) => reset
                .sequence
                .is_some_and(|target| match &self.get(target).kind {
                    ActionKind::Sequence(sequence) => sequence.cur != 0,
                    _ => false,
                }),
            ActionKind::StrictSequence(strict) => {
                !strict.actions.is_empty()
                    && sim.gcd_ready()
                    && self.is_ready(strict.actions[0], sim)
                    && strict.spells.iter().all(|&spell| sim.spell_is_ready(spell))
            }
            ActionKind::GroupReference(reference) => reference
                .group
                .map(|index| &self.groups[index])
                .filter(|group| group.is_usable())
                .is_some_and(|group| group.actions.iter().any(|&a| self.is_ready(a, sim))),
            ActionKind::ItemSwap(swap) => swap.is_ready(sim),
            ActionKind::Custom(custom) => custom.is_ready(sim),
        }
    }

    /// Perform the action; returns whether its effect was carried out
    pub fn execute(&mut self, key: ActionKey, ctx: &mut ExecContext<'_>) -> Result<bool> {
        tracing::trace!("Executing {} ({})", key, self.get(key).kind.name());

        // Composites pick their child first so the recursion does not
        // overlap the borrow of this node.
        let delegate = match &mut self.nodes[key.index()].kind {
            ActionKind::CastSpell(cast) => return Ok(cast.execute(ctx.sim)),
            ActionKind::ChannelSpell(channel) => {
                let performed = channel.cast.execute(ctx.sim);
                *ctx.channel = ChannelPolicy {
                    interrupt_if: channel.interrupt_if.as_ref().map(|_| key),
                    allow_recast: channel.allow_recast,
                };
                return Ok(performed);
            }
            ActionKind::Wait(wait) => {
                let until = wait.begin(ctx.sim);
                tracing::trace!("Waiting until {}", until);
                ctx.controlling.push(key);
                return Ok(true);
            }
            ActionKind::Sequence(sequence) => {
                let child = sequence.current();
                if child.is_some() {
                    sequence.cur += 1;
                }
                Delegate::Child(child)
            }
            ActionKind::ResetSequence(reset) => Delegate::Rewind(reset.sequence),
            ActionKind::StrictSequence(_) => {
                ctx.controlling.push(key);
                return Ok(true);
            }
            ActionKind::GroupReference(reference) => Delegate::Group(reference.group),
            ActionKind::ItemSwap(swap) => return Ok(swap.execute(ctx.sim)),
            ActionKind::Custom(custom) => return Ok(custom.execute(ctx.sim)),
        };

        let child = match delegate {
            Delegate::Child(child) => child,
            Delegate::Rewind(target) => {
                if let Some(ActionKind::Sequence(sequence)) =
                    target.map(|target| &mut self.nodes[target.index()].kind)
                {
                    sequence.cur = 0;
                }
                return Ok(true);
            }
            Delegate::Group(group) => group.and_then(|index| {
                let sim: &dyn Simulation = &*ctx.sim;
                self.groups[index]
                    .actions
                    .iter()
                    .copied()
                    .find(|&action| self.is_ready(action, sim))
            }),
        };

        match child {
            Some(child) => self.execute(child, ctx),
            None => Ok(false),
        }
    }

    /// Let the controlling action `key` pick the next step, releasing
    /// control when it is done
    pub fn control_step(
        &mut self,
        key: ActionKey,
        controlling: &mut ControllingStack,
        sim: &dyn Simulation,
    ) -> Result<ControlStep> {
        let step = self.peek_control(key, sim);
        match (&mut self.nodes[key.index()].kind, step) {
            (ActionKind::StrictSequence(strict), ControlStep::Run(_)) => {
                strict.cur += 1;
                if strict.cur >= strict.actions.len() {
                    strict.cur = 0;
                    controlling.pop(key)?;
                }
            }
            (ActionKind::StrictSequence(strict), ControlStep::Released) => {
                strict.cur = 0;
                controlling.pop(key)?;
            }
            (_, ControlStep::Released) => controlling.pop(key)?,
            _ => {}
        }
        Ok(step)
    }

    /// What `control_step` would decide, without changing any state
    pub fn peek_control(&self, key: ActionKey, sim: &dyn Simulation) -> ControlStep {
        match &self.get(key).kind {
            ActionKind::StrictSequence(strict) => {
                let child = strict.actions.get(strict.cur).copied();
                match child {
                    Some(child) if self.is_ready(child, sim) => ControlStep::Run(child),
                    _ if sim.gcd_ready() => ControlStep::Released,
                    _ => ControlStep::Hold,
                }
            }
            ActionKind::Wait(wait) if !wait.elapsed(sim) => ControlStep::Hold,
            _ => ControlStep::Released,
        }
    }

    // === FINALIZE ===

    /// Resolve references below `key`; runs once per node
    ///
    /// Group references build their group on first use, so the group's
    /// diagnostics land on the entry that first referenced it.
    pub fn finalize(&mut self, key: ActionKey, ctx: &mut BuildContext<'_>) {
        let children = match &mut self.nodes[key.index()].kind {
            ActionKind::Sequence(sequence) => sequence.actions.clone(),
            ActionKind::StrictSequence(strict) => strict.actions.clone(),
            ActionKind::Custom(custom) => {
                custom.finalize(ctx.sim, ctx.sink);
                Vec::new()
            }
            _ => Vec::new(),
        };
        for child in &children {
            self.finalize(*child, ctx);
        }

        let pending = match &self.get(key).kind {
            ActionKind::ResetSequence(reset) => Pending::Rewind(reset.sequence_name.clone()),
            ActionKind::StrictSequence(_) => Pending::StrictSpells,
            ActionKind::GroupReference(reference) => Pending::Group(reference.group_name.clone()),
            _ => return,
        };

        match pending {
            Pending::Rewind(name) => self.resolve_reset_sequence(key, &name, ctx),
            Pending::StrictSpells => self.collect_strict_spells(key, &children),
            Pending::Group(name) => {
                let group = self.resolve_group(&name, ctx);
                if let ActionKind::GroupReference(reference) = &mut self.nodes[key.index()].kind {
                    reference.group = group;
                }
            }
        }
    }

    fn resolve_reset_sequence(&mut self, key: ActionKey, name: &str, ctx: &mut BuildContext<'_>) {
        let target = self.nodes.iter().position(
            |node| matches!(&node.kind, ActionKind::Sequence(sequence) if sequence.name == name),
        );
        match target {
            Some(index) => {
                if let ActionKind::ResetSequence(reset) = &mut self.nodes[key.index()].kind {
                    reset.sequence = Some(ActionKey(index as u32));
                }
            }
            None => ctx.warn(format!("No sequence with name: '{name}'")),
        }
    }

    fn collect_strict_spells(&mut self, key: ActionKey, children: &[ActionKey]) {
        let spells = children
            .iter()
            .filter_map(|&child| match &self.get(child).kind {
                ActionKind::CastSpell(cast) => Some(cast.spell.key),
                ActionKind::ChannelSpell(channel) => Some(channel.cast.spell.key),
                _ => None,
            })
            .collect();
        if let ActionKind::StrictSequence(strict) = &mut self.nodes[key.index()].kind {
            strict.spells = spells;
        }
    }

    /// Index of the named group, building and finalizing it on first use
    fn resolve_group(&mut self, name: &str, ctx: &mut BuildContext<'_>) -> Option<usize> {
        let configs = ctx.groups();
        let (Some(index), Some(config)) = (
            self.groups.iter().position(|group| group.name == name),
            configs.iter().find(|config| config.name == name),
        ) else {
            ctx.error(format!("Group reference '{name}' not found"));
            return None;
        };

        match self.groups[index].state {
            GroupState::Finalized | GroupState::Broken => return Some(index),
            GroupState::Finalizing => {
                ctx.error(format!("Group reference cycle detected at '{name}'"));
                return None;
            }
            GroupState::Pending => {}
        }

        tracing::debug!("Building group '{}'", name);
        self.groups[index].state = GroupState::Finalizing;
        let actions: Vec<ActionKey> = ctx.with_group_variables(&config.variables, |ctx| {
            config
                .actions
                .iter()
                .filter(|item| !item.hide)
                .filter_map(|item| self.build(&item.action, ctx))
                .collect()
        });
        self.groups[index].actions = actions.clone();

        let tree = self.all_actions(&actions);
        let placeholder = self
            .values(&tree)
            .into_iter()
            .find_map(|value| value.find_placeholder().map(str::to_string));
        if let Some(placeholder) = placeholder {
            ctx.error(format!(
                "Unresolved variable placeholder '{placeholder}' in group '{name}'"
            ));
            self.groups[index].state = GroupState::Broken;
            return Some(index);
        }

        for action in actions {
            self.finalize(action, ctx);
        }
        self.groups[index].state = GroupState::Finalized;
        Some(index)
    }

    /// One-time setup after every entry is finalized; `visited` keeps shared
    /// group contents from being processed twice
    pub fn post_finalize(
        &mut self,
        root: ActionKey,
        sim: &dyn Simulation,
        sink: &mut ValidationSink,
        visited: &mut [bool],
    ) {
        let mut tree = Vec::new();
        self.collect(root, visited, &mut tree);
        for key in tree {
            if let ActionKind::Custom(custom) = &mut self.nodes[key.index()].kind {
                custom.post_finalize(sim, sink);
            }
        }
    }

    // === INTROSPECTION ===

    /// Human-readable summary of one node and its condition
    pub fn describe(&self, key: ActionKey) -> String {
        let node = self.get(key);
        let condition = node
            .condition
            .value()
            .map(ToString::to_string)
            .unwrap_or_else(|| match node.condition {
                Condition::Never => "Invalid".to_string(),
                _ => "None".to_string(),
            });
        format!("ACTION = {}\nCONDITION = {condition}", self.describe_action(key))
    }

    /// One-line summary of the node's effect
    pub fn describe_action(&self, key: ActionKey) -> String {
        match &self.get(key).kind {
            ActionKind::CastSpell(cast) => format!("Cast Spell({})", cast.spell),
            ActionKind::ChannelSpell(channel) => match &channel.interrupt_if {
                Some(interrupt) => format!(
                    "Channel Spell({}, Interrupt If({}))",
                    channel.cast.spell, interrupt
                ),
                None => format!("Channel Spell({})", channel.cast.spell),
            },
            ActionKind::Wait(wait) => format!("Wait({})", wait.duration),
            ActionKind::Sequence(sequence) => format!(
                "Sequence(name = '{}', {} actions)",
                sequence.name,
                sequence.actions.len()
            ),
            ActionKind::ResetSequence(reset) => {
                format!("Reset Sequence(name = '{}')", reset.sequence_name)
            }
            ActionKind::StrictSequence(strict) => {
                format!("Strict Sequence({} actions)", strict.actions.len())
            }
            ActionKind::GroupReference(reference) => {
                format!("Group Reference: {}", reference.group_name)
            }
            ActionKind::ItemSwap(swap) => format!("Item Swap({:?})", swap.set),
            ActionKind::Custom(custom) => custom.describe(),
        }
    }
}
