//! Control hand-off state shared by actions during a decision tick

use super::ActionKey;
use crate::core::error::{AplError, Result};

/// Actions that have taken over choosing the next action
///
/// The top entry decides; when it releases control it must pop itself.
#[derive(Debug, Default, Clone)]
pub struct ControllingStack {
    actions: Vec<ActionKey>,
}

impl ControllingStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: ActionKey) {
        self.actions.push(action);
    }

    /// Release control held by `action`, which must be on top
    pub fn pop(&mut self, action: ActionKey) -> Result<()> {
        match self.actions.last() {
            Some(&top) if top == action => {
                self.actions.pop();
                Ok(())
            }
            found => Err(AplError::ControllingStackMismatch {
                expected: action,
                found: found.copied(),
            }),
        }
    }

    /// Controllers from the top of the stack down
    pub fn iter(&self) -> impl Iterator<Item = ActionKey> + '_ {
        self.actions.iter().rev().copied()
    }

    pub fn top(&self) -> Option<ActionKey> {
        self.actions.last().copied()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }
}

/// What the controlling action on top of the stack decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStep {
    /// Run this action next
    Run(ActionKey),
    /// Control was released; fall back to the priority list
    Released,
    /// Nothing to run until the controller is ready to decide
    Hold,
}

/// Interrupt rules armed by the last channel cast
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPolicy {
    /// Channel action whose `interrupt_if` value is consulted
    pub interrupt_if: Option<ActionKey>,
    pub allow_recast: bool,
}

impl ChannelPolicy {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_requires_top() {
        let mut stack = ControllingStack::new();
        stack.push(ActionKey(1));
        stack.push(ActionKey(2));

        let err = stack.pop(ActionKey(1)).unwrap_err();
        assert!(matches!(
            err,
            AplError::ControllingStackMismatch {
                expected: ActionKey(1),
                found: Some(ActionKey(2)),
            }
        ));
        assert_eq!(stack.len(), 2);

        stack.pop(ActionKey(2)).unwrap();
        stack.pop(ActionKey(1)).unwrap();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pop_on_empty_stack() {
        let mut stack = ControllingStack::new();
        assert!(matches!(
            stack.pop(ActionKey(3)),
            Err(AplError::ControllingStackMismatch { found: None, .. })
        ));
    }
}
