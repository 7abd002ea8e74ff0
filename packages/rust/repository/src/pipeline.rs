//! Ordered side-effecting steps with rollback.
//!
//! Each [`Action`] has a forward step and an optional backward step. When a
//! forward step fails, every action that already completed is rolled back in
//! reverse order and the original error is returned.

use carton_shared::Result;
use tracing::{debug, warn};

/// One named step of a [`Pipeline`] over a shared context `C`.
pub struct Action<C> {
    pub name: &'static str,
    pub forward: fn(&mut C) -> Result<()>,
    pub backward: Option<fn(&mut C)>,
}

/// Runs actions in order, undoing completed ones on failure.
pub struct Pipeline<C> {
    actions: Vec<Action<C>>,
}

impl<C> Pipeline<C> {
    pub fn new(actions: Vec<Action<C>>) -> Self {
        Self { actions }
    }

    /// Names of the actions, in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.actions.iter().map(|a| a.name).collect()
    }

    pub fn execute(&self, ctx: &mut C) -> Result<()> {
        for (done, action) in self.actions.iter().enumerate() {
            debug!(action = action.name, "running action");
            if let Err(err) = (action.forward)(ctx) {
                warn!(action = action.name, error = %err, "action failed, rolling back");
                // the failing action may have left partial state too
                for prior in self.actions[..=done].iter().rev() {
                    if let Some(backward) = prior.backward {
                        debug!(action = prior.name, "rolling back action");
                        backward(ctx);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}
