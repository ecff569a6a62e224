//! Save/restore of runtime state.
//!
//! A save captures what content mutates: variables (value and bounds), item
//! stacks, active statuses, event flags, the random source position and the
//! end state. Definitions are not saved; a save is restored into an engine
//! loaded with the same content.
//!
//! Non-finite numbers are written as `"Infinity"`, `"-Infinity"` or `"NaN"`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{
    valid_bounds, PersistedNumber, PersistedVariable, RngSnapshot, UsageError, Variable,
};
use crate::triggers::{EventFlags, EventId};

use super::state::{EndState, EngineState};

/// Persisted runtime state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveState {
    /// Id to value, or to `[value, lower, upper]` for bounded variables.
    pub variables: BTreeMap<String, PersistedVariable>,
    /// `(id, count)` in inventory order.
    pub inventory: Vec<(String, u32)>,
    /// `(id, remaining)` in table order.
    pub statuses: Vec<(String, PersistedNumber)>,
    /// Event flags in registration order.
    pub events: Vec<(EventId, EventFlags)>,
    pub rng: RngSnapshot,
    #[serde(default)]
    pub end_state: Option<EndState>,
}

impl SaveState {
    /// Capture the runtime state.
    pub fn capture(state: &EngineState) -> Self {
        Self {
            variables: state
                .variables
                .iter()
                .map(|(id, variable)| (id.to_string(), PersistedVariable::from(*variable)))
                .collect(),
            inventory: state
                .inventory
                .iter()
                .map(|stack| (stack.provider.id.clone(), stack.count))
                .collect(),
            statuses: state
                .statuses
                .iter()
                .map(|entry| (entry.provider.id.clone(), PersistedNumber(entry.remaining)))
                .collect(),
            events: state.registry.snapshot(),
            rng: state.rng.snapshot(),
            end_state: state.end_state.clone(),
        }
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Apply this save to a state loaded with the same content.
    ///
    /// Every id is checked before anything is changed, so a rejected save
    /// leaves the state untouched.
    pub fn apply(&self, state: &mut EngineState) -> Result<(), UsageError> {
        self.check(state)?;

        for (id, persisted) in &self.variables {
            state.variables.define(id.clone(), Variable::from(persisted.clone()));
        }

        state.inventory.clear();
        for (id, count) in &self.inventory {
            if let Some(provider) = state.items.get(id).cloned() {
                state.inventory.set(&provider, *count);
            }
        }

        state.statuses.clear();
        for (id, remaining) in &self.statuses {
            if let Some(provider) = state.status_kinds.get(id).cloned() {
                state.statuses.set(&provider, remaining.get());
            }
        }

        state.registry.restore(&self.events)?;
        state.rng.restore(&self.rng);
        state.end_state = self.end_state.clone();
        Ok(())
    }

    fn check(&self, state: &EngineState) -> Result<(), UsageError> {
        let incompatible = |kind: &str, id: &str| {
            Err(UsageError::IncompatibleSave(format!("unknown {kind} `{id}`")))
        };
        if let Some(id) = self.variables.keys().find(|id| !state.variables.contains(id)) {
            return incompatible("variable", id);
        }
        for (id, persisted) in &self.variables {
            if let PersistedVariable::Bounded(_, min, max) = persisted {
                if !valid_bounds(min.get(), max.get()) {
                    return Err(UsageError::IncompatibleSave(format!(
                        "variable `{id}` has invalid bounds [{}, {}]",
                        min.get(),
                        max.get()
                    )));
                }
            }
        }
        if let Some((id, _)) = self.inventory.iter().find(|(id, _)| !state.items.contains(id)) {
            return incompatible("item", id);
        }
        if let Some((id, _)) = self
            .statuses
            .iter()
            .find(|(id, _)| !state.status_kinds.contains(id))
        {
            return incompatible("status", id);
        }
        if let Some((id, _)) = self.events.iter().find(|(id, _)| state.registry.get(id.as_str()).is_none()) {
            return incompatible("event", id.as_str());
        }
        Ok(())
    }
}
