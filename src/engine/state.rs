//! Engine state and the host function table.
//!
//! [`EngineState`] owns every mutable resource a pass touches: variables,
//! inventory, statuses, event flags, the trigger queue, the random source
//! and the end state. Actions mutate it directly; compiled expressions read
//! it through [`FunctionTable`].

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::core::{
    EngineConfig, EvalError, GameRng, Notification, NotificationQueue, RandomSource, Variable,
    VariableStore,
};
use crate::effects::{
    AttributeRegistry, CombinedModifiers, EffectProvider, Inventory, ProviderCatalog,
    StatusTable,
};
use crate::expr::{Arg, Arity, FunctionTable};
use crate::triggers::{EventRegistry, TriggerId, TriggerQueue};

/// Host functions every engine registers with its compiler. Each takes one
/// quoted id.
pub const HOST_FUNCTIONS: &[(&str, Arity)] = &[
    ("has", Arity::Exact(1)),
    ("item", Arity::Exact(1)),
    ("status", Arity::Exact(1)),
    ("hasStatus", Arity::Exact(1)),
    ("effect", Arity::Exact(1)),
    ("attribute", Arity::Exact(1)),
    ("occurrences", Arity::Exact(1)),
    ("enabled", Arity::Exact(1)),
    ("lowerBound", Arity::Exact(1)),
    ("upperBound", Arity::Exact(1)),
];

/// Terminal state set by an `EndGame` action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndState {
    pub outcome: Option<String>,
}

/// Everything a pass reads and mutates.
pub struct EngineState {
    config: EngineConfig,
    pub(crate) variables: VariableStore,
    pub(crate) attributes: AttributeRegistry,
    pub(crate) items: ProviderCatalog,
    pub(crate) status_kinds: ProviderCatalog,
    pub(crate) inventory: Inventory,
    pub(crate) statuses: StatusTable,
    pub(crate) registry: EventRegistry,
    pub(crate) queue: TriggerQueue,
    pub(crate) rng: Box<dyn RandomSource>,
    pub(crate) end_state: Option<EndState>,
    pub(crate) notifications: NotificationQueue,
    /// Targets whose modifiers are being combined, for cycle detection.
    combining: RefCell<SmallVec<[String; 4]>>,
}

impl EngineState {
    /// Create an empty state seeded from the config.
    pub fn new(config: EngineConfig) -> Self {
        let rng = Box::new(GameRng::new(config.seed.clone()));
        Self::with_rng(config, rng)
    }

    /// Create an empty state with a custom random source.
    pub fn with_rng(config: EngineConfig, rng: Box<dyn RandomSource>) -> Self {
        Self {
            inventory: Inventory::new(config.max_item_stack),
            config,
            variables: VariableStore::new(),
            attributes: AttributeRegistry::new(),
            items: ProviderCatalog::new(),
            status_kinds: ProviderCatalog::new(),
            statuses: StatusTable::new(),
            registry: EventRegistry::new(),
            queue: TriggerQueue::new(),
            rng,
            end_state: None,
            notifications: NotificationQueue::new(),
            combining: RefCell::new(SmallVec::new()),
        }
    }

    // === Accessors ===

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    #[must_use]
    pub fn attributes(&self) -> &AttributeRegistry {
        &self.attributes
    }

    #[must_use]
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    #[must_use]
    pub fn statuses(&self) -> &StatusTable {
        &self.statuses
    }

    #[must_use]
    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    #[must_use]
    pub fn queue(&self) -> &TriggerQueue {
        &self.queue
    }

    #[must_use]
    pub fn end_state(&self) -> Option<&EndState> {
        self.end_state.as_ref()
    }

    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.end_state.is_some()
    }

    /// The random source.
    pub fn rng(&mut self) -> &mut dyn RandomSource {
        self.rng.as_mut()
    }

    // === Definitions ===

    /// Declare (or redeclare) a variable.
    pub fn define_variable(&mut self, id: impl Into<String>, variable: Variable) {
        self.variables.define(id, variable);
    }

    // === Derived values ===

    /// Combine the modifiers of every held item, then every active status.
    pub fn combined(&self, target: &str) -> Result<CombinedModifiers, EvalError> {
        if self.combining.borrow().iter().any(|t| t == target) {
            return Err(EvalError::ModifierCycle(target.to_string()));
        }
        self.combining.borrow_mut().push(target.to_string());
        let sources = self.inventory.sources().chain(self.statuses.sources());
        let result = CombinedModifiers::collect(sources, target, self);
        self.combining.borrow_mut().pop();
        result
    }

    /// Derived value of a registered attribute.
    pub fn attribute_value(&self, id: &str) -> Result<f64, EvalError> {
        let attribute = self
            .attributes
            .get(id)
            .ok_or_else(|| EvalError::UnknownAttribute(id.to_string()))?;
        Ok(self.combined(id)?.apply(attribute))
    }

    /// Combined value of a plain effect id.
    pub fn effect_value(&self, id: &str) -> Result<f64, EvalError> {
        Ok(self.combined(id)?.effect_value())
    }

    // === Mutations ===

    /// Set a variable, clamped to its bounds.
    pub fn set_variable(&mut self, id: &str, value: f64) -> Result<(), EvalError> {
        let (old, new) = self.variables.set(id, value)?;
        if old != new {
            self.notifications.push(Notification::VariableChanged {
                id: id.to_string(),
                old,
                new,
            });
        }
        Ok(())
    }

    /// Replace a variable's bounds and re-clamp its value.
    pub fn set_variable_bounds(
        &mut self,
        id: &str,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<(), EvalError> {
        let (old, new) = self.variables.set_bounds(id, min, max)?;
        if let Some(variable) = self.variables.get(id) {
            self.notifications.push(Notification::VariableLimitsChanged {
                id: id.to_string(),
                min: variable.min,
                max: variable.max,
            });
        }
        if old != new {
            self.notifications.push(Notification::VariableChanged {
                id: id.to_string(),
                old,
                new,
            });
        }
        Ok(())
    }

    /// Give (or with a negative amount, take) items.
    ///
    /// Fractional amounts are truncated toward zero.
    pub fn give_item(&mut self, id: &str, amount: f64) -> Result<(), EvalError> {
        let provider = self
            .items
            .get(id)
            .cloned()
            .ok_or_else(|| EvalError::UnknownItem(id.to_string()))?;
        // `as` saturates, so infinite amounts fill or empty the stack
        let (old, new) = self.inventory.add(&provider, amount.trunc() as i64);
        if old != new {
            self.notifications.push(Notification::ItemChanged {
                id: id.to_string(),
                old,
                new,
            });
        }
        Ok(())
    }

    /// Apply, refresh or (with a non-positive duration) remove a status.
    pub fn set_status(&mut self, id: &str, duration: f64) -> Result<(), EvalError> {
        let provider = self
            .status_kinds
            .get(id)
            .cloned()
            .ok_or_else(|| EvalError::UnknownStatus(id.to_string()))?;
        let was_active = self.statuses.contains(id);
        let remaining = self.statuses.set(&provider, duration);
        if remaining.is_some() || was_active {
            self.notifications.push(Notification::StatusChanged {
                id: id.to_string(),
                remaining,
            });
        }
        Ok(())
    }

    /// Advance status durations by one tick.
    pub fn tick_statuses(&mut self) -> Vec<String> {
        let expired = self.statuses.tick();
        for id in &expired {
            self.notifications.push(Notification::StatusChanged {
                id: id.clone(),
                remaining: None,
            });
        }
        expired
    }

    /// Enqueue a trigger.
    pub fn enqueue(&mut self, trigger: TriggerId, priority: i32, probability: f64) {
        let seq = self.queue.push(trigger.clone(), priority, probability);
        debug!(%trigger, priority, probability, seq, "trigger enqueued");
    }

    /// Enable or disable an event.
    pub fn set_event_enabled(&mut self, id: &str, enabled: bool) -> Result<(), EvalError> {
        let previous = self.registry.set_enabled(id, enabled)?;
        if previous != enabled {
            self.notifications.push(Notification::EventToggled {
                event: id.to_string(),
                enabled,
            });
        }
        Ok(())
    }

    /// Enter the end state. The running pass stops after the current event.
    pub fn end_game(&mut self, outcome: Option<String>) {
        debug!(?outcome, "game ended");
        self.notifications.push(Notification::GameEnded {
            outcome: outcome.clone(),
        });
        self.end_state = Some(EndState { outcome });
    }

    fn require_variable(&self, id: &str) -> Result<&Variable, EvalError> {
        self.variables
            .get(id)
            .ok_or_else(|| EvalError::UnknownVariable(id.to_string()))
    }

    fn require_item(&self, id: &str) -> Result<(), EvalError> {
        if self.items.contains(id) {
            Ok(())
        } else {
            Err(EvalError::UnknownItem(id.to_string()))
        }
    }

    fn require_status(&self, id: &str) -> Result<(), EvalError> {
        if self.status_kinds.contains(id) {
            Ok(())
        } else {
            Err(EvalError::UnknownStatus(id.to_string()))
        }
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// The single quoted id every host function takes.
fn id_arg<'a>(function: &str, args: &[Arg<'a>]) -> Result<&'a str, EvalError> {
    match args {
        [Arg::Text(id)] => Ok(id),
        _ => Err(EvalError::HostFunction {
            function: function.to_string(),
            message: "expects one quoted id".to_string(),
        }),
    }
}

impl FunctionTable for EngineState {
    /// Variables first, then derived attributes.
    fn variable(&self, name: &str) -> Result<f64, EvalError> {
        if let Some(variable) = self.variables.get(name) {
            return Ok(variable.value);
        }
        if self.attributes.contains(name) {
            return self.attribute_value(name);
        }
        Err(EvalError::UnknownVariable(name.to_string()))
    }

    fn call(&self, function: &str, args: &[Arg<'_>]) -> Result<f64, EvalError> {
        let id = id_arg(function, args)?;
        match function {
            "has" => Ok(flag(self.variables.contains(id))),
            "item" => {
                self.require_item(id)?;
                Ok(f64::from(self.inventory.count(id)))
            }
            "status" => {
                self.require_status(id)?;
                Ok(self.statuses.remaining(id).unwrap_or(0.0))
            }
            "hasStatus" => {
                self.require_status(id)?;
                Ok(flag(self.statuses.contains(id)))
            }
            "effect" => self.effect_value(id),
            "attribute" => self.attribute_value(id),
            "occurrences" => Ok(f64::from(self.registry.occurrences(id)?)),
            "enabled" => Ok(flag(self.registry.is_enabled(id)?)),
            "lowerBound" => Ok(self.require_variable(id)?.min),
            "upperBound" => Ok(self.require_variable(id)?.max),
            other => Err(EvalError::HostFunction {
                function: other.to_string(),
                message: "not provided by this engine".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::effects::{Attribute, Modifier, ModifierKind};

    fn state() -> EngineState {
        let mut state = EngineState::new(EngineConfig::default().with_max_item_stack(5));
        state.define_variable("gold", Variable::bounded(10.0, 0.0, 100.0));
        state
            .attributes
            .register(Attribute::new("strength", 100.0, 0.0, 200.0));
        state.items.register(
            EffectProvider::new("sword")
                .with_modifier(Modifier::constant("strength", ModifierKind::Absolute, 10.0)),
        );
        state.items.register(
            EffectProvider::new("crown")
                .with_modifier(Modifier::constant("strength", ModifierKind::Assignment, 1.0)),
        );
        state.status_kinds.register(
            EffectProvider::new("blessed")
                .with_modifier(Modifier::constant("strength", ModifierKind::Assignment, 2.0)),
        );
        state
    }

    #[test]
    fn test_variable_then_attribute() {
        let mut state = state();
        assert_eq!(state.variable("gold").unwrap(), 10.0);
        assert_eq!(state.variable("strength").unwrap(), 100.0);

        state.give_item("sword", 2.0).unwrap();
        assert_eq!(state.variable("strength").unwrap(), 120.0);
        assert!(matches!(
            state.variable("charisma"),
            Err(EvalError::UnknownVariable(_))
        ));
    }

    #[test]
    fn test_assignment_tie_break_follows_iteration_order() {
        let mut state = state();
        state.set_status("blessed", 3.0).unwrap();
        state.give_item("crown", 1.0).unwrap();

        // Inventory is visited before statuses
        assert_eq!(state.attribute_value("strength").unwrap(), 1.0);

        state.give_item("crown", -1.0).unwrap();
        assert_eq!(state.attribute_value("strength").unwrap(), 2.0);
    }

    #[test]
    fn test_host_functions() {
        let mut state = state();
        state.give_item("sword", 7.0).unwrap();
        state.set_status("blessed", f64::INFINITY).unwrap();

        assert_eq!(state.call("item", &[Arg::Text("sword")]).unwrap(), 5.0);
        assert_eq!(state.call("has", &[Arg::Text("gold")]).unwrap(), 1.0);
        assert_eq!(state.call("has", &[Arg::Text("silver")]).unwrap(), 0.0);
        assert_eq!(state.call("status", &[Arg::Text("blessed")]).unwrap(), f64::INFINITY);
        assert_eq!(state.call("hasStatus", &[Arg::Text("blessed")]).unwrap(), 1.0);
        assert_eq!(state.call("upperBound", &[Arg::Text("gold")]).unwrap(), 100.0);
        assert!(matches!(
            state.call("item", &[Arg::Number(1.0)]),
            Err(EvalError::HostFunction { .. })
        ));
        assert!(matches!(
            state.call("item", &[Arg::Text("shield")]),
            Err(EvalError::UnknownItem(_))
        ));
    }

    #[test]
    fn test_notifications_only_on_change() {
        let mut state = state();
        state.set_variable("gold", 10.0).unwrap();
        assert!(state.notifications.is_empty());

        state.set_variable("gold", 500.0).unwrap();
        assert_eq!(
            state.notifications.drain(),
            vec![Notification::VariableChanged {
                id: "gold".to_string(),
                old: 10.0,
                new: 100.0,
            }]
        );
    }

    #[test]
    fn test_modifier_cycle_is_an_error() {
        let mut state = state();
        let mut compiler = crate::expr::ExpressionCompiler::new();
        let amount = compiler.compile("strength").unwrap();
        state.items.register(
            EffectProvider::new("mirror")
                .with_modifier(Modifier::new("strength", ModifierKind::Absolute, Rc::clone(&amount))),
        );
        state.give_item("mirror", 1.0).unwrap();

        assert!(matches!(
            state.attribute_value("strength"),
            Err(EvalError::ModifierCycle(target)) if target == "strength"
        ));
    }
}
