//! The engine: definitions, the trigger scheduler and save/restore.
//!
//! [`Engine`] owns the [`EngineState`], the expression compiler and the
//! [`UiProxy`]. Hosts enqueue triggers with [`Engine::trigger`] and drive
//! them from one cooperative loop with [`Engine::process_next_trigger`] or
//! [`Engine::run_until_idle`].
//!
//! ## Pass semantics
//!
//! A pass pops one pending trigger (priority descending, then insertion
//! order), gates it on its probability, then walks the trigger's events in
//! registration order. An event is skipped if it is disabled, excluded
//! earlier in the pass, fails a condition or fails its own probability
//! gate. Otherwise its occurrence count goes up, its exclusions join the
//! pass's exclusion set, its actions run, and a `once` event is disabled.
//! The pass stops early after any event that ends the game.
//!
//! ## Example Usage
//!
//! ```
//! use futures_util::FutureExt;
//! use rust_rules::actions::HeadlessUi;
//! use rust_rules::core::{EngineConfig, Variable};
//! use rust_rules::engine::Engine;
//! use rust_rules::triggers::Event;
//! use rust_rules::actions::Action;
//!
//! let mut engine = Engine::new(EngineConfig::default(), HeadlessUi);
//! engine.define_variable("day", Variable::new(1.0)).unwrap();
//!
//! let next_day = engine.compile("day + 1").unwrap();
//! engine
//!     .register_event(Event::new("sunrise", "dawn").with_action(Action::set("day", next_day)))
//!     .unwrap();
//!
//! engine.trigger("dawn", 1.0, 0);
//! let reports = engine.run_until_idle().now_or_never().unwrap().unwrap();
//!
//! assert_eq!(reports.len(), 1);
//! assert_eq!(engine.state().variables().value("day").unwrap(), 2.0);
//! ```

mod save;
mod state;

use std::rc::Rc;

use rustc_hash::FxHashSet;
use tracing::{debug, instrument, trace};

use crate::actions::{Flow, UiProxy};
use crate::core::{
    gate, valid_bounds, DefinitionError, EngineConfig, EngineError, Notification, RandomSource,
    Result, UsageError, Variable,
};
use crate::effects::{Attribute, EffectProvider};
use crate::expr::{CompiledExpression, ExprSource, ExpressionCompiler, FunctionTable};
use crate::loader::{Content, Factory};
use crate::triggers::{all_hold, Event, EventId, PendingTrigger, TriggerId};

pub use save::SaveState;
pub use state::{EndState, EngineState, HOST_FUNCTIONS};

/// Outcome of one trigger pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    /// The trigger that was popped.
    pub trigger: TriggerId,
    /// False if the trigger's own probability gate failed.
    pub gate_passed: bool,
    /// Events that fired, in order.
    pub fired: Vec<EventId>,
    /// The game ended during this pass.
    pub ended: bool,
}

/// Data-driven rule engine.
///
/// A pass future that is dropped before completion leaves the engine
/// marked in flight, and every later pass or mutation fails with
/// [`UsageError::PassInFlight`]. Hosts that abandon a pass must discard
/// the engine and build a new one, restoring a [`SaveState`] taken
/// earlier if they need to resume.
pub struct Engine {
    state: EngineState,
    compiler: ExpressionCompiler,
    ui: Box<dyn UiProxy>,
    /// Set while a pass runs. Stays set if a pass future is dropped.
    in_flight: bool,
}

impl Engine {
    /// Create an engine with a [`GameRng`](crate::core::GameRng) seeded
    /// from the config.
    pub fn new(config: EngineConfig, ui: impl UiProxy + 'static) -> Self {
        Self::from_state(EngineState::new(config), Box::new(ui))
    }

    /// Create an engine with a custom random source.
    pub fn with_rng(
        config: EngineConfig,
        ui: impl UiProxy + 'static,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self::from_state(EngineState::with_rng(config, rng), Box::new(ui))
    }

    fn from_state(state: EngineState, ui: Box<dyn UiProxy>) -> Self {
        let mut compiler = ExpressionCompiler::new();
        for (name, arity) in HOST_FUNCTIONS {
            compiler.register_function(*name, *arity);
        }
        Self {
            state,
            compiler,
            ui,
            in_flight: false,
        }
    }

    // === Accessors ===

    /// Read-only view of the runtime state.
    #[must_use]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// The compiler, with the host functions registered.
    pub fn compiler_mut(&mut self) -> &mut ExpressionCompiler {
        &mut self.compiler
    }

    /// Whether a pass is running (or was abandoned mid-await).
    #[must_use]
    pub fn is_pass_in_flight(&self) -> bool {
        self.in_flight
    }

    // === Expressions ===

    /// Compile through the engine's cache.
    pub fn compile(&mut self, source: impl Into<ExprSource>) -> Result<Rc<CompiledExpression>> {
        Ok(self.compiler.compile(source)?)
    }

    /// Compile and evaluate against the current state.
    pub fn evaluate(&mut self, source: impl Into<ExprSource>) -> Result<f64> {
        let expression = self.compiler.compile(source)?;
        Ok(expression.eval(&self.state)?)
    }

    /// Read a name the way expressions do: variables, then attributes.
    pub fn value(&self, name: &str) -> Result<f64> {
        Ok(self.state.variable(name)?)
    }

    // === Definitions ===

    /// Declare a variable.
    pub fn define_variable(&mut self, id: impl Into<String>, variable: Variable) -> Result<()> {
        let id = id.into();
        if self.state.variables.contains(&id) {
            return Err(UsageError::DuplicateDefinition { kind: "variable", id }.into());
        }
        if !valid_bounds(variable.min, variable.max) {
            return Err(invalid_bounds(format!("variable `{id}`"), variable.min, variable.max));
        }
        self.state.variables.define(id, variable);
        Ok(())
    }

    /// Register an attribute.
    pub fn register_attribute(&mut self, attribute: Attribute) -> Result<()> {
        if self.state.attributes.contains(&attribute.id) {
            return Err(UsageError::DuplicateDefinition {
                kind: "attribute",
                id: attribute.id,
            }
            .into());
        }
        if !valid_bounds(attribute.min, attribute.max) {
            return Err(invalid_bounds(
                format!("attribute `{}`", attribute.id),
                attribute.min,
                attribute.max,
            ));
        }
        self.state.attributes.register(attribute);
        Ok(())
    }

    /// Register an item definition.
    pub fn register_item(&mut self, item: EffectProvider) -> Result<()> {
        let id = item.id.clone();
        if !self.state.items.register(item) {
            return Err(UsageError::DuplicateDefinition { kind: "item", id }.into());
        }
        Ok(())
    }

    /// Register a status definition.
    pub fn register_status(&mut self, status: EffectProvider) -> Result<()> {
        let id = status.id.clone();
        if !self.state.status_kinds.register(status) {
            return Err(UsageError::DuplicateDefinition { kind: "status", id }.into());
        }
        Ok(())
    }

    /// Register an event. Duplicate ids are rejected.
    pub fn register_event(&mut self, event: Event) -> Result<()> {
        debug!(event = %event.id, trigger = %event.trigger, "registering event");
        Ok(self.state.registry.register(event)?)
    }

    /// Load a JSON content document (variables, attributes, items, statuses
    /// and events), compiling every expression through the engine's cache.
    pub fn load_content(&mut self, json: &str) -> Result<()> {
        let content = Content::from_json(json)?;
        let built = Factory::new(&mut self.compiler).content(content)?;

        for (id, variable) in built.variables {
            self.define_variable(id, variable)?;
        }
        for attribute in built.attributes {
            self.register_attribute(attribute)?;
        }
        for item in built.items {
            self.register_item(item)?;
        }
        for status in built.statuses {
            self.register_status(status)?;
        }
        for event in built.events {
            self.register_event(event)?;
        }
        Ok(())
    }

    // === Host-side mutations ===

    /// Set a variable from the host.
    pub fn set_variable(&mut self, id: &str, value: f64) -> Result<()> {
        self.ensure_idle()?;
        Ok(self.state.set_variable(id, value)?)
    }

    /// Give or take items from the host.
    pub fn give_item(&mut self, id: &str, amount: f64) -> Result<()> {
        self.ensure_idle()?;
        Ok(self.state.give_item(id, amount)?)
    }

    /// Apply or remove a status from the host.
    pub fn set_status(&mut self, id: &str, duration: f64) -> Result<()> {
        self.ensure_idle()?;
        Ok(self.state.set_status(id, duration)?)
    }

    /// Advance every status by one tick. Returns the expired ids.
    pub fn tick(&mut self) -> Result<Vec<String>> {
        self.ensure_idle()?;
        Ok(self.state.tick_statuses())
    }

    /// Take every pending notification, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.state.notifications.drain()
    }

    // === Scheduling ===

    /// Enqueue a trigger. Nothing is evaluated until it is processed.
    pub fn trigger(&mut self, trigger: impl Into<String>, probability: f64, priority: i32) {
        self.state
            .enqueue(TriggerId::new(trigger), priority, probability);
    }

    /// Enqueue a trigger with probability 1 and the default priority.
    pub fn fire(&mut self, trigger: impl Into<String>) {
        let priority = self.state.config().default_trigger_priority;
        self.trigger(trigger, 1.0, priority);
    }

    /// Process one pending trigger.
    ///
    /// Returns `None` if the queue is empty or the game has ended. Fails
    /// with [`UsageError::PassInFlight`] if a previous pass never finished.
    pub async fn process_next_trigger(&mut self) -> Result<Option<PassReport>> {
        self.ensure_idle()?;
        if self.state.has_ended() {
            debug!("game has ended, not processing triggers");
            return Ok(None);
        }
        let Some(pending) = self.state.queue.pop() else {
            return Ok(None);
        };

        self.in_flight = true;
        let report = self.run_pass(pending).await;
        self.in_flight = false;
        report.map(Some)
    }

    /// Process triggers until the queue is empty or the game ends.
    pub async fn run_until_idle(&mut self) -> Result<Vec<PassReport>> {
        let mut reports = Vec::new();
        while let Some(report) = self.process_next_trigger().await? {
            reports.push(report);
        }
        Ok(reports)
    }

    /// Clear the queue and its sequence counter, restore every event's
    /// flags to their defaults and leave the end state.
    ///
    /// Variables, items and statuses are untouched.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.state.queue.clear();
        self.state.registry.reset();
        self.state.end_state = None;
        debug!("engine reset");
        Ok(())
    }

    // === Persistence ===

    /// Capture the runtime state.
    #[must_use]
    pub fn save(&self) -> SaveState {
        SaveState::capture(&self.state)
    }

    /// Restore a save into this engine. Pending triggers are dropped.
    pub fn restore(&mut self, save: &SaveState) -> Result<()> {
        self.ensure_idle()?;
        save.apply(&mut self.state)?;
        self.state.queue.clear();
        Ok(())
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.in_flight {
            return Err(UsageError::PassInFlight.into());
        }
        Ok(())
    }

    #[instrument(skip_all, fields(trigger = %pending.trigger, priority = pending.priority))]
    async fn run_pass(&mut self, pending: PendingTrigger) -> Result<PassReport> {
        let mut report = PassReport {
            trigger: pending.trigger.clone(),
            gate_passed: gate(self.state.rng(), pending.probability)?,
            fired: Vec::new(),
            ended: false,
        };
        if !report.gate_passed {
            debug!(probability = pending.probability, "trigger gated out");
            return Ok(report);
        }

        let listeners: Vec<Rc<Event>> = self
            .state
            .registry
            .listeners(pending.trigger.as_str())
            .cloned()
            .collect();
        debug!(listeners = listeners.len(), "pass started");

        let mut excluded: FxHashSet<EventId> = FxHashSet::default();
        for event in listeners {
            let id = event.id.as_str();
            if !self.state.registry.is_enabled(id)? {
                trace!(event = id, "skipped: disabled");
                continue;
            }
            if excluded.contains(id) {
                trace!(event = id, "skipped: excluded");
                continue;
            }
            if !all_hold(&event.conditions, &self.state)? {
                trace!(event = id, "skipped: conditions");
                continue;
            }
            let probability = event.probability.eval(&self.state)?;
            if !gate(self.state.rng(), probability)? {
                trace!(event = id, probability, "skipped: probability");
                continue;
            }

            let occurrences = self.state.registry.record_occurrence(id)?;
            debug!(event = id, occurrences, "event fired");
            self.state.notifications.push(Notification::EventFired {
                event: id.to_string(),
                trigger: pending.trigger.0.clone(),
            });
            excluded.extend(event.exclusions.iter().cloned());

            let flow = event.actions.run(&mut self.state, self.ui.as_ref()).await?;
            if flow == Flow::StopGlobal {
                trace!(event = id, "actions stopped globally");
            }
            if event.once {
                self.state.set_event_enabled(id, false)?;
            }
            report.fired.push(event.id.clone());

            if self.state.has_ended() {
                debug!(event = id, "game ended, aborting pass");
                report.ended = true;
                break;
            }
        }
        Ok(report)
    }
}

fn invalid_bounds(context: String, min: f64, max: f64) -> EngineError {
    DefinitionError::Invalid {
        context,
        message: format!("invalid bounds [{min}, {max}]"),
    }
    .into()
}
