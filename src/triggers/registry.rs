//! Event registry.
//!
//! The registry owns every event definition, indexes them by trigger id in
//! registration order, and holds the per-event runtime flags. Definitions
//! are shared as `Rc<Event>` so the engine can run an event's actions while
//! mutating the flags.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{EvalError, UsageError};

use super::event::{Event, EventId, TriggerId};

/// Runtime facet of one event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFlags {
    pub disabled: bool,
    pub occurrences: u32,
}

/// Registry of events with their runtime flags.
#[derive(Clone, Debug, Default)]
pub struct EventRegistry {
    /// Events in registration order.
    events: Vec<Rc<Event>>,

    /// Flags, parallel to `events`.
    flags: Vec<EventFlags>,

    /// Event id to position.
    index: FxHashMap<EventId, usize>,

    /// Trigger id to positions, in registration order.
    by_trigger: FxHashMap<TriggerId, SmallVec<[usize; 4]>>,
}

impl EventRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event. Duplicate ids are rejected.
    pub fn register(&mut self, event: Event) -> Result<(), UsageError> {
        if self.index.contains_key(&event.id) {
            return Err(UsageError::DuplicateEvent(event.id.0));
        }

        let position = self.events.len();
        self.index.insert(event.id.clone(), position);
        self.by_trigger
            .entry(event.trigger.clone())
            .or_default()
            .push(position);
        self.flags.push(EventFlags {
            disabled: event.disabled_by_default,
            occurrences: 0,
        });
        self.events.push(Rc::new(event));
        Ok(())
    }

    /// Get an event by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Rc<Event>> {
        self.index.get(id).map(|&i| &self.events[i])
    }

    /// Events listening on a trigger, in registration order.
    pub fn listeners(&self, trigger: &str) -> impl Iterator<Item = &Rc<Event>> {
        self.by_trigger
            .get(trigger)
            .into_iter()
            .flatten()
            .map(|&i| &self.events[i])
    }

    /// Runtime flags for an event.
    #[must_use]
    pub fn flags(&self, id: &str) -> Option<EventFlags> {
        self.index.get(id).map(|&i| self.flags[i])
    }

    /// Whether an event is enabled.
    pub fn is_enabled(&self, id: &str) -> Result<bool, EvalError> {
        Ok(!self.flags_ref(id)?.disabled)
    }

    /// How many times an event has fired since the last reset.
    pub fn occurrences(&self, id: &str) -> Result<u32, EvalError> {
        Ok(self.flags_ref(id)?.occurrences)
    }

    /// Enable or disable an event. Returns the previous enabled state.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<bool, EvalError> {
        let flags = self.flags_mut(id)?;
        let previous = !flags.disabled;
        flags.disabled = !enabled;
        Ok(previous)
    }

    /// Record one firing.
    pub fn record_occurrence(&mut self, id: &str) -> Result<u32, EvalError> {
        let flags = self.flags_mut(id)?;
        flags.occurrences = flags.occurrences.saturating_add(1);
        Ok(flags.occurrences)
    }

    /// Restore every event to `{disabled_by_default, 0}`.
    pub fn reset(&mut self) {
        for (event, flags) in self.events.iter().zip(self.flags.iter_mut()) {
            *flags = EventFlags {
                disabled: event.disabled_by_default,
                occurrences: 0,
            };
        }
    }

    /// Flags of every event, in registration order.
    pub fn snapshot(&self) -> Vec<(EventId, EventFlags)> {
        self.events
            .iter()
            .zip(&self.flags)
            .map(|(event, flags)| (event.id.clone(), *flags))
            .collect()
    }

    /// Restore flags from a snapshot.
    ///
    /// Events absent from the snapshot return to their defaults. An id the
    /// registry does not know makes the snapshot incompatible.
    pub fn restore(&mut self, snapshot: &[(EventId, EventFlags)]) -> Result<(), UsageError> {
        if let Some((unknown, _)) = snapshot.iter().find(|(id, _)| !self.index.contains_key(id)) {
            return Err(UsageError::IncompatibleSave(format!(
                "unknown event `{unknown}`"
            )));
        }
        self.reset();
        for (id, saved) in snapshot {
            if let Some(&i) = self.index.get(id) {
                self.flags[i] = *saved;
            }
        }
        Ok(())
    }

    /// Get total event count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate all events in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Event>> {
        self.events.iter()
    }

    fn flags_ref(&self, id: &str) -> Result<&EventFlags, EvalError> {
        self.index
            .get(id)
            .map(|&i| &self.flags[i])
            .ok_or_else(|| EvalError::UnknownEvent(id.to_string()))
    }

    fn flags_mut(&mut self, id: &str) -> Result<&mut EventFlags, EvalError> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.flags[i]),
            None => Err(EvalError::UnknownEvent(id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> EventRegistry {
        let mut registry = EventRegistry::new();
        registry.register(Event::new("a", "dawn")).unwrap();
        registry.register(Event::new("b", "dusk")).unwrap();
        registry.register(Event::new("c", "dawn").disabled_by_default()).unwrap();
        registry
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = registry();
        let err = registry.register(Event::new("a", "dusk")).unwrap_err();
        assert!(matches!(err, UsageError::DuplicateEvent(id) if id == "a"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_listeners_in_registration_order() {
        let registry = registry();
        let ids: Vec<_> = registry.listeners("dawn").map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(registry.listeners("noon").count(), 0);
    }

    #[test]
    fn test_flags() {
        let mut registry = registry();
        assert!(registry.is_enabled("a").unwrap());
        assert!(!registry.is_enabled("c").unwrap());

        assert!(registry.set_enabled("a", false).unwrap());
        assert!(!registry.is_enabled("a").unwrap());

        registry.record_occurrence("b").unwrap();
        registry.record_occurrence("b").unwrap();
        assert_eq!(registry.occurrences("b").unwrap(), 2);

        assert!(matches!(
            registry.set_enabled("zzz", true),
            Err(EvalError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut registry = registry();
        registry.set_enabled("a", false).unwrap();
        registry.set_enabled("c", true).unwrap();
        registry.record_occurrence("a").unwrap();

        registry.reset();

        assert_eq!(registry.flags("a"), Some(EventFlags::default()));
        assert_eq!(
            registry.flags("c"),
            Some(EventFlags { disabled: true, occurrences: 0 })
        );
    }

    #[test]
    fn test_snapshot_restore() {
        let mut registry = registry();
        registry.record_occurrence("a").unwrap();
        registry.set_enabled("b", false).unwrap();
        let snapshot = registry.snapshot();

        registry.reset();
        registry.restore(&snapshot).unwrap();

        assert_eq!(registry.occurrences("a").unwrap(), 1);
        assert!(!registry.is_enabled("b").unwrap());

        let bogus = vec![(EventId::new("nope"), EventFlags::default())];
        assert!(matches!(
            registry.restore(&bogus),
            Err(UsageError::IncompatibleSave(_))
        ));
        // A rejected snapshot leaves the flags untouched
        assert_eq!(registry.occurrences("a").unwrap(), 1);
    }
}
