//! Effect provider collections.
//!
//! Both collections keep insertion order. Order does not change combined
//! totals but it decides which Assignment modifier wins and how a host
//! lists entries.

use std::rc::Rc;

use super::provider::EffectProvider;

/// A provider held `count` times.
#[derive(Clone, Debug)]
pub struct Stack {
    pub provider: Rc<EffectProvider>,
    pub count: u32,
}

/// Item stacks.
///
/// Counts are capped at `min(provider.max_stack, max_stack)`. A stack whose
/// count reaches zero is removed.
#[derive(Clone, Debug)]
pub struct Inventory {
    stacks: Vec<Stack>,
    max_stack: u32,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(u32::MAX)
    }
}

impl Inventory {
    /// Create an empty inventory with a global stack cap.
    #[must_use]
    pub fn new(max_stack: u32) -> Self {
        Self {
            stacks: Vec::new(),
            max_stack,
        }
    }

    /// Effective cap for a provider.
    #[must_use]
    pub fn cap_for(&self, provider: &EffectProvider) -> u32 {
        provider
            .max_stack
            .map_or(self.max_stack, |cap| cap.min(self.max_stack))
    }

    /// Current count of an item, 0 if absent.
    #[must_use]
    pub fn count(&self, id: &str) -> u32 {
        self.position(id).map_or(0, |i| self.stacks[i].count)
    }

    /// Add (or with a negative amount, remove) items.
    ///
    /// Returns `(old, new)` counts after capping.
    pub fn add(&mut self, provider: &Rc<EffectProvider>, amount: i64) -> (u32, u32) {
        let old = self.count(&provider.id);
        let cap = i64::from(self.cap_for(provider));
        let new = (i64::from(old).saturating_add(amount)).clamp(0, cap);
        // new is within [0, u32::MAX] after the clamp
        self.set(provider, new as u32)
    }

    /// Set an item count directly. Returns `(old, new)`.
    pub fn set(&mut self, provider: &Rc<EffectProvider>, count: u32) -> (u32, u32) {
        let count = count.min(self.cap_for(provider));
        match self.position(&provider.id) {
            Some(i) => {
                let old = self.stacks[i].count;
                if count == 0 {
                    self.stacks.remove(i);
                } else {
                    self.stacks[i].count = count;
                }
                (old, count)
            }
            None => {
                if count > 0 {
                    self.stacks.push(Stack {
                        provider: Rc::clone(provider),
                        count,
                    });
                }
                (0, count)
            }
        }
    }

    /// Stacks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.iter()
    }

    /// `(provider, count)` pairs for modifier combination.
    pub fn sources(&self) -> impl Iterator<Item = (&EffectProvider, u32)> {
        self.stacks.iter().map(|s| (s.provider.as_ref(), s.count))
    }

    pub fn clear(&mut self) {
        self.stacks.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.stacks.iter().position(|s| s.provider.id == id)
    }
}

/// An active status and its remaining duration in ticks.
#[derive(Clone, Debug)]
pub struct StatusEntry {
    pub provider: Rc<EffectProvider>,
    /// `f64::INFINITY` for permanent statuses.
    pub remaining: f64,
}

/// Active statuses. Each counts as a stack of one.
#[derive(Clone, Debug, Default)]
pub struct StatusTable {
    entries: Vec<StatusEntry>,
}

impl StatusTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining ticks for a status, `None` if inactive.
    #[must_use]
    pub fn remaining(&self, id: &str) -> Option<f64> {
        self.position(id).map(|i| self.entries[i].remaining)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Apply or refresh a status.
    ///
    /// A duration of zero or less (or NaN) removes it. An existing status
    /// keeps its position. Returns the remaining duration, `None` if removed.
    pub fn set(&mut self, provider: &Rc<EffectProvider>, duration: f64) -> Option<f64> {
        let position = self.position(&provider.id);
        if duration.is_nan() || duration <= 0.0 {
            if let Some(i) = position {
                self.entries.remove(i);
            }
            return None;
        }
        match position {
            Some(i) => self.entries[i].remaining = duration,
            None => self.entries.push(StatusEntry {
                provider: Rc::clone(provider),
                remaining: duration,
            }),
        }
        Some(duration)
    }

    /// Advance every status by one tick, removing expired ones.
    ///
    /// Returns the ids that expired, in table order.
    pub fn tick(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        self.entries.retain_mut(|entry| {
            entry.remaining -= 1.0;
            if entry.remaining <= 0.0 {
                expired.push(entry.provider.id.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries.iter()
    }

    /// `(provider, 1)` pairs for modifier combination.
    pub fn sources(&self) -> impl Iterator<Item = (&EffectProvider, u32)> {
        self.entries.iter().map(|e| (e.provider.as_ref(), 1))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.provider.id == id)
    }
}
