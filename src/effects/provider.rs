//! Effect providers: items and statuses.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::modifier::Modifier;

/// An item or status definition carrying modifiers.
///
/// Immutable once built; collections share it through `Rc`.
#[derive(Clone, Debug)]
pub struct EffectProvider {
    pub id: String,
    pub modifiers: SmallVec<[Modifier; 4]>,
    /// Per-provider stack cap. Only meaningful for items.
    pub max_stack: Option<u32>,
}

impl EffectProvider {
    /// Create a provider with no modifiers.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            modifiers: SmallVec::new(),
            max_stack: None,
        }
    }

    /// Add a modifier (builder pattern).
    #[must_use]
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Set the stack cap (builder pattern).
    #[must_use]
    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = Some(max_stack);
        self
    }

    /// Modifiers targeting `target`, in declaration order.
    pub fn modifiers_for<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a Modifier> + 'a {
        self.modifiers.iter().filter(move |m| m.target == target)
    }
}

/// Item and status definitions, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct ProviderCatalog {
    providers: FxHashMap<String, Rc<EffectProvider>>,
}

impl ProviderCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, returning `false` if the id is already taken.
    pub fn register(&mut self, provider: EffectProvider) -> bool {
        if self.providers.contains_key(&provider.id) {
            return false;
        }
        self.providers.insert(provider.id.clone(), Rc::new(provider));
        true
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Rc<EffectProvider>> {
        self.providers.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::ModifierKind;

    #[test]
    fn test_modifiers_for_keeps_order() {
        let provider = EffectProvider::new("lantern")
            .with_modifier(Modifier::constant("light", ModifierKind::Absolute, 1.0))
            .with_modifier(Modifier::constant("hope", ModifierKind::Absolute, 2.0))
            .with_modifier(Modifier::constant("light", ModifierKind::Relative, 0.5));

        let kinds: Vec<_> = provider.modifiers_for("light").map(|m| m.kind).collect();
        assert_eq!(kinds, vec![ModifierKind::Absolute, ModifierKind::Relative]);
        assert_eq!(provider.modifiers_for("speed").count(), 0);
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let mut catalog = ProviderCatalog::new();
        assert!(catalog.register(EffectProvider::new("rope").with_max_stack(3)));
        assert!(!catalog.register(EffectProvider::new("rope")));
        assert_eq!(catalog.get("rope").and_then(|p| p.max_stack), Some(3));
        assert_eq!(catalog.len(), 1);
    }
}
