//! Bounded numeric attributes.
//!
//! Attributes are derived values: a base plus whatever the stacked effect
//! providers contribute, clamped to an inclusive range. The registry only
//! stores definitions; the derived value is computed on demand by the
//! engine through [`CombinedModifiers`](super::CombinedModifiers).

use rustc_hash::FxHashMap;

/// Attribute definition. Immutable after registration.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub id: String,
    pub base: f64,
    pub min: f64,
    pub max: f64,
}

impl Attribute {
    /// Create an attribute with explicit bounds.
    pub fn new(id: impl Into<String>, base: f64, min: f64, max: f64) -> Self {
        Self {
            id: id.into(),
            base,
            min,
            max,
        }
    }

    /// Create an attribute bounded by `[-∞, +∞]`.
    pub fn unbounded(id: impl Into<String>, base: f64) -> Self {
        Self::new(id, base, f64::NEG_INFINITY, f64::INFINITY)
    }
}

/// Registered attributes, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct AttributeRegistry {
    attributes: FxHashMap<String, Attribute>,
}

impl AttributeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute. Returns the previous definition if the id was
    /// already registered.
    pub fn register(&mut self, attribute: Attribute) -> Option<Attribute> {
        self.attributes.insert(attribute.id.clone(), attribute)
    }

    /// Look up an attribute.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Attribute> {
        self.attributes.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.attributes.contains_key(id)
    }

    /// Iterate over every registered attribute (arbitrary order).
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut registry = AttributeRegistry::new();
        assert!(registry.register(Attribute::new("strength", 10.0, 0.0, 20.0)).is_none());

        let attr = registry.get("strength").unwrap();
        assert_eq!(attr.base, 10.0);
        assert!(registry.contains("strength"));
        assert!(!registry.contains("wisdom"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = AttributeRegistry::new();
        registry.register(Attribute::unbounded("speed", 1.0));
        let previous = registry.register(Attribute::unbounded("speed", 2.0));
        assert_eq!(previous.map(|a| a.base), Some(1.0));
        assert_eq!(registry.get("speed").map(|a| a.base), Some(2.0));
    }

    #[test]
    fn test_unbounded() {
        let attr = Attribute::unbounded("luck", 0.0);
        assert_eq!(attr.min, f64::NEG_INFINITY);
        assert_eq!(attr.max, f64::INFINITY);
    }
}
