//! Persistence encoding for numbers that may be non-finite.
//!
//! JSON cannot carry `Infinity` or `NaN`, so save states write them as the
//! sentinel strings `"Infinity"`, `"-Infinity"` and `"NaN"`. Finite values
//! are written as plain numbers.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel for positive infinity.
pub const INFINITY_SENTINEL: &str = "Infinity";
/// Sentinel for negative infinity.
pub const NEG_INFINITY_SENTINEL: &str = "-Infinity";
/// Sentinel for NaN.
pub const NAN_SENTINEL: &str = "NaN";

/// An `f64` that serializes non-finite values as sentinel strings.
#[derive(Clone, Copy, Debug, Default)]
pub struct PersistedNumber(pub f64);

impl PersistedNumber {
    /// Get the raw value.
    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }
}

impl From<f64> for PersistedNumber {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<PersistedNumber> for f64 {
    fn from(value: PersistedNumber) -> Self {
        value.0
    }
}

/// Bitwise-aware equality so `NaN == NaN` for round-trip checks.
impl PartialEq for PersistedNumber {
    fn eq(&self, other: &Self) -> bool {
        (self.0.is_nan() && other.0.is_nan()) || self.0 == other.0
    }
}

impl Serialize for PersistedNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0;
        if value.is_nan() {
            serializer.serialize_str(NAN_SENTINEL)
        } else if value == f64::INFINITY {
            serializer.serialize_str(INFINITY_SENTINEL)
        } else if value == f64::NEG_INFINITY {
            serializer.serialize_str(NEG_INFINITY_SENTINEL)
        } else {
            serializer.serialize_f64(value)
        }
    }
}

struct PersistedNumberVisitor;

impl<'de> Visitor<'de> for PersistedNumberVisitor {
    type Value = PersistedNumber;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "a number or one of \"{INFINITY_SENTINEL}\", \"{NEG_INFINITY_SENTINEL}\", \"{NAN_SENTINEL}\""
        )
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(PersistedNumber(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(PersistedNumber(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(PersistedNumber(value as f64))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        match value {
            INFINITY_SENTINEL => Ok(PersistedNumber(f64::INFINITY)),
            NEG_INFINITY_SENTINEL => Ok(PersistedNumber(f64::NEG_INFINITY)),
            NAN_SENTINEL => Ok(PersistedNumber(f64::NAN)),
            other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }
}

impl<'de> Deserialize<'de> for PersistedNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PersistedNumberVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_numbers_stay_numbers() {
        let json = serde_json::to_string(&PersistedNumber(2.5)).unwrap();
        assert_eq!(json, "2.5");
        let back: PersistedNumber = serde_json::from_str("7").unwrap();
        assert_eq!(back.get(), 7.0);
    }

    #[test]
    fn test_sentinels() {
        for (value, text) in [
            (f64::INFINITY, "\"Infinity\""),
            (f64::NEG_INFINITY, "\"-Infinity\""),
            (f64::NAN, "\"NaN\""),
        ] {
            let json = serde_json::to_string(&PersistedNumber(value)).unwrap();
            assert_eq!(json, text);
            let back: PersistedNumber = serde_json::from_str(&json).unwrap();
            assert_eq!(back, PersistedNumber(value));
        }
    }

    #[test]
    fn test_unknown_sentinel_rejected() {
        assert!(serde_json::from_str::<PersistedNumber>("\"infinity\"").is_err());
    }
}
