//! Ordered sparse threshold lookup.
//!
//! Policy levels, spam levels and the escalation table are all "pick the
//! entry with the largest key not exceeding x" tables. They share this type.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sparse mapping from a signed threshold to a value, kept sorted.
///
/// Serializes as a string-keyed map (`{"0": ..., "50": ...}`) so it fits
/// document stores that only allow string keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable<V> {
    entries: BTreeMap<i64, V>,
}

impl<V> Default for ThresholdTable<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> ThresholdTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, threshold: i64, value: V) -> Option<V> {
        self.entries.insert(threshold, value)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entry with the largest key `<= x`, if any.
    pub fn floor(&self, x: i64) -> Option<(i64, &V)> {
        self.entries.range(..=x).next_back().map(|(k, v)| (*k, v))
    }

    /// Like [`floor`](Self::floor), but falls back to the smallest key when
    /// every key is above `x`. Never rounds up past an existing lower key.
    pub fn closest(&self, x: i64) -> Option<(i64, &V)> {
        self.floor(x)
            .or_else(|| self.entries.iter().next().map(|(k, v)| (*k, v)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &V)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}

impl<V> FromIterator<(i64, V)> for ThresholdTable<V> {
    fn from_iter<I: IntoIterator<Item = (i64, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<V: Serialize> Serialize for ThresholdTable<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(&k.to_string(), v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for ThresholdTable<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for TableVisitor<V> {
            type Value = ThresholdTable<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map keyed by integer thresholds")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = BTreeMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    let threshold = key.trim().parse::<i64>().map_err(|_| {
                        serde::de::Error::custom(format!("threshold key {:?} is not an integer", key))
                    })?;
                    entries.insert(threshold, value);
                }
                Ok(ThresholdTable { entries })
            }
        }

        deserializer.deserialize_map(TableVisitor(PhantomData))
    }
}
