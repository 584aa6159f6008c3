//! Turn input types.
//!
//! A [`TurnAction`] is purely declarative: it names the deltas the player
//! intends, and the delta applier decides how they land on the world. Every
//! field except `description` may be omitted from the serialized form.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::enums::Phase;
use crate::structs::Structure;

/// The player's submitted action for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnAction {
    /// Free-text description of what the settlement does.
    pub description: String,
    /// Resource changes keyed by `Food`, `Wood`, `Stone`, `Iron`.
    #[serde(default)]
    pub resource_deltas: DeltaMap,
    /// Vital changes keyed by `Health`, `Morale`, `Defense`.
    #[serde(default)]
    pub vital_deltas: DeltaMap,
    /// Change to the friction flag.
    #[serde(default)]
    pub friction_delta: i64,
    /// Change to the resolve flag.
    #[serde(default)]
    pub resolve_delta: i64,
    /// Structures raised this turn.
    #[serde(default)]
    pub structures_added: Vec<Structure>,
    /// Ids of structures torn down this turn.
    #[serde(default)]
    pub structures_removed: Vec<String>,
    /// Ids of threats dealt with this turn.
    #[serde(default)]
    pub threats_addressed: Vec<String>,
    /// Ids of survivors who died this turn.
    #[serde(default)]
    pub deceased_ids: Vec<String>,
    /// New affliction tags per survivor id.
    #[serde(default)]
    pub afflictions_added: BTreeMap<String, Vec<String>>,
}

impl TurnAction {
    /// Create an action with only a description and no deltas.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }
}

/// Named integer deltas, kept in the order they were declared.
///
/// Serializes as a plain object. Inserting a key that is already present
/// replaces its value without moving it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeltaMap {
    entries: Vec<(String, i64)>,
}

impl DeltaMap {
    /// Create an empty map.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Set `key` to `value`, returning the previous value if there was one.
    pub fn insert(&mut self, key: impl Into<String>, value: i64) -> Option<i64> {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up the delta for `key`.
    pub fn get(&self, key: &str) -> Option<&i64> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    /// Iterate over `(key, delta)` pairs in declaration order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), *value))
    }

    /// Whether no delta was declared.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for DeltaMap {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Serialize for DeltaMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.entries.iter().map(|(key, value)| (key, value)))
    }
}

impl<'de> Deserialize<'de> for DeltaMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DeltaMapVisitor;

        impl<'de> Visitor<'de> for DeltaMapVisitor {
            type Value = DeltaMap;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of delta names to integers")
            }

            fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut map = DeltaMap::new();
                while let Some((key, value)) = access.next_entry::<String, i64>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(DeltaMapVisitor)
    }
}

/// Envelope around a [`TurnAction`] with per-turn overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnInput {
    /// The action to resolve.
    pub action: TurnAction,
    /// Replaces the world's time of day before any delta is applied.
    #[serde(default)]
    pub phase_override: Option<Phase>,
}

impl From<TurnAction> for TurnInput {
    fn from(action: TurnAction) -> Self {
        Self {
            action,
            phase_override: None,
        }
    }
}
