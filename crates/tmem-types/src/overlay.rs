//! Read-only overlay of pending changes on top of a map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Pending changes to a map, grouped by kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeSet {
    pub create: Map<String, Value>,
    pub update: Map<String, Value>,
    pub delete: Map<String, Value>,
}

/// Presents a map and a [`ChangeSet`] as if the changes were already applied.
pub struct ComboMap<'a> {
    base: &'a Map<String, Value>,
    changes: &'a ChangeSet,
}

impl<'a> ComboMap<'a> {
    pub fn new(base: &'a Map<String, Value>, changes: &'a ChangeSet) -> Self {
        Self { base, changes }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        if let Some(v) = self.changes.create.get(key) {
            return Some(v);
        }
        if let Some(v) = self.changes.update.get(key) {
            return Some(v);
        }
        if self.changed(key) {
            return None;
        }
        self.base.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Created entries, then updated entries, then untouched base entries.
    pub fn iter(&self) -> impl Iterator<Item = (&'a String, &'a Value)> + '_ {
        self.changes
            .create
            .iter()
            .chain(self.changes.update.iter())
            .chain(self.base.iter().filter(|(k, _)| !self.changed(k)))
    }

    fn changed(&self, key: &str) -> bool {
        self.changes.create.contains_key(key)
            || self.changes.update.contains_key(key)
            || self.changes.delete.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected a map"),
        }
    }

    #[test]
    fn overlay_merges_changes() {
        let base = as_map(json!({"a": 1, "b": 2, "c": 3}));
        let changes = ChangeSet {
            create: as_map(json!({"d": 4})),
            update: as_map(json!({"a": 10})),
            delete: as_map(json!({"c": true})),
        };
        let combo = ComboMap::new(&base, &changes);

        assert_eq!(combo.get("a"), Some(&json!(10)));
        assert_eq!(combo.get("b"), Some(&json!(2)));
        assert_eq!(combo.get("d"), Some(&json!(4)));
        assert!(!combo.has("c"));

        let keys: Vec<&str> = combo.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["d", "a", "b"]);
    }
}
