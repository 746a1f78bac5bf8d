//! Per-frame input snapshot

use rhai::{Dynamic, Map};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keys held to move a player
pub const MOVEMENT_KEYS: [&str; 8] = [
    "ArrowUp",
    "ArrowDown",
    "ArrowLeft",
    "ArrowRight",
    "w",
    "a",
    "s",
    "d",
];

/// Keys tapped to trigger actions
pub const ACTION_KEYS: [&str; 2] = [" ", "Enter"];

/// Pointer and keyboard state handed to `update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// Pointer x, within `[0, width]`
    pub x: f64,
    /// Pointer y, within `[0, height]`
    pub y: f64,
    /// Whether the pointer button is held
    pub is_down: bool,
    /// Key identifier to pressed flag
    pub keys: BTreeMap<String, bool>,
}

impl InputSnapshot {
    /// Pointer at the surface centre, nothing pressed.
    ///
    /// Every known key is present and `false` so scripts can test any of
    /// them without checking for presence first.
    #[must_use]
    pub fn centered(width: f64, height: f64) -> Self {
        let keys = MOVEMENT_KEYS
            .iter()
            .chain(ACTION_KEYS.iter())
            .map(|key| ((*key).to_string(), false))
            .collect();
        Self {
            x: width / 2.0,
            y: height / 2.0,
            is_down: false,
            keys,
        }
    }

    /// Whether `key` is currently pressed
    #[inline]
    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        self.keys.get(key).copied().unwrap_or(false)
    }

    /// Number of keys currently pressed
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.keys.values().filter(|held| **held).count()
    }

    pub(crate) fn to_map(&self) -> Map {
        let keys: Map = self
            .keys
            .iter()
            .map(|(key, held)| (key.as_str().into(), Dynamic::from_bool(*held)))
            .collect();

        let mut map = Map::new();
        map.insert("x".into(), Dynamic::from_float(self.x));
        map.insert("y".into(), Dynamic::from_float(self.y));
        map.insert("is_down".into(), Dynamic::from_bool(self.is_down));
        map.insert("keys".into(), Dynamic::from_map(keys));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_snapshot() {
        let input = InputSnapshot::centered(800.0, 600.0);
        assert_eq!(input.x, 400.0);
        assert_eq!(input.y, 300.0);
        assert!(!input.is_down);
        assert_eq!(input.keys.len(), MOVEMENT_KEYS.len() + ACTION_KEYS.len());
        assert_eq!(input.held_count(), 0);
        assert!(!input.is_held("Enter"));
        assert!(!input.is_held("unknown"));
    }

    #[test]
    fn script_view_exposes_all_fields() {
        let mut input = InputSnapshot::centered(800.0, 600.0);
        input.keys.insert("w".to_string(), true);
        let map = input.to_map();

        assert_eq!(map.len(), 4);
        assert_eq!(map["x"].as_float().unwrap(), 400.0);
        assert!(!map["is_down"].as_bool().unwrap());
        let keys = map["keys"].clone().cast::<Map>();
        assert!(keys["w"].as_bool().unwrap());
        assert!(!keys[" "].as_bool().unwrap());
    }
}
