use std::sync::Arc;

use log::warn;
use serde::{de::DeserializeOwned, Serialize};

use super::traits::StorageMedium;

/// Typed fail-soft view over a [`StorageMedium`].
///
/// `read` and `write` never panic and never surface an error: a missing,
/// unreadable, or unstorable value comes back as `None`/`false`, and
/// callers treat that as a normal empty state.
#[derive(Clone)]
pub struct Kv {
    medium: Arc<dyn StorageMedium>,
}

impl Kv {
    pub fn new(medium: Arc<dyn StorageMedium>) -> Self {
        Self { medium }
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.medium.get_item(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("discarding unreadable value at {}: {}", key, err);
                None
            }
        }
    }

    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("failed to serialize value for {}: {}", key, err);
                return false;
            }
        };
        self.medium.set_item(key, &raw)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.medium.remove_item(key)
    }
}
