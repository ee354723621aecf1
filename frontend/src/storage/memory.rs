use std::collections::HashMap;
use std::sync::Mutex;

use super::traits::StorageMedium;

/// In-process medium. Backs the test suite and any host without
/// localStorage; contents die with the process.
#[derive(Default)]
pub struct MemoryMedium {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plant a raw value directly, bypassing serialization. Test hook.
    pub fn poke(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }
}

impl StorageMedium for MemoryMedium {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), value.to_string());
                true
            }
            Err(_) => false,
        }
    }

    fn remove_item(&self, key: &str) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => entries.remove(key).is_some(),
            Err(_) => false,
        }
    }
}
