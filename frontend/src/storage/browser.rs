use gloo::storage::{LocalStorage, Storage};

use super::traits::StorageMedium;

/// localStorage-backed medium for browser builds.
///
/// Goes through the raw storage handle so values land exactly as the
/// [`Kv`](super::kv::Kv) wrapper serialized them.
pub struct BrowserMedium;

impl StorageMedium for BrowserMedium {
    fn get_item(&self, key: &str) -> Option<String> {
        LocalStorage::raw().get_item(key).ok().flatten()
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        LocalStorage::raw().set_item(key, value).is_ok()
    }

    fn remove_item(&self, key: &str) -> bool {
        LocalStorage::raw().remove_item(key).is_ok()
    }
}
