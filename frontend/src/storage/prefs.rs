use shared::Prefs;

use super::kv::Kv;

const PREFS_KEY: &str = "nc_prefs_v1";

/// Sparse user preferences with merge-on-write semantics.
#[derive(Clone)]
pub struct PrefsStore {
    kv: Kv,
}

impl PrefsStore {
    pub fn new(kv: Kv) -> Self {
        Self { kv }
    }

    pub fn load(&self) -> Prefs {
        self.kv.read(PREFS_KEY).unwrap_or_default()
    }

    /// Merge `patch` into the stored record; keys the patch does not
    /// carry keep their prior value.
    pub fn save(&self, patch: Prefs) -> bool {
        let mut current = self.load();
        current.merge(patch);
        self.kv.write(PREFS_KEY, &current)
    }
}
