use chrono::Utc;
use shared::{BirthDraft, BirthInstant};

use super::kv::Kv;

const DRAFT_KEY: &str = "nc_birth_draft_v1";

/// Persistence for the single scratch birth record the creation flow
/// edits. The draft is only ever replaced, never deleted.
#[derive(Clone)]
pub struct BirthDraftStore {
    kv: Kv,
}

impl BirthDraftStore {
    pub fn new(kv: Kv) -> Self {
        Self { kv }
    }

    pub fn load(&self) -> Option<BirthDraft> {
        self.kv.read(DRAFT_KEY)
    }

    pub fn save(&self, draft: &BirthDraft) -> bool {
        self.kv.write(DRAFT_KEY, draft)
    }

    /// Drop the cached chart preview but keep the birth fields. No-op
    /// when there is no draft yet.
    pub fn clear_preview(&self) -> bool {
        let Some(mut draft) = self.load() else {
            return false;
        };
        draft.clear_preview(Utc::now());
        self.save(&draft)
    }

    /// Remote-ready projection of the current draft, when it is complete
    /// enough to derive one.
    pub fn birth_instant(&self) -> Option<BirthInstant> {
        self.load()?.birth_instant()
    }
}
