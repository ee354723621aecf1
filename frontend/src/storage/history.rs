use chrono::Utc;
use shared::{HistoryEvent, NewHistoryEvent};

use super::kv::Kv;

const HISTORY_KEY: &str = "nc_history_v1";

/// Newest-first ring buffer; entries past the cap fall off silently.
const MAX_ENTRIES: usize = 200;

/// Append-only local activity history.
#[derive(Clone)]
pub struct HistoryLog {
    kv: Kv,
}

impl HistoryLog {
    pub fn new(kv: Kv) -> Self {
        Self { kv }
    }

    pub fn log(&self, event: NewHistoryEvent) -> bool {
        let mut entries = self.list();
        entries.insert(
            0,
            HistoryEvent {
                id: HistoryEvent::generate_id(),
                kind: event.kind,
                title: event.title,
                chart_id: event.chart_id,
                ts: event.ts.unwrap_or_else(Utc::now),
                meta: event.meta,
            },
        );
        entries.truncate(MAX_ENTRIES);
        self.kv.write(HISTORY_KEY, &entries)
    }

    pub fn list(&self) -> Vec<HistoryEvent> {
        self.kv.read(HISTORY_KEY).unwrap_or_default()
    }

    pub fn clear(&self) -> bool {
        self.kv.remove(HISTORY_KEY)
    }
}
