use chrono::Utc;
use log::debug;
use shared::{NewSavedChart, SavedChart, SavedChartPatch};

use super::birth_draft::BirthDraftStore;
use super::kv::Kv;

const LIST_KEY: &str = "nc_saved_charts_v1";
const ACTIVE_KEY: &str = "nc_active_chart_id_v1";

/// The browser-local saved-chart list plus the designated active id.
///
/// The list is most-recent-first by insertion; every consumer relies on
/// that ordering. The active id always points into the list or is unset.
#[derive(Clone)]
pub struct SavedChartStore {
    kv: Kv,
}

impl SavedChartStore {
    pub fn new(kv: Kv) -> Self {
        Self { kv }
    }

    pub fn list(&self) -> Vec<SavedChart> {
        self.kv.read(LIST_KEY).unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<SavedChart> {
        self.list().into_iter().find(|chart| chart.id == id)
    }

    /// Prepend a new chart with a fresh id and timestamps. Becomes the
    /// active chart when nothing is active yet.
    pub fn add(&self, new: NewSavedChart) -> SavedChart {
        let now = Utc::now();
        let chart = SavedChart {
            id: SavedChart::generate_id(),
            name: new.name,
            dob: new.dob,
            tob: new.tob,
            tz_id: new.tz_id,
            place: new.place,
            lat: new.lat,
            lon: new.lon,
            tags: new.tags,
            created_at: now,
            updated_at: now,
        };
        let mut list = self.list();
        list.insert(0, chart.clone());
        self.save_list(&list);
        if self.active_id().is_none() {
            self.set_active(Some(chart.id.as_str()));
        }
        chart
    }

    /// Merge a partial patch into an existing chart. Returns `None` when
    /// the id is unknown.
    pub fn update(&self, id: &str, patch: SavedChartPatch) -> Option<SavedChart> {
        let mut list = self.list();
        let chart = list.iter_mut().find(|chart| chart.id == id)?;
        chart.apply(patch);
        chart.updated_at = Utc::now();
        let updated = chart.clone();
        self.save_list(&list);
        Some(updated)
    }

    /// Remove by id. When the removed chart was active, the head of the
    /// remaining list (if any) becomes active.
    pub fn remove(&self, id: &str) -> bool {
        let mut list = self.list();
        let before = list.len();
        list.retain(|chart| chart.id != id);
        if list.len() == before {
            return false;
        }
        self.save_list(&list);
        if self.active_id().as_deref() == Some(id) {
            self.set_active(list.first().map(|chart| chart.id.as_str()));
        }
        true
    }

    pub fn active_id(&self) -> Option<String> {
        self.kv.read(ACTIVE_KEY)
    }

    pub fn set_active(&self, id: Option<&str>) -> bool {
        match id {
            Some(id) => self.kv.write(ACTIVE_KEY, &id),
            None => self.kv.remove(ACTIVE_KEY),
        }
    }

    pub fn active(&self) -> Option<SavedChart> {
        self.get(&self.active_id()?)
    }

    /// Pre-fill the creation draft from a saved chart so opening it in
    /// the editor shows its fields. Preview is cleared, timestamp bumped.
    pub fn sync_draft_from(&self, id: &str, drafts: &BirthDraftStore) -> bool {
        let Some(chart) = self.get(id) else {
            debug!("no saved chart {} to sync the draft from", id);
            return false;
        };
        let mut draft = chart.to_draft();
        draft.saved_at = Some(Utc::now());
        drafts.save(&draft)
    }

    pub fn set_active_and_sync(&self, id: &str, drafts: &BirthDraftStore) -> bool {
        self.set_active(Some(id));
        self.sync_draft_from(id, drafts)
    }

    fn save_list(&self, list: &[SavedChart]) -> bool {
        self.kv.write(LIST_KEY, &list)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shared::TzId;

    use super::super::memory::MemoryMedium;
    use super::*;

    fn kv() -> Kv {
        Kv::new(Arc::new(MemoryMedium::new()))
    }

    fn new_chart(name: &str) -> NewSavedChart {
        NewSavedChart {
            name: Some(name.to_string()),
            dob: "1990-05-10".to_string(),
            tob: "14:30".to_string(),
            tz_id: TzId::Ist,
            place: "Kolkata".to_string(),
            lat: "22.5726".to_string(),
            lon: "88.3639".to_string(),
            tags: None,
        }
    }

    #[test]
    fn test_add_prepends_and_activates_first_chart() {
        let store = SavedChartStore::new(kv());
        let first = store.add(new_chart("first"));
        let second = store.add(new_chart("second"));

        let list = store.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id, "most recent first");
        assert_eq!(list[1].id, first.id);

        // only the first add claims the active slot
        assert_eq!(store.active_id(), Some(first.id.clone()));
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_update_merges_patch_and_bumps_updated_at() {
        let store = SavedChartStore::new(kv());
        let chart = store.add(new_chart("original"));

        let updated = store
            .update(
                &chart.id,
                SavedChartPatch {
                    name: Some("renamed".to_string()),
                    ..SavedChartPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.id, chart.id);
        assert_eq!(updated.name.as_deref(), Some("renamed"));
        assert_eq!(updated.dob, chart.dob);
        assert!(updated.updated_at >= chart.updated_at);

        assert!(store
            .update("missing", SavedChartPatch::default())
            .is_none());
    }

    #[test]
    fn test_remove_active_promotes_new_head() {
        let store = SavedChartStore::new(kv());
        let a = store.add(new_chart("a"));
        let b = store.add(new_chart("b"));
        let c = store.add(new_chart("c"));

        store.set_active(Some(c.id.as_str()));
        assert!(store.remove(&c.id));

        // list is now [b, a]; the new head takes over
        assert_eq!(store.active_id(), Some(b.id.clone()));
        assert_eq!(store.list().len(), 2);
        assert!(store.get(&a.id).is_some());
    }

    #[test]
    fn test_remove_inactive_keeps_active() {
        let store = SavedChartStore::new(kv());
        let a = store.add(new_chart("a"));
        let b = store.add(new_chart("b"));

        store.set_active(Some(a.id.as_str()));
        assert!(store.remove(&b.id));
        assert_eq!(store.active_id(), Some(a.id));
    }

    #[test]
    fn test_remove_last_chart_clears_active() {
        let store = SavedChartStore::new(kv());
        let only = store.add(new_chart("only"));
        assert!(store.remove(&only.id));
        assert_eq!(store.active_id(), None);
        assert!(store.active().is_none());
    }

    #[test]
    fn test_remove_unknown_id_reports_false() {
        let store = SavedChartStore::new(kv());
        store.add(new_chart("a"));
        assert!(!store.remove("missing"));
    }

    #[test]
    fn test_sync_draft_from_saved_chart() {
        let medium = Arc::new(MemoryMedium::new());
        let store = SavedChartStore::new(Kv::new(medium.clone()));
        let drafts = BirthDraftStore::new(Kv::new(medium));

        let chart = store.add(new_chart("self"));
        assert!(store.set_active_and_sync(&chart.id, &drafts));

        let draft = drafts.load().unwrap();
        assert_eq!(draft.dob, "1990-05-10");
        assert_eq!(draft.tz_id, TzId::Ist);
        assert!(!draft.has_preview());
        assert!(draft.saved_at.is_some());
        assert_eq!(store.active_id(), Some(chart.id));
    }
}
