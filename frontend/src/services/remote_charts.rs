//! Account-scoped chart list access and the reconciliation model every
//! chart-displaying surface shares.

use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use shared::{ChartRecord, RemoteChart};

use super::api::{ApiError, ChartApi};
use super::session::SessionProvider;

/// Read/delete access to the remote saved-chart collection with the
/// standard 401 handling: one transparent refresh-and-retry.
pub struct RemoteChartsService {
    session: Arc<dyn SessionProvider>,
    api: Arc<dyn ChartApi>,
}

impl RemoteChartsService {
    pub fn new(session: Arc<dyn SessionProvider>, api: Arc<dyn ChartApi>) -> Self {
        Self { session, api }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.access_token().is_some()
    }

    /// Fetch the saved list, most recent first.
    pub async fn fetch_charts(&self) -> Result<Vec<RemoteChart>, ApiError> {
        let token = self.require_token()?;
        let mut rows = match self.api.list_charts(&token).await {
            Err(err) if err.is_unauthorized() => {
                debug!("chart list fetch got 401, retrying with a refreshed token");
                match self.session.refresh_access().await {
                    Some(fresh) => self.api.list_charts(&fresh).await?,
                    None => return Err(err),
                }
            }
            other => other?,
        };
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    pub async fn delete_chart(&self, id: i64) -> Result<(), ApiError> {
        let token = self.require_token()?;
        match self.api.delete_chart(id, &token).await {
            Err(err) if err.is_unauthorized() => {
                debug!("chart delete got 401, retrying with a refreshed token");
                match self.session.refresh_access().await {
                    Some(fresh) => self.api.delete_chart(id, &fresh).await,
                    None => Err(err),
                }
            }
            other => other,
        }
    }

    fn require_token(&self) -> Result<String, ApiError> {
        self.session
            .access_token()
            .ok_or_else(|| ApiError::new(401, "Not authenticated", None))
    }
}

/// Order-independent reconciliation of the records a surface displays.
///
/// Subscribers feeding any interleaving of `charts:append` records and
/// full refreshes through this model converge to the same set: union by
/// id, the most recently seen version of a record wins, kept sorted by
/// recency, optionally capped (e.g. a top-3 preview).
#[derive(Debug, Clone, Default)]
pub struct ChartListModel {
    records: Vec<ChartRecord>,
    cap: Option<usize>,
}

impl ChartListModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            records: Vec::new(),
            cap: Some(cap),
        }
    }

    pub fn records(&self) -> &[ChartRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Integrate one appended record.
    pub fn append(&mut self, record: ChartRecord) {
        self.records.insert(0, record);
        self.normalize();
    }

    /// Integrate a full re-read of the remote source of truth. Server
    /// versions win over anything already held with the same id.
    pub fn merge_remote(&mut self, charts: Vec<RemoteChart>) {
        let mut next: Vec<ChartRecord> = charts.into_iter().map(ChartRecord::Remote).collect();
        next.extend(self.records.drain(..));
        self.records = next;
        self.normalize();
    }

    pub fn remove(&mut self, key: &str) {
        self.records.retain(|record| record.dedupe_key() != key);
    }

    fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.records.retain(|record| seen.insert(record.dedupe_key()));
        self.records.sort_by(|a, b| b.recency().cmp(&a.recency()));
        if let Some(cap) = self.cap {
            self.records.truncate(cap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{remote_chart, ScriptedApi, StubSession};

    #[tokio::test]
    async fn test_fetch_sorts_most_recent_first() {
        let session = Arc::new(StubSession::logged_in("t1"));
        let api = Arc::new(ScriptedApi::new());
        api.push_list(Ok(vec![
            remote_chart(1, "2023-01-01T00:00:00Z"),
            remote_chart(3, "2024-06-01T00:00:00Z"),
            remote_chart(2, "2024-01-01T00:00:00Z"),
        ]));

        let svc = RemoteChartsService::new(session, api);
        let rows = svc.fetch_charts().await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_fetch_retries_once_after_401() {
        let session = Arc::new(StubSession::logged_in("t1").refreshing_to(Some("t2")));
        let api = Arc::new(ScriptedApi::new());
        api.push_list(Err(ApiError::new(401, "token expired", None)));
        api.push_list(Ok(vec![remote_chart(1, "2024-01-01T00:00:00Z")]));

        let svc = RemoteChartsService::new(session.clone(), api.clone());
        let rows = svc.fetch_charts().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(session.refresh_calls.get(), 1);
        assert_eq!(*api.list_tokens.borrow(), vec!["t1".to_string(), "t2".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_with_failed_refresh_returns_the_401() {
        let session = Arc::new(StubSession::logged_in("t1").refreshing_to(None));
        let api = Arc::new(ScriptedApi::new());
        api.push_list(Err(ApiError::new(401, "token expired", None)));

        let svc = RemoteChartsService::new(session, api.clone());
        let err = svc.fetch_charts().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(api.list_tokens.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_without_token_never_calls_the_api() {
        let session = Arc::new(StubSession::logged_out());
        let api = Arc::new(ScriptedApi::new());
        let svc = RemoteChartsService::new(session, api.clone());
        assert!(!svc.is_authenticated());
        let err = svc.fetch_charts().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(api.list_tokens.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_delete_retries_once_after_401() {
        let session = Arc::new(StubSession::logged_in("t1").refreshing_to(Some("t2")));
        let api = Arc::new(ScriptedApi::new());
        api.push_delete(Err(ApiError::new(401, "token expired", None)));
        api.push_delete(Ok(()));

        let svc = RemoteChartsService::new(session, api.clone());
        svc.delete_chart(7).await.unwrap();
        let calls = api.delete_calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], (7, "t1".to_string()));
        assert_eq!(calls[1], (7, "t2".to_string()));
    }

    #[test]
    fn test_model_converges_regardless_of_interleaving() {
        let appended = remote_chart(9, "2024-05-01T00:00:00Z");
        let listed = vec![
            remote_chart(1, "2024-01-01T00:00:00Z"),
            remote_chart(2, "2024-02-01T00:00:00Z"),
        ];

        let mut append_first = ChartListModel::new();
        append_first.append(ChartRecord::Remote(appended.clone()));
        append_first.merge_remote(listed.clone());

        let mut refresh_first = ChartListModel::new();
        refresh_first.merge_remote(listed);
        refresh_first.append(ChartRecord::Remote(appended));

        assert_eq!(append_first.records(), refresh_first.records());
        let keys: Vec<String> = append_first
            .records()
            .iter()
            .map(|r| r.dedupe_key())
            .collect();
        assert_eq!(keys, vec!["9", "2", "1"]);
    }

    #[test]
    fn test_model_dedupes_by_id_keeping_latest_seen() {
        let mut model = ChartListModel::new();
        let stale = remote_chart(7, "2024-01-01T00:00:00Z");
        let fresh = RemoteChart {
            name: Some("Renamed".to_string()),
            ..remote_chart(7, "2024-01-01T00:00:00Z")
        };
        model.append(ChartRecord::Remote(stale));
        model.append(ChartRecord::Remote(fresh));

        assert_eq!(model.len(), 1);
        match &model.records()[0] {
            ChartRecord::Remote(chart) => assert_eq!(chart.name.as_deref(), Some("Renamed")),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_model_cap_keeps_the_most_recent() {
        let mut model = ChartListModel::with_cap(3);
        model.merge_remote(vec![
            remote_chart(1, "2024-01-01T00:00:00Z"),
            remote_chart(2, "2024-02-01T00:00:00Z"),
            remote_chart(3, "2024-03-01T00:00:00Z"),
            remote_chart(4, "2024-04-01T00:00:00Z"),
        ]);
        let keys: Vec<String> = model.records().iter().map(|r| r.dedupe_key()).collect();
        assert_eq!(keys, vec!["4", "3", "2"]);
    }

    #[test]
    fn test_model_remove() {
        let mut model = ChartListModel::new();
        model.merge_remote(vec![
            remote_chart(1, "2024-01-01T00:00:00Z"),
            remote_chart(2, "2024-02-01T00:00:00Z"),
        ]);
        model.remove("2");
        assert_eq!(model.len(), 1);
        assert_eq!(model.records()[0].dedupe_key(), "1");
    }
}
