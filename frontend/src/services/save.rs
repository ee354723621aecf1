//! The save protocol.
//!
//! Persists one chart against the remote collection with exactly one
//! terminal outcome per invocation: a missing session short-circuits to a
//! login prompt before any network call, a 401 gets one token refresh and
//! one retried write, and a duplicate verdict suspends on an awaited user
//! decision before either reusing the existing chart or forcing a second
//! write. The protocol never touches the local stores; publishing the
//! success events and mutating stores stay with the caller (see
//! [`SaveService::publish_saved`]).

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;

use shared::{ChartPayload, ChartRecord, NewHistoryEvent, RemoteChart};

use crate::events::{AppEvent, EventBus};
use crate::storage::HistoryLog;

use super::api::{ApiError, ChartApi};
use super::session::SessionProvider;

/// The user's answer to a duplicate-chart verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    /// Keep the chart the server matched; nothing new is written.
    UseExisting,
    /// Write anyway, bypassing duplicate detection.
    SaveAnyway,
}

/// Blocking user confirmation for a duplicate chart. Modeled as an
/// awaited future so the rest of the UI keeps running; no timeout — it
/// is bounded only by the user's response.
#[async_trait(?Send)]
pub trait ConflictResolver {
    async fn resolve(&self, existing: &RemoteChart) -> ConflictDecision;
}

/// Terminal failures of one save invocation. Conflicts never surface
/// here; they are resolved inside the protocol via [`ConflictResolver`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SaveError {
    #[error("Please log in to save this chart to your account.")]
    NotLoggedIn,
    #[error("Session expired. Please log in again.")]
    SessionExpired,
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("{0}")]
    Network(String),
}

impl SaveError {
    fn from_api(err: ApiError) -> Self {
        if err.is_network() {
            SaveError::Network(err.message)
        } else {
            SaveError::Rejected {
                status: err.status,
                message: err.message,
            }
        }
    }
}

/// Terminal success of one save invocation. `existing` marks a reused
/// server match (the user accepted the duplicate) as opposed to a
/// genuinely new entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub chart: RemoteChart,
    pub existing: bool,
}

/// Orchestrates session provider, chart API, and event bus to persist a
/// chart exactly once.
pub struct SaveService {
    session: Arc<dyn SessionProvider>,
    api: Arc<dyn ChartApi>,
    bus: EventBus,
    history: Option<HistoryLog>,
}

impl SaveService {
    pub fn new(session: Arc<dyn SessionProvider>, api: Arc<dyn ChartApi>, bus: EventBus) -> Self {
        Self {
            session,
            api,
            bus,
            history: None,
        }
    }

    /// Record successful saves in the local activity history.
    pub fn with_history(mut self, history: HistoryLog) -> Self {
        self.history = Some(history);
        self
    }

    /// Run the protocol to its single terminal outcome. Local state is
    /// untouched; only the login-prompt event may be published here.
    pub async fn save(
        &self,
        payload: ChartPayload,
        resolver: &dyn ConflictResolver,
    ) -> Result<SaveOutcome, SaveError> {
        let mut token = match (self.session.user(), self.session.access_token()) {
            (Some(_), Some(token)) => token,
            _ => {
                info!("chart save attempted without a session");
                self.bus.publish(AppEvent::AuthOpenLogin);
                return Err(SaveError::NotLoggedIn);
            }
        };

        let first = self.api.create_chart(&payload, &token).await;
        let attempt = if matches!(&first, Err(err) if err.is_unauthorized()) {
            debug!("chart save got 401, attempting one token refresh");
            match self.session.refresh_access().await {
                Some(fresh) => {
                    token = fresh;
                    self.api.create_chart(&payload, &token).await
                }
                None => {
                    self.bus.publish(AppEvent::AuthOpenLogin);
                    return Err(SaveError::SessionExpired);
                }
            }
        } else {
            first
        };

        match attempt {
            Ok(chart) => {
                info!("chart saved remotely as id {}", chart.id);
                Ok(SaveOutcome {
                    chart,
                    existing: false,
                })
            }
            // the refreshed token was rejected too; terminal, never loops
            Err(err) if err.is_unauthorized() => {
                warn!("chart save rejected again after token refresh");
                self.bus.publish(AppEvent::AuthOpenLogin);
                Err(SaveError::SessionExpired)
            }
            Err(err) if err.is_conflict() => {
                self.resolve_conflict(payload, token, err, resolver).await
            }
            Err(err) => Err(SaveError::from_api(err)),
        }
    }

    /// Publish the success events for an outcome: a genuinely new chart
    /// appends then refreshes, a reused chart only refreshes.
    pub fn publish_saved(&self, outcome: &SaveOutcome) {
        if !outcome.existing {
            self.bus.publish(AppEvent::ChartsAppend(ChartRecord::Remote(
                outcome.chart.clone(),
            )));
        }
        self.bus.publish(AppEvent::ChartsRefresh);
    }

    /// [`SaveService::save`] plus the caller-side bookkeeping: success
    /// events and, when configured, a history entry for new charts.
    pub async fn save_and_publish(
        &self,
        payload: ChartPayload,
        resolver: &dyn ConflictResolver,
    ) -> Result<SaveOutcome, SaveError> {
        let outcome = self.save(payload, resolver).await?;
        self.publish_saved(&outcome);
        if !outcome.existing {
            if let Some(history) = &self.history {
                history.log(NewHistoryEvent::chart_saved(&outcome.chart));
            }
        }
        Ok(outcome)
    }

    async fn resolve_conflict(
        &self,
        payload: ChartPayload,
        token: String,
        err: ApiError,
        resolver: &dyn ConflictResolver,
    ) -> Result<SaveOutcome, SaveError> {
        let Some(detail) = err.conflict_detail() else {
            // 409 without the documented body leaves nothing to offer the user
            return Err(SaveError::from_api(err));
        };
        info!(
            "duplicate chart detected, awaiting user decision (existing id {})",
            detail.existing.id
        );
        match resolver.resolve(&detail.existing).await {
            ConflictDecision::UseExisting => Ok(SaveOutcome {
                chart: detail.existing,
                existing: true,
            }),
            ConflictDecision::SaveAnyway => {
                // pick up a fresher token when one is available; the one
                // in hand still works otherwise
                let token = self.session.refresh_access().await.unwrap_or(token);
                match self.api.create_chart(&payload.forced(), &token).await {
                    Ok(chart) => Ok(SaveOutcome {
                        chart,
                        existing: false,
                    }),
                    // includes a repeated 409: surfaced, not re-prompted
                    Err(err) => Err(SaveError::from_api(err)),
                }
            }
        }
    }
}
