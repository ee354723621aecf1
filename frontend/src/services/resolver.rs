//! Active-profile resolution.
//!
//! On each page load exactly one birth profile becomes "current":
//! the most recent remote chart when the session is authenticated and
//! the account has any, else the local saved list's active entry, else
//! the scratch draft. Lower-precedence sources are never merged in.

use std::sync::Arc;

use chrono::Utc;
use log::warn;

use shared::BirthDraft;

use crate::storage::{BirthDraftStore, SavedChartStore};

use super::remote_charts::RemoteChartsService;
use super::session::SessionProvider;

/// Which precedence level produced the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    Remote,
    LocalActive,
    Draft,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProfile {
    pub draft: BirthDraft,
    pub source: ProfileSource,
}

pub struct ActiveProfileResolver {
    session: Arc<dyn SessionProvider>,
    remote: RemoteChartsService,
    charts: SavedChartStore,
    drafts: BirthDraftStore,
}

impl ActiveProfileResolver {
    pub fn new(
        session: Arc<dyn SessionProvider>,
        remote: RemoteChartsService,
        charts: SavedChartStore,
        drafts: BirthDraftStore,
    ) -> Self {
        Self {
            session,
            remote,
            charts,
            drafts,
        }
    }

    /// Walk the precedence chain and return the first available source,
    /// already projected into the draft shape. A remote fetch failure
    /// (including a dead session) falls through to the local sources.
    pub async fn resolve(&self) -> Option<ResolvedProfile> {
        if self.session.access_token().is_some() {
            match self.remote.fetch_charts().await {
                Ok(rows) => {
                    if let Some(latest) = rows.into_iter().next() {
                        return Some(ResolvedProfile {
                            draft: latest.to_draft(),
                            source: ProfileSource::Remote,
                        });
                    }
                }
                Err(err) => {
                    warn!("remote chart lookup failed, falling back to local: {}", err);
                }
            }
        }

        if let Some(active) = self.charts.active() {
            return Some(ResolvedProfile {
                draft: active.to_draft(),
                source: ProfileSource::LocalActive,
            });
        }

        self.drafts.load().map(|draft| ResolvedProfile {
            draft,
            source: ProfileSource::Draft,
        })
    }

    /// Resolve, then overwrite the draft store with the winner so every
    /// surface re-reads the same profile. When the draft itself won it
    /// is already the store's content and is left untouched.
    pub async fn resolve_and_apply(&self) -> Option<ResolvedProfile> {
        let resolved = self.resolve().await?;
        if resolved.source != ProfileSource::Draft {
            let mut draft = resolved.draft.clone();
            draft.saved_at = Some(Utc::now());
            self.drafts.save(&draft);
        }
        Some(resolved)
    }
}
