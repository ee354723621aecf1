//! Shared test doubles: a scriptable session provider and chart API, a
//! canned conflict decision, an event recorder, and fixtures.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;

use shared::{ChartPayload, RemoteChart};

use crate::events::{AppEvent, EventBus, Topic};
use crate::services::api::{ApiError, ChartApi};
use crate::services::save::{ConflictDecision, ConflictResolver};
use crate::services::session::{AuthUser, LoginPayload, SessionProvider};

/// Session provider with a fixed user/token and a scripted refresh
/// outcome. Counts refresh calls.
pub struct StubSession {
    user: Option<AuthUser>,
    access: RefCell<Option<String>>,
    refresh_to: Option<String>,
    pub refresh_calls: Cell<usize>,
}

impl StubSession {
    pub fn logged_in(token: &str) -> Self {
        Self {
            user: Some(AuthUser {
                id: Some("1".to_string()),
                username: Some("tester".to_string()),
                email: None,
            }),
            access: RefCell::new(Some(token.to_string())),
            refresh_to: None,
            refresh_calls: Cell::new(0),
        }
    }

    pub fn logged_out() -> Self {
        Self {
            user: None,
            access: RefCell::new(None),
            refresh_to: None,
            refresh_calls: Cell::new(0),
        }
    }

    /// What the next refresh attempts yield; `None` models a dead
    /// refresh token.
    pub fn refreshing_to(mut self, token: Option<&str>) -> Self {
        self.refresh_to = token.map(str::to_string);
        self
    }
}

#[async_trait(?Send)]
impl SessionProvider for StubSession {
    fn user(&self) -> Option<AuthUser> {
        self.user.clone()
    }

    fn access_token(&self) -> Option<String> {
        self.access.borrow().clone()
    }

    fn login(&self, payload: LoginPayload) {
        *self.access.borrow_mut() = Some(payload.access);
    }

    async fn logout(&self) {
        *self.access.borrow_mut() = None;
    }

    async fn refresh_access(&self) -> Option<String> {
        self.refresh_calls.set(self.refresh_calls.get() + 1);
        let fresh = self.refresh_to.clone();
        if let Some(token) = &fresh {
            *self.access.borrow_mut() = Some(token.clone());
        }
        fresh
    }
}

/// One recorded `POST /charts/` call.
pub struct RecordedCreate {
    pub force: bool,
    pub token: String,
}

/// Chart API double fed from per-method response queues; records every
/// call it sees. An unscripted call fails as a network error.
#[derive(Default)]
pub struct ScriptedApi {
    create_results: RefCell<VecDeque<Result<RemoteChart, ApiError>>>,
    list_results: RefCell<VecDeque<Result<Vec<RemoteChart>, ApiError>>>,
    delete_results: RefCell<VecDeque<Result<(), ApiError>>>,
    pub creates: RefCell<Vec<RecordedCreate>>,
    pub list_tokens: RefCell<Vec<String>>,
    pub delete_calls: RefCell<Vec<(i64, String)>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_create(&self, result: Result<RemoteChart, ApiError>) {
        self.create_results.borrow_mut().push_back(result);
    }

    pub fn push_list(&self, result: Result<Vec<RemoteChart>, ApiError>) {
        self.list_results.borrow_mut().push_back(result);
    }

    pub fn push_delete(&self, result: Result<(), ApiError>) {
        self.delete_results.borrow_mut().push_back(result);
    }
}

#[async_trait(?Send)]
impl ChartApi for ScriptedApi {
    async fn list_charts(&self, token: &str) -> Result<Vec<RemoteChart>, ApiError> {
        self.list_tokens.borrow_mut().push(token.to_string());
        self.list_results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::network("unscripted list_charts call")))
    }

    async fn create_chart(
        &self,
        payload: &ChartPayload,
        token: &str,
    ) -> Result<RemoteChart, ApiError> {
        self.creates.borrow_mut().push(RecordedCreate {
            force: payload.force,
            token: token.to_string(),
        });
        self.create_results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::network("unscripted create_chart call")))
    }

    async fn delete_chart(&self, id: i64, token: &str) -> Result<(), ApiError> {
        self.delete_calls.borrow_mut().push((id, token.to_string()));
        self.delete_results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::network("unscripted delete_chart call")))
    }
}

/// Resolver that always answers the same way; counts prompts.
pub struct DecideResolver {
    decision: ConflictDecision,
    pub prompts: Cell<usize>,
}

impl DecideResolver {
    pub fn new(decision: ConflictDecision) -> Self {
        Self {
            decision,
            prompts: Cell::new(0),
        }
    }
}

#[async_trait(?Send)]
impl ConflictResolver for DecideResolver {
    async fn resolve(&self, _existing: &RemoteChart) -> ConflictDecision {
        self.prompts.set(self.prompts.get() + 1);
        self.decision
    }
}

/// Subscribe to every topic and collect delivered events in order. The
/// subscriptions stay alive for the life of the bus.
pub fn record_events(bus: &EventBus) -> Rc<RefCell<Vec<AppEvent>>> {
    let events: Rc<RefCell<Vec<AppEvent>>> = Rc::default();
    for topic in [
        Topic::ChartsAppend,
        Topic::ChartsRefresh,
        Topic::AuthLoggedIn,
        Topic::AuthOpenLogin,
    ] {
        let sink = Rc::clone(&events);
        let _ = bus.subscribe(topic, move |event| sink.borrow_mut().push(event.clone()));
    }
    events
}

/// Remote chart fixture born 1990-05-10T09:00:00Z in Asia/Kolkata.
pub fn remote_chart(id: i64, created_at: &str) -> RemoteChart {
    RemoteChart {
        id,
        name: Some(format!("Chart {}", id)),
        birth_datetime: "1990-05-10T09:00:00Z".parse().unwrap(),
        latitude: 22.5726,
        longitude: 88.3639,
        timezone: "Asia/Kolkata".to_string(),
        place: Some("Kolkata".to_string()),
        created_at: created_at.parse().unwrap(),
    }
}

/// Payload matching [`remote_chart`].
pub fn payload() -> ChartPayload {
    ChartPayload {
        name: Some("Chart".to_string()),
        birth_datetime: "1990-05-10T09:00:00Z".parse().unwrap(),
        latitude: 22.5726,
        longitude: 88.3639,
        timezone: "Asia/Kolkata".to_string(),
        place: Some("Kolkata".to_string()),
        force: false,
    }
}

/// The 409 an existing match produces, body in the documented shape.
pub fn conflict_error(existing: &RemoteChart) -> ApiError {
    ApiError::new(
        409,
        "Duplicate chart",
        Some(serde_json::json!({
            "detail": {
                "message": "Duplicate chart",
                "existing": existing,
            }
        })),
    )
}
