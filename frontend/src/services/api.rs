//! Chart API client interface and error taxonomy.
//!
//! Every call carries a bearer token and fails with a typed
//! [`ApiError`] holding the HTTP status and the parsed body. Transport
//! failures are normalized to status 0 so callers can branch on status
//! alone. The HTTP implementation is compiled for wasm32 targets; tests
//! script the trait directly.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use shared::{ChartPayload, RemoteChart};

/// Remote chart collection path.
pub const CHARTS_PATH: &str = "/charts/";

/// Path for one chart in the collection.
pub fn chart_path(id: i64) -> String {
    format!("/charts/{}/", id)
}

/// Typed failure from the chart API. Status 0 means the request never
/// produced an HTTP response (network failure, serialization).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub body: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self {
            status,
            message: message.into(),
            body,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(0, message, None)
    }

    pub fn is_network(&self) -> bool {
        self.status == 0
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    /// The duplicate-chart detail a 409 response carries, when the body
    /// has the documented `{ detail: { message, existing } }` shape.
    pub fn conflict_detail(&self) -> Option<ConflictDetail> {
        let body = self.body.clone()?;
        serde_json::from_value::<ConflictBody>(body)
            .ok()
            .map(|b| b.detail)
    }
}

/// Server-side duplicate verdict: the human-readable reason plus the
/// chart it matched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConflictDetail {
    pub message: String,
    pub existing: RemoteChart,
}

#[derive(Deserialize)]
struct ConflictBody {
    detail: ConflictDetail,
}

/// Pull a display message out of an error body, trying the common
/// field-error shapes before giving up on the fallback.
pub fn message_from_body(body: &serde_json::Value, fallback: &str) -> String {
    if let Some(obj) = body.as_object() {
        if let Some(detail) = obj.get("detail").and_then(|v| v.as_str()) {
            return detail.to_string();
        }
        if let Some(message) = obj.get("message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
        if let Some(first) = obj
            .get("non_field_errors")
            .and_then(|v| v.as_array())
            .and_then(|a| a.first())
            .and_then(|v| v.as_str())
        {
            return first.to_string();
        }
        // field error shapes: { field: ["err"] }
        for value in obj.values() {
            if let Some(first) = value
                .as_array()
                .and_then(|a| a.first())
                .and_then(|v| v.as_str())
            {
                return first.to_string();
            }
        }
    }
    fallback.to_string()
}

/// The remote chart collection, account-scoped by the bearer token.
#[async_trait(?Send)]
pub trait ChartApi {
    /// `GET /charts/`
    async fn list_charts(&self, token: &str) -> Result<Vec<RemoteChart>, ApiError>;

    /// `POST /charts/`. A 409 means the server judged the payload a
    /// duplicate; `payload.force` bypasses that check.
    async fn create_chart(&self, payload: &ChartPayload, token: &str)
        -> Result<RemoteChart, ApiError>;

    /// `DELETE /charts/{id}/`
    async fn delete_chart(&self, id: i64, token: &str) -> Result<(), ApiError>;
}

#[cfg(target_arch = "wasm32")]
pub use http::HttpApi;

#[cfg(target_arch = "wasm32")]
mod http {
    use gloo::net::http::{Request, Response};
    use serde::de::DeserializeOwned;

    use super::*;

    /// HTTP implementation of [`ChartApi`]. An empty base URL keeps
    /// paths relative so a same-origin proxy can route them.
    pub struct HttpApi {
        base_url: String,
    }

    impl HttpApi {
        pub fn new() -> Self {
            Self {
                base_url: String::new(),
            }
        }

        pub fn with_base_url(base_url: String) -> Self {
            Self {
                base_url: base_url.trim_end_matches('/').to_string(),
            }
        }

        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base_url, path)
        }

        fn bearer(token: &str) -> String {
            format!("Bearer {}", token)
        }

        async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let body: Option<serde_json::Value> = serde_json::from_str(&text).ok();
            if !(200..300).contains(&status) {
                return Err(Self::status_error(status, body));
            }
            match body {
                Some(value) => serde_json::from_value(value).map_err(|err| {
                    ApiError::new(status, format!("Failed to parse response: {}", err), None)
                }),
                None => Err(ApiError::new(status, "Empty response body", None)),
            }
        }

        async fn expect_ok(response: Response) -> Result<(), ApiError> {
            let status = response.status();
            if (200..300).contains(&status) {
                return Ok(());
            }
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str(&text).ok();
            Err(Self::status_error(status, body))
        }

        fn status_error(status: u16, body: Option<serde_json::Value>) -> ApiError {
            let fallback = format!("HTTP {}", status);
            let message = body
                .as_ref()
                .map(|b| message_from_body(b, &fallback))
                .unwrap_or(fallback);
            ApiError::new(status, message, body)
        }
    }

    impl Default for HttpApi {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait(?Send)]
    impl ChartApi for HttpApi {
        async fn list_charts(&self, token: &str) -> Result<Vec<RemoteChart>, ApiError> {
            let response = Request::get(&self.url(CHARTS_PATH))
                .header("Accept", "application/json")
                .header("Authorization", &Self::bearer(token))
                .send()
                .await
                .map_err(|err| ApiError::network(err.to_string()))?;
            Self::decode(response).await
        }

        async fn create_chart(
            &self,
            payload: &ChartPayload,
            token: &str,
        ) -> Result<RemoteChart, ApiError> {
            let response = Request::post(&self.url(CHARTS_PATH))
                .header("Accept", "application/json")
                .header("Authorization", &Self::bearer(token))
                .json(payload)
                .map_err(|err| ApiError::network(err.to_string()))?
                .send()
                .await
                .map_err(|err| ApiError::network(err.to_string()))?;
            Self::decode(response).await
        }

        async fn delete_chart(&self, id: i64, token: &str) -> Result<(), ApiError> {
            let response = Request::delete(&self.url(&chart_path(id)))
                .header("Authorization", &Self::bearer(token))
                .send()
                .await
                .map_err(|err| ApiError::network(err.to_string()))?;
            Self::expect_ok(response).await
        }
    }
}
