use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Account identity as the session provider exposes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AuthUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Credentials handed to the session provider after authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginPayload {
    pub user: AuthUser,
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

/// Token lifecycle, owned by the surrounding app and consumed here as an
/// external collaborator. The access token may be absent or expired at
/// any time; callers that hit a 401 ask for one refresh and treat `None`
/// as a dead session.
#[async_trait(?Send)]
pub trait SessionProvider {
    fn user(&self) -> Option<AuthUser>;

    fn access_token(&self) -> Option<String>;

    fn login(&self, payload: LoginPayload);

    async fn logout(&self);

    /// Exchange the refresh token for a new access token. `None` when no
    /// refresh token is held or the exchange was rejected.
    async fn refresh_access(&self) -> Option<String>;
}
