pub mod error;
#[cfg(test)]
pub mod mock;
pub mod proxy;

pub use error::GitHubError;
pub use proxy::ProxyForwarder;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;

use crate::models::window::AnalysisWindow;

/// Placeholder substituted with the username in endpoint templates
pub const USERNAME_PLACEHOLDER: &str = "{username}";

/// Endpoint templates consumed by the stats pipeline
pub mod endpoints {
    use super::AnalysisWindow;

    pub const PROFILE: &str = "/users/{username}";
    pub const REPOSITORIES: &str = "/users/{username}/repos?sort=updated";
    pub const EVENTS: &str = "/users/{username}/events";
    pub const RECEIVED_EVENTS: &str = "/users/{username}/received_events";

    /// Commit search restricted to the window, one result per page since only
    /// `total_count` is read
    pub fn commit_search(window: &AnalysisWindow) -> String {
        format!(
            "/search/commits?q=author:{{username}}+committer-date:{}..{}&per_page=1",
            window.start_date().format("%Y-%m-%d"),
            window.end_date().format("%Y-%m-%d"),
        )
    }
}

/// One upstream GET: the `(username, token?, endpoint)` triple
#[derive(Clone)]
pub struct ProxyRequest {
    pub username: String,
    pub token: Option<String>,
    pub endpoint: String,
}

impl ProxyRequest {
    pub fn new(username: &str, token: Option<&str>, endpoint: impl Into<String>) -> Self {
        Self {
            username: username.to_string(),
            token: token
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            endpoint: endpoint.into(),
        }
    }

    /// Same user and token, different endpoint
    pub fn with_endpoint(&self, endpoint: impl Into<String>) -> Self {
        Self {
            username: self.username.clone(),
            token: self.token.clone(),
            endpoint: endpoint.into(),
        }
    }

    pub fn resolved_endpoint(&self) -> String {
        self.endpoint.replace(USERNAME_PLACEHOLDER, &self.username)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

// Tokens must never reach the logs
impl fmt::Debug for ProxyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyRequest")
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// The only path from the stats pipeline to GitHub
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Issue one GET and return the upstream JSON body unchanged
    async fn forward(
        &self,
        request: &ProxyRequest,
        timeout: Duration,
    ) -> Result<JsonValue, GitHubError>;
}

/// Decode an upstream body into a typed shape
pub fn decode<T: DeserializeOwned>(value: JsonValue, what: &str) -> Result<T, GitHubError> {
    serde_json::from_value(value)
        .map_err(|e| GitHubError::Core(format!("Unexpected {} response shape: {}", what, e)))
}
