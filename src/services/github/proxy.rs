use super::{Forwarder, GitHubError, ProxyRequest};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::utils::config::Config;
use crate::utils::http_client::USER_AGENT_VALUE;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Forwards requests to the GitHub REST API over reqwest.
///
/// Every call is capped at the platform budget (execution limit minus the
/// safety buffer) so a timeout is reported before the host would kill us.
pub struct ProxyForwarder {
    http: Client,
    api_base_url: String,
    call_budget: Duration,
}

impl ProxyForwarder {
    pub fn new(http: Client, api_base_url: &str, call_budget: Duration) -> Self {
        Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            call_budget,
        }
    }

    pub fn from_config(http: Client, config: &Config) -> Self {
        Self::new(http, &config.github_api_base_url, config.platform_budget())
    }

    fn effective_timeout(&self, requested: Duration) -> Duration {
        requested.min(self.call_budget)
    }

    async fn send(&self, request: &ProxyRequest, url: &str) -> Result<JsonValue, GitHubError> {
        let mut builder = self
            .http
            .get(url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, USER_AGENT_VALUE);

        if let Some(token) = request.token.as_deref() {
            builder = builder.header(AUTHORIZATION, format!("token {}", token));
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GitHubError::Timeout {
                    timeout_ms: self.call_budget.as_millis() as u64,
                }
            } else {
                GitHubError::Core(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let remaining = response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok());
            let error = GitHubError::from_status(status.as_u16(), remaining, &request.username);
            log::warn!(
                "GitHub proxy: {} returned {} ({})",
                request.endpoint,
                status,
                error.code()
            );
            return Err(error);
        }

        response
            .json::<JsonValue>()
            .await
            .map_err(|e| GitHubError::Core(format!("Invalid JSON from GitHub: {}", e)))
    }
}

#[async_trait]
impl Forwarder for ProxyForwarder {
    async fn forward(
        &self,
        request: &ProxyRequest,
        timeout: Duration,
    ) -> Result<JsonValue, GitHubError> {
        let timeout = self.effective_timeout(timeout);
        let url = format!("{}{}", self.api_base_url, request.resolved_endpoint());

        log::debug!(
            "GitHub proxy: {} request for {}",
            if request.is_authenticated() {
                "token-authenticated"
            } else {
                "unauthenticated"
            },
            request.endpoint
        );

        match tokio::time::timeout(timeout, self.send(request, &url)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "⏱️  GitHub proxy: {} timed out after {}ms",
                    request.endpoint,
                    timeout.as_millis()
                );
                Err(GitHubError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}
