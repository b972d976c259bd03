//! Scripted `Forwarder` for pipeline and handler tests, plus GitHub JSON fixtures.

use super::{Forwarder, GitHubError, ProxyRequest};
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::sync::Mutex;
use std::time::Duration;

type Responder = Box<dyn Fn(&str) -> Result<JsonValue, GitHubError> + Send + Sync>;

pub struct MockForwarder {
    respond: Responder,
    delays: Vec<(String, Duration)>,
    calls: Mutex<Vec<String>>,
}

impl MockForwarder {
    /// `respond` receives the resolved endpoint, e.g. `/users/octocat/events?per_page=100&page=1`
    pub fn new(
        respond: impl Fn(&str) -> Result<JsonValue, GitHubError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            delays: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering any endpoint starting with `prefix`
    pub fn with_delay(mut self, prefix: &str, delay: Duration) -> Self {
        self.delays.push((prefix.to_string(), delay));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|endpoint| endpoint.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl Forwarder for MockForwarder {
    async fn forward(
        &self,
        request: &ProxyRequest,
        _timeout: Duration,
    ) -> Result<JsonValue, GitHubError> {
        let endpoint = request.resolved_endpoint();
        self.calls.lock().unwrap().push(endpoint.clone());

        let delay = self
            .delays
            .iter()
            .find(|(prefix, _)| endpoint.starts_with(prefix.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        (self.respond)(&endpoint)
    }
}

/// Value of the `page` query parameter
pub fn page_param(endpoint: &str) -> Option<u32> {
    let query = endpoint.split_once('?')?.1;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

pub fn profile_json(login: &str) -> JsonValue {
    json!({
        "login": login,
        "avatar_url": format!("https://avatars.githubusercontent.com/{}", login),
        "html_url": format!("https://github.com/{}", login),
        "followers": 12,
        "following": 3,
        "created_at": "2019-04-01T00:00:00Z",
        "bio": "Writes code",
        "company": null,
        "location": "Berlin"
    })
}

pub fn repo_json(id: u64, name: &str, updated_at: &str, created_at: &str, language: Option<&str>, stars: u32) -> JsonValue {
    json!({
        "id": id,
        "name": name,
        "full_name": format!("octocat/{}", name),
        "html_url": format!("https://github.com/octocat/{}", name),
        "description": null,
        "language": language,
        "stargazers_count": stars,
        "updated_at": updated_at,
        "created_at": created_at,
        "private": false
    })
}

pub fn push_event_json(id: &str, created_at: &str, commits: usize) -> JsonValue {
    let commits: Vec<JsonValue> = (0..commits)
        .map(|i| json!({ "sha": format!("{}-{}", id, i), "message": "change" }))
        .collect();
    json!({
        "id": id,
        "type": "PushEvent",
        "created_at": created_at,
        "repo": { "name": "octocat/hello" },
        "payload": { "commits": commits }
    })
}

pub fn event_json(id: &str, event_type: &str, created_at: &str) -> JsonValue {
    json!({
        "id": id,
        "type": event_type,
        "created_at": created_at,
        "repo": { "name": "octocat/hello" },
        "payload": {}
    })
}
