use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A commit reference carried by a push event payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub commits: Vec<CommitRef>,
}

/// Event type with the payload fields we actually read.
/// Only pushes carry a payload; everything else is identified by type alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Push(PushPayload),
    Create,
    Issues,
    PullRequest,
    IssueComment,
    PullRequestReview,
    PullRequestReviewComment,
    /// Synthesized from a repository's `updated_at`, never returned by GitHub
    RepositoryUpdate,
    Other(String),
}

impl EventKind {
    pub fn from_wire(event_type: &str, payload: Option<JsonValue>) -> Self {
        match event_type {
            "PushEvent" => {
                // A payload we can't read still counts as one push
                let payload = payload
                    .and_then(|p| serde_json::from_value::<PushPayload>(p).ok())
                    .unwrap_or_default();
                EventKind::Push(payload)
            }
            "CreateEvent" => EventKind::Create,
            "IssuesEvent" => EventKind::Issues,
            "PullRequestEvent" => EventKind::PullRequest,
            "IssueCommentEvent" => EventKind::IssueComment,
            "PullRequestReviewEvent" => EventKind::PullRequestReview,
            "PullRequestReviewCommentEvent" => EventKind::PullRequestReviewComment,
            other => EventKind::Other(other.to_string()),
        }
    }
}

/// One activity event, from any source. Identity is `id`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "GitHubEvent")]
pub struct RawEvent {
    pub id: String,
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
    pub repo_name: Option<String>,
}

impl RawEvent {
    /// Number of commits referenced by a push, 0 for other kinds
    pub fn commit_count(&self) -> usize {
        match &self.kind {
            EventKind::Push(payload) => payload.commits.len(),
            _ => 0,
        }
    }
}

// GitHub Events API response types

#[derive(Debug, Deserialize)]
struct GitHubEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created_at: DateTime<Utc>,
    repo: Option<GitHubEventRepo>,
    payload: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct GitHubEventRepo {
    name: String,
}

impl From<GitHubEvent> for RawEvent {
    fn from(event: GitHubEvent) -> Self {
        RawEvent {
            id: event.id,
            kind: EventKind::from_wire(&event.event_type, event.payload),
            created_at: event.created_at,
            repo_name: event.repo.map(|r| r.name),
        }
    }
}
