use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use crate::services::github::GitHubError;

/// Why an analysis run produced no snapshot
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    /// The whole run overran its budget, as opposed to a single call timing out
    #[error("ANALYSIS_DEADLINE_EXCEEDED: analysis took {elapsed_ms}ms, budget is {budget_ms}ms")]
    DeadlineExceeded { elapsed_ms: u64, budget_ms: u64 },

    #[error("INVALID_USERNAME: {0}")]
    InvalidUsername(String),

    #[error("INVALID_YEAR: {0} has not started yet")]
    InvalidYear(i32),
}

impl AnalysisError {
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::GitHub(e) => e.code(),
            AnalysisError::DeadlineExceeded { .. } => "ANALYSIS_DEADLINE_EXCEEDED",
            AnalysisError::InvalidUsername(_) => "INVALID_USERNAME",
            AnalysisError::InvalidYear(_) => "INVALID_YEAR",
        }
    }

    /// Text shown on the entry screen after a failed analysis
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::GitHub(GitHubError::AuthInvalid) => {
                "The provided Personal Access Token is unauthorized or has expired.".to_string()
            }
            AnalysisError::GitHub(GitHubError::RateLimited) => {
                "GitHub's API quota is exhausted. Add a Personal Access Token to raise your rate limit, then try again.".to_string()
            }
            AnalysisError::GitHub(GitHubError::Forbidden) => {
                "GitHub denied access. Some of this profile's data may be private.".to_string()
            }
            AnalysisError::GitHub(GitHubError::NotFound { username }) => {
                format!("The GitHub user \"{}\" does not exist.", username)
            }
            AnalysisError::GitHub(GitHubError::ServerError { .. }) => {
                "GitHub is having trouble right now. Please try again in a moment.".to_string()
            }
            AnalysisError::GitHub(GitHubError::Timeout { .. }) => {
                "GitHub took too long to respond. Please retry.".to_string()
            }
            AnalysisError::GitHub(GitHubError::Core(message)) => {
                format!("Something went wrong while reading GitHub data: {}", message)
            }
            AnalysisError::DeadlineExceeded { .. } => {
                "The analysis ran out of time. Please retry; a Personal Access Token usually makes it faster.".to_string()
            }
            AnalysisError::InvalidUsername(reason) => reason.clone(),
            AnalysisError::InvalidYear(year) => format!("{} has not started yet.", year),
        }
    }
}

impl ResponseError for AnalysisError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::GitHub(GitHubError::AuthInvalid) => StatusCode::UNAUTHORIZED,
            AnalysisError::GitHub(GitHubError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            AnalysisError::GitHub(GitHubError::Forbidden) => StatusCode::FORBIDDEN,
            AnalysisError::GitHub(GitHubError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AnalysisError::GitHub(GitHubError::ServerError { .. }) => StatusCode::BAD_GATEWAY,
            AnalysisError::GitHub(GitHubError::Timeout { .. })
            | AnalysisError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
            AnalysisError::GitHub(GitHubError::Core(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AnalysisError::InvalidUsername(_) | AnalysisError::InvalidYear(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": self.user_message(),
        }))
    }
}
