use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

/// Normalized GitHub failure. The `Display` form is the wire string
/// `<CODE>: <message>` that clients pattern-match on.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GitHubError {
    #[error("GITHUB_AUTH_INVALID: The provided Personal Access Token is unauthorized or has expired.")]
    AuthInvalid,

    #[error("GITHUB_RATE_LIMIT: API quota exceeded. Please use a Personal Access Token to increase your limits.")]
    RateLimited,

    #[error("GITHUB_FORBIDDEN: Access denied. This may be due to repository privacy restrictions.")]
    Forbidden,

    #[error("GITHUB_USER_NOT_FOUND: The user profile \"{username}\" does not exist.")]
    NotFound { username: String },

    #[error("GITHUB_SERVER_ERROR: GitHub API returned a server error ({status}). Please try again in a moment.")]
    ServerError { status: u16 },

    #[error("GITHUB_API_TIMEOUT: GitHub API request timed out after {timeout_ms}ms. The API may be slow or rate-limited.")]
    Timeout { timeout_ms: u64 },

    #[error("GITHUB_CORE_ERROR: {0}")]
    Core(String),
}

impl GitHubError {
    /// Map a non-success upstream status to the taxonomy
    pub fn from_status(status: u16, rate_limit_remaining: Option<&str>, username: &str) -> Self {
        match status {
            401 => GitHubError::AuthInvalid,
            403 if rate_limit_remaining.map(str::trim) == Some("0") => GitHubError::RateLimited,
            403 => GitHubError::Forbidden,
            404 => GitHubError::NotFound {
                username: username.to_string(),
            },
            500..=599 => GitHubError::ServerError { status },
            _ => GitHubError::Core(format!("GitHub API error: {}", status)),
        }
    }

    /// Stable machine-matchable code
    pub fn code(&self) -> &'static str {
        match self {
            GitHubError::AuthInvalid => "GITHUB_AUTH_INVALID",
            GitHubError::RateLimited => "GITHUB_RATE_LIMIT",
            GitHubError::Forbidden => "GITHUB_FORBIDDEN",
            GitHubError::NotFound { .. } => "GITHUB_USER_NOT_FOUND",
            GitHubError::ServerError { .. } => "GITHUB_SERVER_ERROR",
            GitHubError::Timeout { .. } => "GITHUB_API_TIMEOUT",
            GitHubError::Core(_) => "GITHUB_CORE_ERROR",
        }
    }
}

impl ResponseError for GitHubError {
    fn status_code(&self) -> StatusCode {
        match self {
            GitHubError::AuthInvalid => StatusCode::UNAUTHORIZED,
            // Mirrors GitHub, which reports exhausted quota as 403
            GitHubError::RateLimited | GitHubError::Forbidden => StatusCode::FORBIDDEN,
            GitHubError::NotFound { .. } => StatusCode::NOT_FOUND,
            GitHubError::ServerError { status } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GitHubError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GitHubError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GitHubError::from_status(401, None, "octocat"), GitHubError::AuthInvalid);
        assert_eq!(
            GitHubError::from_status(403, Some("0"), "octocat"),
            GitHubError::RateLimited
        );
        assert_eq!(
            GitHubError::from_status(403, Some("42"), "octocat"),
            GitHubError::Forbidden
        );
        assert_eq!(GitHubError::from_status(403, None, "octocat"), GitHubError::Forbidden);
        assert_eq!(
            GitHubError::from_status(404, None, "octocat"),
            GitHubError::NotFound {
                username: "octocat".to_string()
            }
        );
        assert_eq!(
            GitHubError::from_status(503, None, "octocat"),
            GitHubError::ServerError { status: 503 }
        );
        assert_eq!(GitHubError::from_status(422, None, "octocat").code(), "GITHUB_CORE_ERROR");
    }

    #[test]
    fn test_wire_string_starts_with_code() {
        let errors = [
            GitHubError::AuthInvalid,
            GitHubError::RateLimited,
            GitHubError::Forbidden,
            GitHubError::NotFound {
                username: "ghost".to_string(),
            },
            GitHubError::ServerError { status: 500 },
            GitHubError::Timeout { timeout_ms: 7000 },
            GitHubError::Core("boom".to_string()),
        ];

        for error in errors {
            assert!(error.to_string().starts_with(&format!("{}: ", error.code())));
        }
    }

    #[test]
    fn test_not_found_message_names_user() {
        let error = GitHubError::NotFound {
            username: "ghost".to_string(),
        };
        assert!(error.to_string().contains("\"ghost\""));
    }

    #[test]
    fn test_response_status() {
        assert_eq!(GitHubError::RateLimited.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            GitHubError::Timeout { timeout_ms: 1 }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GitHubError::ServerError { status: 502 }.status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
