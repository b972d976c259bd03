use anyhow::{anyhow, Result};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub github_api_base_url: String,
    /// Execution ceiling of the hosting platform
    pub platform_timeout_ms: u64,
    /// How long before the ceiling we give up
    pub timeout_buffer_ms: u64,
    pub github_call_timeout_ms: u64,
    pub profile_timeout_ms: u64,
    pub commit_search_timeout_ms: u64,
    /// Analysis year, defaults to the current one
    pub wrapped_year: Option<i32>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            host: var("HOST", "127.0.0.1"),
            port: parse_var(&lookup, "PORT", 8080)?,
            frontend_url: var("FRONTEND_URL", "http://localhost:5173"),
            github_api_base_url: var("GITHUB_API_BASE_URL", "https://api.github.com"),
            platform_timeout_ms: parse_var(&lookup, "PLATFORM_TIMEOUT_MS", 10_000)?,
            timeout_buffer_ms: parse_var(&lookup, "TIMEOUT_BUFFER_MS", 500)?,
            github_call_timeout_ms: parse_var(&lookup, "GITHUB_CALL_TIMEOUT_MS", 7_000)?,
            profile_timeout_ms: parse_var(&lookup, "PROFILE_TIMEOUT_MS", 5_000)?,
            commit_search_timeout_ms: parse_var(&lookup, "COMMIT_SEARCH_TIMEOUT_MS", 4_000)?,
            wrapped_year: lookup("WRAPPED_YEAR")
                .map(|raw| {
                    raw.trim()
                        .parse()
                        .map_err(|e| anyhow!("WRAPPED_YEAR must be a year: {}", e))
                })
                .transpose()?,
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            gemini_model: var("GEMINI_MODEL", "gemini-3-flash-preview"),
            gemini_api_base_url: var(
                "GEMINI_API_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
        })
    }

    /// Time one request may spend before we must answer
    pub fn platform_budget(&self) -> Duration {
        Duration::from_millis(self.platform_timeout_ms.saturating_sub(self.timeout_buffer_ms))
    }

    pub fn github_call_timeout(&self) -> Duration {
        Duration::from_millis(self.github_call_timeout_ms)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} must be a number: {}", key, e)),
        None => Ok(default),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("frontend_url", &self.frontend_url)
            .field("github_api_base_url", &self.github_api_base_url)
            .field("platform_timeout_ms", &self.platform_timeout_ms)
            .field("timeout_buffer_ms", &self.timeout_buffer_ms)
            .field("github_call_timeout_ms", &self.github_call_timeout_ms)
            .field("profile_timeout_ms", &self.profile_timeout_ms)
            .field("commit_search_timeout_ms", &self.commit_search_timeout_ms)
            .field("wrapped_year", &self.wrapped_year)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_api_base_url", &self.gemini_api_base_url)
            .finish()
    }
}
