use reqwest::{Client, ClientBuilder};
use std::time::Duration;

pub const USER_AGENT_VALUE: &str = concat!("devwrapped/", env!("CARGO_PKG_VERSION"));

/// Create the shared HTTP client for the GitHub and Gemini APIs.
/// Per-call deadlines are enforced by the callers; this is only an upper bound.
pub fn create_http_client() -> reqwest::Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT_VALUE)
        .build()
}
