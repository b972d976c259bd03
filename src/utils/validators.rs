use anyhow::{anyhow, Result};
use url::Url;

/// Validate a GitHub username (alphanumeric or single hyphens, 1-39 chars,
/// no leading or trailing hyphen)
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() || username.len() > 39 {
        return Err(anyhow!("Username must be between 1 and 39 characters"));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(anyhow!(
            "Username can only contain alphanumeric characters and hyphens"
        ));
    }

    if username.starts_with('-') || username.ends_with('-') {
        return Err(anyhow!("Username cannot start or end with a hyphen"));
    }

    Ok(())
}

/// Validate that an endpoint is a plain API path that stays on the upstream host
pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    if !endpoint.starts_with('/') || endpoint.starts_with("//") {
        return Err(anyhow!("Endpoint must be an absolute API path, got: {}", endpoint));
    }

    if endpoint.chars().any(char::is_whitespace) {
        return Err(anyhow!("Endpoint must not contain whitespace"));
    }

    let base = Url::parse("https://api.github.com").map_err(|e| anyhow!("Invalid base URL: {}", e))?;
    let joined = base
        .join(endpoint)
        .map_err(|e| anyhow!("Invalid endpoint: {}", e))?;

    if joined.host_str() != base.host_str() {
        return Err(anyhow!("Endpoint must not change the upstream host"));
    }

    Ok(())
}
