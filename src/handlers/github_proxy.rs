use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::services::github::{Forwarder, ProxyRequest};
use crate::utils::config::Config;
use crate::utils::validators::{validate_endpoint, validate_username};

#[derive(Debug, Deserialize)]
pub struct ProxyBody {
    pub username: Option<String>,
    pub token: Option<String>,
    pub endpoint: Option<String>,
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message.into() }))
}

/// POST /api/github-proxy
/// Forward one GET to the GitHub API and return its body unchanged
pub async fn forward(
    forwarder: web::Data<dyn Forwarder>,
    config: web::Data<Config>,
    body: web::Json<ProxyBody>,
) -> Result<HttpResponse, actix_web::Error> {
    let body = body.into_inner();

    let (username, endpoint) = match (
        body.username.as_deref().map(str::trim).filter(|u| !u.is_empty()),
        body.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty()),
    ) {
        (Some(username), Some(endpoint)) => (username, endpoint),
        _ => return Ok(bad_request("Missing username or endpoint")),
    };

    if let Err(e) = validate_username(username) {
        return Ok(bad_request(e.to_string()));
    }
    if let Err(e) = validate_endpoint(endpoint) {
        log::warn!("Rejected proxy endpoint for {}: {}", username, e);
        return Ok(bad_request(e.to_string()));
    }

    let request = ProxyRequest::new(username, body.token.as_deref(), endpoint);
    let payload = forwarder
        .forward(&request, config.github_call_timeout())
        .await?;

    Ok(HttpResponse::Ok().json(payload))
}
