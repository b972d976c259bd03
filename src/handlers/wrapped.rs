use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::stats::StatsSnapshot;
use crate::services::analytics::Analytics;
use crate::services::errors::AnalysisError;
use crate::services::narrative::NarrativeGenerator;
use crate::services::snapshot::SnapshotBuilder;

#[derive(Debug, Deserialize)]
pub struct WrappedBody {
    pub username: String,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsBody {
    pub stats: Option<StatsSnapshot>,
    pub model_name: Option<String>,
}

/// POST /api/wrapped
/// Run the whole pipeline for one user and return the snapshot
pub async fn build_stats(
    builder: web::Data<SnapshotBuilder>,
    analytics: web::Data<dyn Analytics>,
    body: web::Json<WrappedBody>,
) -> Result<HttpResponse, AnalysisError> {
    let username = body.username.trim();
    let has_token = body.token.as_deref().is_some_and(|t| !t.trim().is_empty());

    analytics.track(
        "analysis_started",
        json!({ "username": username, "hasToken": has_token }),
    );

    match builder.build(username, body.token.as_deref()).await {
        Ok(snapshot) => {
            analytics.identify(
                &snapshot.username,
                json!({ "followers": snapshot.followers, "accountAgeYears": snapshot.account_age_years }),
            );
            analytics.track(
                "analysis_completed",
                json!({
                    "username": &snapshot.username,
                    "activeDays": snapshot.active_days,
                    "totalCommits": snapshot.total_commits,
                    "commitCountSource": snapshot.commit_count_source,
                }),
            );
            Ok(HttpResponse::Ok().json(snapshot))
        }
        Err(e) => {
            log::warn!("Analysis of {} failed: {}", username, e);
            analytics.track(
                "analysis_failed",
                json!({ "username": username, "error": e.code() }),
            );
            Err(e)
        }
    }
}

/// POST /api/insights
/// Narrative for a snapshot the client already holds
pub async fn generate_insights(
    generator: web::Data<dyn NarrativeGenerator>,
    body: web::Json<InsightsBody>,
) -> Result<HttpResponse, actix_web::Error> {
    let body = body.into_inner();
    let stats = match body.stats {
        Some(stats) => stats,
        None => {
            return Ok(HttpResponse::BadRequest().json(json!({ "error": "Missing stats data" })));
        }
    };

    let insights = generator
        .generate(&stats, body.model_name.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(insights))
}

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
