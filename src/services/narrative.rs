use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

use crate::models::insights::AiInsights;
use crate::models::stats::StatsSnapshot;
use crate::utils::config::Config;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NarrativeError {
    #[error("GEMINI_CONFIG_ERROR: GEMINI_API_KEY is not configured.")]
    ConfigError,

    #[error("GEMINI_AUTH_INVALID: The API Key is unauthorized. Please check the server configuration.")]
    AuthInvalid,

    #[error("GEMINI_RATE_LIMIT: Model quota exceeded. Please wait a few seconds before retrying.")]
    RateLimited,

    #[error("GEMINI_SAFETY_BLOCK: The model filtered this profile's content for safety.")]
    SafetyBlock,

    #[error("GEMINI_NULL_TRACE: The model returned an empty or invalid narrative ({0}).")]
    NullTrace(String),

    #[error("GEMINI_INTERNAL_ERROR: {0}")]
    Internal(String),
}

impl NarrativeError {
    pub fn code(&self) -> &'static str {
        match self {
            NarrativeError::ConfigError => "GEMINI_CONFIG_ERROR",
            NarrativeError::AuthInvalid => "GEMINI_AUTH_INVALID",
            NarrativeError::RateLimited => "GEMINI_RATE_LIMIT",
            NarrativeError::SafetyBlock => "GEMINI_SAFETY_BLOCK",
            NarrativeError::NullTrace(_) => "GEMINI_NULL_TRACE",
            NarrativeError::Internal(_) => "GEMINI_INTERNAL_ERROR",
        }
    }
}

impl ResponseError for NarrativeError {
    fn status_code(&self) -> StatusCode {
        match self {
            NarrativeError::AuthInvalid => StatusCode::UNAUTHORIZED,
            NarrativeError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            NarrativeError::SafetyBlock => StatusCode::BAD_REQUEST,
            NarrativeError::ConfigError
            | NarrativeError::NullTrace(_)
            | NarrativeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Turns a finished snapshot into prose. Never sees tokens or raw events.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(
        &self,
        stats: &StatsSnapshot,
        model: Option<&str>,
    ) -> Result<AiInsights, NarrativeError>;
}

/// The part of a snapshot the model is shown
#[derive(Debug)]
pub struct NarrativeInput<'a> {
    pub username: &'a str,
    pub year: i32,
    pub total_commits: u32,
    pub active_days: u32,
    pub top_languages: Vec<&'a str>,
    pub repos_contributed: u32,
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    pub most_active_month: Option<&'a str>,
    pub activity_pattern: &'static str,
    pub account_age_years: u32,
    pub followers: u32,
    pub following: u32,
}

impl<'a> From<&'a StatsSnapshot> for NarrativeInput<'a> {
    fn from(stats: &'a StatsSnapshot) -> Self {
        Self {
            username: &stats.username,
            year: stats.analysis_year,
            total_commits: stats.total_commits,
            active_days: stats.active_days,
            top_languages: stats.top_languages.iter().map(|l| l.name.as_str()).collect(),
            repos_contributed: stats.repos_contributed,
            current_streak_days: stats.current_streak_days,
            longest_streak_days: stats.longest_streak_days,
            most_active_month: stats.most_active_month.as_deref(),
            activity_pattern: stats.activity_pattern.as_str(),
            account_age_years: stats.account_age_years,
            followers: stats.followers,
            following: stats.following,
        }
    }
}

impl NarrativeInput<'_> {
    pub fn prompt(&self) -> String {
        format!(
            "Analyze this developer's {year} GitHub activity and write a \"Year Wrapped\" review.\n\
             \n\
             DEVELOPER TELEMETRY:\n\
             - User: {username}\n\
             - Contributions: {commits}\n\
             - Active days: {active_days}\n\
             - Focus stack: {languages}\n\
             - Scope: {repos} repositories\n\
             - Momentum: {streak} day current streak, {longest} day longest streak\n\
             - Seasonality: peak work in {month}\n\
             - Activity pattern: {pattern}\n\
             - Account age: {age} years\n\
             - Social: {followers} followers, {following} following\n\
             \n\
             Respond with JSON only:\n\
             archetype: a bold developer persona such as \"The Architect\" or \"The Maintainer\"\n\
             archetypeDescription: one poetic sentence defining it\n\
             insights: 3 specific behavioural traces from the activity\n\
             patterns: 2 high-level development rhythms\n\
             narrative: a 3-paragraph story separated by blank lines\n\
             cardInsight: a punchy quote of about 10 words for sharing\n\
             executiveSummary (optional): two sentences for a busy reader\n\
             archetypeExplanation (optional): reasoning, keyFactors with evidence, confidence from 0 to 1\n\
             forwardLooking (optional): recommendations, risks and opportunities\n\
             \n\
             Tone: professional, data-driven, human.",
            year = self.year,
            username = self.username,
            commits = self.total_commits,
            active_days = self.active_days,
            languages = if self.top_languages.is_empty() {
                "unknown".to_string()
            } else {
                self.top_languages.join(", ")
            },
            repos = self.repos_contributed,
            streak = self.current_streak_days,
            longest = self.longest_streak_days,
            month = self.most_active_month.unwrap_or("no particular month"),
            pattern = self.activity_pattern,
            age = self.account_age_years,
            followers = self.followers,
            following = self.following,
        )
    }
}

fn response_schema() -> JsonValue {
    let strings = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
    json!({
        "type": "OBJECT",
        "properties": {
            "archetype": { "type": "STRING" },
            "archetypeDescription": { "type": "STRING" },
            "insights": strings.clone(),
            "patterns": strings.clone(),
            "narrative": { "type": "STRING" },
            "cardInsight": { "type": "STRING" },
            "executiveSummary": { "type": "STRING" },
            "archetypeExplanation": {
                "type": "OBJECT",
                "properties": {
                    "reasoning": strings.clone(),
                    "keyFactors": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "factor": { "type": "STRING" },
                                "evidence": { "type": "STRING" },
                            },
                            "required": ["factor", "evidence"],
                        },
                    },
                    "confidence": { "type": "NUMBER" },
                },
            },
            "forwardLooking": {
                "type": "OBJECT",
                "properties": {
                    "recommendations": strings.clone(),
                    "risks": strings.clone(),
                    "opportunities": strings,
                },
            },
        },
        "required": ["archetype", "archetypeDescription", "insights", "patterns", "narrative", "cardInsight"],
    })
}

/// Gemini `generateContent` over REST
pub struct GeminiNarrativeGenerator {
    http: Client,
    api_base_url: String,
    api_key: Option<String>,
    default_model: String,
    timeout: Duration,
}

impl GeminiNarrativeGenerator {
    pub fn new(
        http: Client,
        api_base_url: &str,
        api_key: Option<String>,
        default_model: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model: default_model.to_string(),
            timeout,
        }
    }

    pub fn from_config(http: Client, config: &Config) -> Self {
        Self::new(
            http,
            &config.gemini_api_base_url,
            config.gemini_api_key.clone(),
            &config.gemini_model,
            config.platform_budget(),
        )
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base_url,
            urlencoding::encode(model)
        )
    }
}

/// Pull the model's JSON text out of a generateContent response
fn extract_insights(body: &JsonValue) -> Result<AiInsights, NarrativeError> {
    if body.pointer("/promptFeedback/blockReason").is_some() {
        return Err(NarrativeError::SafetyBlock);
    }

    let candidate = body
        .pointer("/candidates/0")
        .ok_or_else(|| NarrativeError::NullTrace("no candidates".to_string()))?;

    if candidate.get("finishReason").and_then(|r| r.as_str()) == Some("SAFETY") {
        return Err(NarrativeError::SafetyBlock);
    }

    let text = candidate
        .pointer("/content/parts/0/text")
        .and_then(|t| t.as_str())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| NarrativeError::NullTrace("empty text".to_string()))?;

    let insights: AiInsights = serde_json::from_str(text)
        .map_err(|e| NarrativeError::NullTrace(format!("unparseable output: {}", e)))?;

    if insights.archetype.trim().is_empty() || insights.narrative.trim().is_empty() {
        return Err(NarrativeError::NullTrace(
            "missing archetype or narrative".to_string(),
        ));
    }

    Ok(insights)
}

#[async_trait]
impl NarrativeGenerator for GeminiNarrativeGenerator {
    async fn generate(
        &self,
        stats: &StatsSnapshot,
        model: Option<&str>,
    ) -> Result<AiInsights, NarrativeError> {
        let api_key = self.api_key.as_deref().ok_or(NarrativeError::ConfigError)?;
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str());

        let prompt = NarrativeInput::from(stats).prompt();
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        });

        log::info!("🧠 Generating narrative for {} with {}", stats.username, model);

        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log::error!("Gemini request failed: {}", e);
                NarrativeError::Internal(if e.is_timeout() {
                    "The model did not answer in time.".to_string()
                } else {
                    "Session failed to initialize.".to_string()
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Gemini returned {}", status);
            return Err(match status.as_u16() {
                401 | 403 => NarrativeError::AuthInvalid,
                429 => NarrativeError::RateLimited,
                code => NarrativeError::Internal(format!("Model API returned {}", code)),
            });
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| NarrativeError::NullTrace(format!("invalid response body: {}", e)))?;

        extract_insights(&body)
    }
}
