use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::repository::RawRepo;

/// One cell of the contribution grid
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionDay {
    pub date: NaiveDate,
    pub count: u32,
    /// Bucketed intensity, 0-4
    pub level: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCount {
    pub name: String,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyContribution {
    /// Full month name, e.g. "March"
    pub month: String,
    pub count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityPattern {
    Consistent,
    Burst,
    Sporadic,
}

impl ActivityPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityPattern::Consistent => "consistent",
            ActivityPattern::Burst => "burst",
            ActivityPattern::Sporadic => "sporadic",
        }
    }
}

/// Where `total_commits` came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitCountSource {
    Search,
    Estimate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: u32,
    pub updated_at: DateTime<Utc>,
}

impl From<&RawRepo> for RepoSummary {
    fn from(repo: &RawRepo) -> Self {
        Self {
            name: repo.name.clone(),
            url: repo.html_url.clone(),
            description: repo.description.clone(),
            language: repo.language.clone(),
            stars: repo.star_count,
            updated_at: repo.updated_at,
        }
    }
}

/// The single statistics object produced per analysis run.
///
/// Every count that can be cross-checked against `contribution_grid`
/// comes from the same aggregation pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    // Identity
    pub username: String,
    pub avatar_url: String,
    pub profile_url: String,
    pub followers: u32,
    pub following: u32,
    pub account_age_years: u32,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,

    // Window
    pub analysis_year: i32,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,

    // Volume
    pub total_commits: u32,
    pub commit_count_source: CommitCountSource,
    pub active_days: u32,
    pub repos_contributed: u32,
    pub repos_created_this_year: u32,
    pub total_stars_received: u32,

    // Behaviour
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    pub most_active_month: Option<String>,
    pub activity_pattern: ActivityPattern,
    pub first_active_day: Option<NaiveDate>,
    pub last_active_day: Option<NaiveDate>,

    // Collections
    pub top_languages: Vec<LanguageCount>,
    pub all_languages: Vec<LanguageCount>,
    pub recent_repos: Vec<RepoSummary>,
    pub monthly_contributions: Vec<MonthlyContribution>,
    pub contribution_grid: Vec<ContributionDay>,
}

/// Small, fully populated snapshot for service and handler tests
#[cfg(test)]
pub fn sample_snapshot(username: &str) -> StatsSnapshot {
    use chrono::TimeZone;

    StatsSnapshot {
        username: username.to_string(),
        avatar_url: format!("https://avatars.githubusercontent.com/{}", username),
        profile_url: format!("https://github.com/{}", username),
        followers: 12,
        following: 3,
        account_age_years: 5,
        bio: None,
        company: None,
        location: Some("Berlin".to_string()),
        analysis_year: 2025,
        window_start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        window_end: Utc.with_ymd_and_hms(2025, 1, 2, 12, 0, 0).unwrap(),
        total_commits: 42,
        commit_count_source: CommitCountSource::Search,
        active_days: 1,
        repos_contributed: 2,
        repos_created_this_year: 1,
        total_stars_received: 7,
        current_streak_days: 1,
        longest_streak_days: 1,
        most_active_month: Some("January".to_string()),
        activity_pattern: ActivityPattern::Sporadic,
        first_active_day: NaiveDate::from_ymd_opt(2025, 1, 2),
        last_active_day: NaiveDate::from_ymd_opt(2025, 1, 2),
        top_languages: vec![LanguageCount {
            name: "Rust".to_string(),
            count: 2,
        }],
        all_languages: vec![LanguageCount {
            name: "Rust".to_string(),
            count: 2,
        }],
        recent_repos: Vec::new(),
        monthly_contributions: vec![MonthlyContribution {
            month: "January".to_string(),
            count: 3,
        }],
        contribution_grid: vec![
            ContributionDay {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                count: 0,
                level: 0,
            },
            ContributionDay {
                date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
                count: 3,
                level: 2,
            },
        ],
    }
}
