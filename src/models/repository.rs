use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository summary as returned by `/users/{username}/repos`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "stargazers_count", default)]
    pub star_count: u32,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub private: bool,
}

/// Public profile as returned by `/users/{username}`
#[derive(Clone, Debug, Deserialize)]
pub struct GitHubProfile {
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub following: u32,
    pub created_at: DateTime<Utc>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
}
