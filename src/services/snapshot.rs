use chrono::{DateTime, Datelike, Utc};
use futures_util::future::try_join;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::repository::{GitHubProfile, RawRepo};
use crate::models::stats::{CommitCountSource, LanguageCount, RepoSummary, StatsSnapshot};
use crate::models::window::AnalysisWindow;
use crate::services::aggregator::{aggregate, AggregationPolicy, ContributionSummary};
use crate::services::errors::AnalysisError;
use crate::services::github::{decode, endpoints, Forwarder, ProxyRequest};
use crate::services::pagination::{fetch_events, fetch_repositories, PagedResource};
use crate::services::reconciler::reconcile;
use crate::utils::config::Config;
use crate::utils::validators::validate_username;

/// Commits assumed per event when pushes give us nothing to count
pub const ROUGH_COMMITS_PER_EVENT: u32 = 2;
pub const TOP_LANGUAGES: usize = 3;
pub const RECENT_REPOS: usize = 5;
/// Left over after the commit search for reconciling and assembly
pub const ASSEMBLY_RESERVE: Duration = Duration::from_millis(50);

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub profile_timeout: Duration,
    pub repositories: PagedResource,
    pub events: PagedResource,
    pub received_events: PagedResource,
    pub commit_search_timeout: Duration,
    /// Wall-clock budget for a whole run
    pub total_budget: Duration,
    pub analysis_year: Option<i32>,
    pub policy: AggregationPolicy,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        let call_timeout = config.github_call_timeout();
        Self {
            profile_timeout: Duration::from_millis(config.profile_timeout_ms),
            repositories: PagedResource::repositories(call_timeout),
            events: PagedResource::events(call_timeout),
            received_events: PagedResource::received_events(call_timeout),
            commit_search_timeout: Duration::from_millis(config.commit_search_timeout_ms),
            total_budget: config.platform_budget(),
            analysis_year: config.wrapped_year,
            policy: AggregationPolicy::default(),
        }
    }
}

/// Estimate used when the commit search is unavailable
pub fn estimate_commits(summary: &ContributionSummary) -> u32 {
    if summary.push_units > 0 {
        summary.push_units
    } else {
        summary.event_count.saturating_mul(ROUGH_COMMITS_PER_EVENT)
    }
}

/// Runs one analysis: fetch, reconcile, aggregate, assemble
pub struct SnapshotBuilder {
    forwarder: Arc<dyn Forwarder>,
    config: PipelineConfig,
}

impl SnapshotBuilder {
    pub fn new(forwarder: Arc<dyn Forwarder>, config: PipelineConfig) -> Self {
        Self { forwarder, config }
    }

    pub async fn build(
        &self,
        username: &str,
        token: Option<&str>,
    ) -> Result<StatsSnapshot, AnalysisError> {
        self.build_at(username, token, Utc::now()).await
    }

    pub async fn build_at(
        &self,
        username: &str,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StatsSnapshot, AnalysisError> {
        validate_username(username).map_err(|e| AnalysisError::InvalidUsername(e.to_string()))?;

        let started = Instant::now();
        let year = self.config.analysis_year.unwrap_or_else(|| now.year());
        let window = AnalysisWindow::for_year(year, now).ok_or(AnalysisError::InvalidYear(year))?;
        let request = ProxyRequest::new(username, token, endpoints::PROFILE);
        let forwarder = self.forwarder.as_ref();

        log::info!(
            "🚀 Analysing {} for {} ({})",
            username,
            year,
            if request.is_authenticated() { "with token" } else { "anonymous" }
        );

        // Nothing can be analysed without the profile
        let body = forwarder
            .forward(&request, self.config.profile_timeout)
            .await?;
        let profile: GitHubProfile = decode(body, "profile")?;

        let must_have = try_join(
            fetch_repositories(forwarder, &request, &self.config.repositories),
            fetch_events(forwarder, &request, &self.config.events, window.start),
        );
        let nice_to_have = fetch_events(
            forwarder,
            &request,
            &self.config.received_events,
            window.start,
        );
        let fetches = async { tokio::join!(must_have, nice_to_have) };
        let (must_have, received) = tokio::time::timeout(self.remaining(started), fetches)
            .await
            .map_err(|_| self.deadline_exceeded(started))?;

        let (repos, events) = must_have?;
        let received = received.unwrap_or_else(|e| {
            log::warn!("⚠️  Received events unavailable for {}, continuing without: {}", username, e);
            Vec::new()
        });

        self.check_deadline(started)?;

        let reconciled = reconcile(events, received, &repos, self.config.policy.repo_signal, &window);
        let summary = aggregate(&reconciled, now.date_naive());

        let (total_commits, commit_count_source) =
            self.count_commits(&request, &window, &summary, started).await;

        self.check_deadline(started)?;

        let snapshot = self.assemble(
            profile,
            &repos,
            &summary,
            window,
            total_commits,
            commit_count_source,
            now,
        );

        log::info!(
            "✅ Snapshot for {}: {} commits ({:?}), {} active days in {}ms",
            snapshot.username,
            snapshot.total_commits,
            snapshot.commit_count_source,
            snapshot.active_days,
            started.elapsed().as_millis()
        );

        Ok(snapshot)
    }

    /// Commit search raced against a local timer; any failure falls back to the estimate.
    /// The timer never outlasts what is left of the run's budget.
    async fn count_commits(
        &self,
        request: &ProxyRequest,
        window: &AnalysisWindow,
        summary: &ContributionSummary,
        started: Instant,
    ) -> (u32, CommitCountSource) {
        let search = request.with_endpoint(endpoints::commit_search(window));
        let timeout = self
            .config
            .commit_search_timeout
            .min(self.remaining(started).saturating_sub(ASSEMBLY_RESERVE));

        let outcome = tokio::time::timeout(timeout, self.forwarder.forward(&search, timeout)).await;

        let total = match outcome {
            Ok(Ok(body)) => body
                .get("total_count")
                .and_then(|v| v.as_u64())
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX)),
            Ok(Err(e)) => {
                log::warn!("⚠️  Commit search failed, estimating instead: {}", e);
                None
            }
            Err(_) => {
                log::warn!(
                    "⏱️  Commit search timed out after {}ms, estimating instead",
                    timeout.as_millis()
                );
                None
            }
        };

        match total {
            Some(total) => (total, CommitCountSource::Search),
            None => (estimate_commits(summary), CommitCountSource::Estimate),
        }
    }

    fn remaining(&self, started: Instant) -> Duration {
        self.config.total_budget.saturating_sub(started.elapsed())
    }

    fn check_deadline(&self, started: Instant) -> Result<(), AnalysisError> {
        if started.elapsed() > self.config.total_budget {
            return Err(self.deadline_exceeded(started));
        }
        Ok(())
    }

    fn deadline_exceeded(&self, started: Instant) -> AnalysisError {
        let elapsed = started.elapsed();
        log::error!(
            "Analysis exceeded its budget: {}ms > {}ms",
            elapsed.as_millis(),
            self.config.total_budget.as_millis()
        );
        AnalysisError::DeadlineExceeded {
            elapsed_ms: elapsed.as_millis() as u64,
            budget_ms: self.config.total_budget.as_millis() as u64,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        profile: GitHubProfile,
        repos: &[RawRepo],
        summary: &ContributionSummary,
        window: AnalysisWindow,
        total_commits: u32,
        commit_count_source: CommitCountSource,
        now: DateTime<Utc>,
    ) -> StatsSnapshot {
        let policy = &self.config.policy;
        let all_languages = language_counts(repos);
        let mut top_languages = all_languages.clone();
        top_languages.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        top_languages.truncate(TOP_LANGUAGES);

        let mut recent: Vec<&RawRepo> = repos.iter().collect();
        recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let account_age_days = (now - profile.created_at).num_days().max(0);

        StatsSnapshot {
            username: profile.login,
            avatar_url: profile.avatar_url,
            profile_url: profile.html_url,
            followers: profile.followers,
            following: profile.following,
            account_age_years: u32::try_from(account_age_days / 365).unwrap_or(0),
            bio: profile.bio,
            company: profile.company,
            location: profile.location,

            analysis_year: window.year,
            window_start: window.start,
            window_end: window.end,

            total_commits,
            commit_count_source,
            active_days: summary.active_day_count(),
            repos_contributed: summary.repositories.len() as u32,
            repos_created_this_year: repos.iter().filter(|r| window.contains(r.created_at)).count()
                as u32,
            total_stars_received: repos.iter().fold(0u32, |sum, r| sum.saturating_add(r.star_count)),

            current_streak_days: summary.current_streak,
            longest_streak_days: summary.longest_streak,
            most_active_month: summary.most_active_month(),
            activity_pattern: summary.pattern(&policy.pattern),
            first_active_day: summary.first_active_day(),
            last_active_day: summary.last_active_day(),

            top_languages,
            all_languages,
            recent_repos: recent.into_iter().take(RECENT_REPOS).map(RepoSummary::from).collect(),
            monthly_contributions: summary.monthly(),
            contribution_grid: summary.grid(&window, &policy.level_thresholds),
        }
    }
}

/// Repositories per primary language, alphabetical
fn language_counts(repos: &[RawRepo]) -> Vec<LanguageCount> {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for language in repos.iter().filter_map(|r| r.language.as_deref()) {
        *counts.entry(language).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(name, count)| LanguageCount {
            name: name.to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stats::ActivityPattern;
    use crate::services::github::mock::{
        event_json, page_param, profile_json, push_event_json, repo_json, MockForwarder,
    };
    use crate::services::github::GitHubError;
    use crate::services::reconciler::no_repo_signal;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::{json, Value as JsonValue};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap()
    }

    fn pipeline_config() -> PipelineConfig {
        let mut config = PipelineConfig::from_config(&Config::from_lookup(|_| None).unwrap());
        config.analysis_year = Some(2025);
        config.commit_search_timeout = Duration::from_millis(100);
        config
    }

    fn repos() -> JsonValue {
        json!([
            repo_json(1, "hello", "2025-03-05T08:00:00Z", "2025-01-15T00:00:00Z", Some("Rust"), 10),
            repo_json(2, "dotfiles", "2024-06-01T00:00:00Z", "2020-01-01T00:00:00Z", Some("Shell"), 1),
            repo_json(3, "site", "2025-02-01T00:00:00Z", "2023-01-01T00:00:00Z", Some("Rust"), 4),
            repo_json(4, "notes", "2023-02-01T00:00:00Z", "2022-01-01T00:00:00Z", None, 0),
        ])
    }

    fn events() -> JsonValue {
        json!([
            push_event_json("e1", "2025-03-05T09:00:00Z", 3),
            push_event_json("e2", "2025-03-05T10:00:00Z", 2),
            event_json("e3", "IssuesEvent", "2025-03-04T10:00:00Z"),
            event_json("e4", "PullRequestEvent", "2025-03-03T10:00:00Z"),
            event_json("e5", "WatchEvent", "2025-03-02T10:00:00Z"),
            event_json("e6", "CreateEvent", "2025-03-01T10:00:00Z"),
            push_event_json("old", "2024-12-20T10:00:00Z", 9),
        ])
    }

    fn github(
        events: JsonValue,
        received: Result<JsonValue, GitHubError>,
        search: Result<JsonValue, GitHubError>,
    ) -> MockForwarder {
        MockForwarder::new(move |endpoint| {
            if endpoint.starts_with("/search/commits") {
                search.clone()
            } else if endpoint.starts_with("/users/octocat/repos") {
                Ok(repos())
            } else if endpoint.starts_with("/users/octocat/events") {
                Ok(events.clone())
            } else if endpoint.starts_with("/users/octocat/received_events") {
                received.clone()
            } else if endpoint == "/users/octocat" {
                Ok(profile_json("octocat"))
            } else {
                Err(GitHubError::NotFound {
                    username: "octocat".to_string(),
                })
            }
        })
    }

    fn builder(forwarder: MockForwarder, config: PipelineConfig) -> (Arc<MockForwarder>, SnapshotBuilder) {
        let forwarder = Arc::new(forwarder);
        let builder = SnapshotBuilder::new(forwarder.clone(), config);
        (forwarder, builder)
    }

    fn day(snapshot: &StatsSnapshot, raw: &str) -> u32 {
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap();
        snapshot
            .contribution_grid
            .iter()
            .find(|d| d.date == date)
            .map(|d| d.count)
            .unwrap()
    }

    #[tokio::test]
    async fn test_builds_consistent_snapshot() {
        let (forwarder, builder) = builder(
            github(events(), Ok(json!([])), Ok(json!({ "total_count": 321 }))),
            pipeline_config(),
        );

        let snapshot = builder.build_at("octocat", None, now()).await.unwrap();

        assert_eq!(snapshot.username, "octocat");
        assert_eq!(snapshot.total_commits, 321);
        assert_eq!(snapshot.commit_count_source, CommitCountSource::Search);

        // 3 + 2 commits plus the repository update on the same day
        assert_eq!(day(&snapshot, "2025-03-05"), 6);
        assert_eq!(day(&snapshot, "2025-03-02"), 0);

        let nonzero = snapshot.contribution_grid.iter().filter(|d| d.count > 0).count() as u32;
        assert_eq!(snapshot.active_days, nonzero);
        // 03-01 (create), 02-01 (repo update), 03-03, 03-04, 03-05
        assert_eq!(snapshot.active_days, 5);
        assert_eq!(snapshot.current_streak_days, 3);
        assert_eq!(snapshot.longest_streak_days, 3);
        assert_eq!(snapshot.activity_pattern, ActivityPattern::Sporadic);
        assert_eq!(snapshot.most_active_month.as_deref(), Some("March"));
        assert_eq!(snapshot.contribution_grid.len(), 64);

        assert_eq!(snapshot.repos_created_this_year, 1);
        assert_eq!(snapshot.total_stars_received, 15);
        assert_eq!(snapshot.top_languages[0], LanguageCount { name: "Rust".to_string(), count: 2 });
        assert_eq!(snapshot.all_languages.len(), 2);
        assert_eq!(snapshot.recent_repos[0].name, "hello");
        assert_eq!(snapshot.recent_repos.len(), 4);
        assert_eq!(snapshot.account_age_years, 5);

        assert_eq!(forwarder.calls_to("/users/octocat/received_events"), 1);
        assert_eq!(forwarder.calls_to("/search/commits"), 1);
    }

    #[tokio::test]
    async fn test_commit_search_timeout_degrades_to_estimate() {
        let forwarder = github(events(), Ok(json!([])), Ok(json!({ "total_count": 999 })))
            .with_delay("/search/commits", Duration::from_secs(5));
        let (_, builder) = builder(forwarder, pipeline_config());

        let snapshot = builder.build_at("octocat", None, now()).await.unwrap();

        assert_eq!(snapshot.commit_count_source, CommitCountSource::Estimate);
        assert_eq!(snapshot.total_commits, 5);
    }

    #[tokio::test]
    async fn test_commit_search_error_degrades_to_estimate() {
        let (_, builder) = builder(
            github(events(), Ok(json!([])), Err(GitHubError::RateLimited)),
            pipeline_config(),
        );

        let snapshot = builder.build_at("octocat", None, now()).await.unwrap();

        assert_eq!(snapshot.commit_count_source, CommitCountSource::Estimate);
        assert_eq!(snapshot.total_commits, 5);
    }

    #[tokio::test]
    async fn test_sparse_events_use_rough_estimate() {
        let sparse = json!([
            event_json("c1", "CreateEvent", "2025-02-10T10:00:00Z"),
            event_json("c2", "IssuesEvent", "2025-02-11T10:00:00Z"),
        ]);
        let (_, builder) = builder(
            github(sparse, Ok(json!([])), Err(GitHubError::Timeout { timeout_ms: 100 })),
            pipeline_config(),
        );

        let snapshot = builder.build_at("octocat", None, now()).await.unwrap();

        // Two events plus two in-window repository updates
        assert_eq!(snapshot.total_commits, 4 * ROUGH_COMMITS_PER_EVENT);
    }

    #[tokio::test]
    async fn test_profile_not_found_aborts() {
        let forwarder = MockForwarder::new(|_| {
            Err(GitHubError::NotFound {
                username: "ghost".to_string(),
            })
        });
        let (forwarder, builder) = builder(forwarder, pipeline_config());

        let error = builder.build_at("ghost", None, now()).await.unwrap_err();

        assert_eq!(error.code(), "GITHUB_USER_NOT_FOUND");
        assert!(error.user_message().contains("ghost"));
        assert_eq!(forwarder.calls(), vec!["/users/ghost".to_string()]);
    }

    #[tokio::test]
    async fn test_received_events_failure_is_not_fatal() {
        let received_fails = github(
            events(),
            Err(GitHubError::ServerError { status: 500 }),
            Ok(json!({ "total_count": 1 })),
        );
        let received_empty = github(events(), Ok(json!([])), Ok(json!({ "total_count": 1 })));

        let (_, failing) = builder(received_fails, pipeline_config());
        let (_, baseline) = builder(received_empty, pipeline_config());

        let degraded = failing.build_at("octocat", None, now()).await.unwrap();
        let expected = baseline.build_at("octocat", None, now()).await.unwrap();

        assert_eq!(degraded.active_days, expected.active_days);
        assert_eq!(degraded.contribution_grid, expected.contribution_grid);
    }

    #[tokio::test]
    async fn test_received_events_are_merged_without_duplicates() {
        let received = json!([
            push_event_json("e1", "2025-03-05T09:00:00Z", 3),
            event_json("r1", "IssueCommentEvent", "2025-02-20T10:00:00Z"),
        ]);
        let (_, builder) = builder(
            github(events(), Ok(received), Ok(json!({ "total_count": 1 }))),
            pipeline_config(),
        );

        let snapshot = builder.build_at("octocat", None, now()).await.unwrap();

        assert_eq!(day(&snapshot, "2025-03-05"), 6);
        assert_eq!(day(&snapshot, "2025-02-20"), 1);
        assert_eq!(snapshot.active_days, 6);
    }

    #[tokio::test]
    async fn test_primary_events_failure_is_fatal() {
        let forwarder = MockForwarder::new(|endpoint| {
            if endpoint == "/users/octocat" {
                Ok(profile_json("octocat"))
            } else if endpoint.starts_with("/users/octocat/events") {
                Err(GitHubError::Forbidden)
            } else {
                Ok(json!([]))
            }
        });
        let (_, builder) = builder(forwarder, pipeline_config());

        let error = builder.build_at("octocat", None, now()).await.unwrap_err();

        assert_eq!(error, AnalysisError::GitHub(GitHubError::Forbidden));
    }

    #[tokio::test]
    async fn test_deadline_exceeded_returns_no_snapshot() {
        let mut config = pipeline_config();
        config.total_budget = Duration::ZERO;
        let forwarder = github(events(), Ok(json!([])), Ok(json!({ "total_count": 1 })))
            .with_delay("/users/octocat/repos", Duration::from_millis(5));
        let (_, builder) = builder(forwarder, config);

        let error = builder.build_at("octocat", None, now()).await.unwrap_err();

        assert_eq!(error.code(), "ANALYSIS_DEADLINE_EXCEEDED");
    }

    #[tokio::test]
    async fn test_slow_fetch_is_cut_off_at_budget() {
        let mut config = pipeline_config();
        config.total_budget = Duration::from_millis(200);
        let forwarder = github(events(), Ok(json!([])), Ok(json!({ "total_count": 1 })))
            .with_delay("/users/octocat/events", Duration::from_secs(5));
        let (_, builder) = builder(forwarder, config);
        let started = Instant::now();

        let error = builder.build_at("octocat", None, now()).await.unwrap_err();

        assert_eq!(error.code(), "ANALYSIS_DEADLINE_EXCEEDED");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_commit_search_is_bounded_by_remaining_budget() {
        let mut config = pipeline_config();
        config.total_budget = Duration::from_millis(300);
        config.commit_search_timeout = Duration::from_millis(250);
        let forwarder = github(events(), Ok(json!([])), Ok(json!({ "total_count": 999 })))
            .with_delay("/users/octocat/repos", Duration::from_millis(150))
            .with_delay("/search/commits", Duration::from_secs(5));
        let (_, builder) = builder(forwarder, config);

        let snapshot = builder.build_at("octocat", None, now()).await.unwrap();

        assert_eq!(snapshot.commit_count_source, CommitCountSource::Estimate);
        assert_eq!(snapshot.total_commits, 5);
    }

    #[tokio::test]
    async fn test_feeds_are_fetched_concurrently() {
        let forwarder = github(events(), Ok(json!([])), Ok(json!({ "total_count": 1 })))
            .with_delay("/users/octocat/repos", Duration::from_millis(200))
            .with_delay("/users/octocat/events", Duration::from_millis(200))
            .with_delay("/users/octocat/received_events", Duration::from_millis(200));
        let (forwarder, builder) = builder(forwarder, pipeline_config());
        let started = Instant::now();

        builder.build_at("octocat", None, now()).await.unwrap();

        // Sequential fetching would take at least 600ms
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(forwarder.calls_to("/users/octocat/received_events"), 1);
    }

    #[tokio::test]
    async fn test_full_event_feed_stops_before_upstream_rejects() {
        let forwarder = MockForwarder::new(|endpoint| {
            if endpoint.starts_with("/users/octocat/events") {
                match page_param(endpoint).unwrap() {
                    page @ 1..=3 => {
                        let events: Vec<JsonValue> = (0..100)
                            .map(|i| {
                                event_json(
                                    &format!("p{}-{}", page, i),
                                    "IssuesEvent",
                                    &format!("2025-02-{:02}T10:00:00Z", 10 + page),
                                )
                            })
                            .collect();
                        Ok(JsonValue::Array(events))
                    }
                    _ => Err(GitHubError::Core("GitHub API error: 422".to_string())),
                }
            } else if endpoint.starts_with("/search/commits") {
                Ok(json!({ "total_count": 300 }))
            } else if endpoint == "/users/octocat" {
                Ok(profile_json("octocat"))
            } else {
                Ok(json!([]))
            }
        });
        let (forwarder, builder) = builder(forwarder, pipeline_config());

        let snapshot = builder.build_at("octocat", None, now()).await.unwrap();

        assert_eq!(forwarder.calls_to("/users/octocat/events"), 3);
        assert_eq!(snapshot.active_days, 3);
        assert_eq!(day(&snapshot, "2025-02-11"), 100);
    }

    #[tokio::test]
    async fn test_repo_signal_can_be_disabled() {
        let mut config = pipeline_config();
        config.policy.repo_signal = no_repo_signal;
        let (_, builder) = builder(
            github(events(), Ok(json!([])), Ok(json!({ "total_count": 1 }))),
            config,
        );

        let snapshot = builder.build_at("octocat", None, now()).await.unwrap();

        assert_eq!(day(&snapshot, "2025-03-05"), 5);
        assert_eq!(snapshot.active_days, 4);
    }

    #[tokio::test]
    async fn test_invalid_username_makes_no_calls() {
        let (forwarder, builder) = builder(
            github(events(), Ok(json!([])), Ok(json!({ "total_count": 1 }))),
            pipeline_config(),
        );

        let error = builder.build_at("not a user", None, now()).await.unwrap_err();

        assert_eq!(error.code(), "INVALID_USERNAME");
        assert!(forwarder.calls().is_empty());
    }
}
