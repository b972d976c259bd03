use chrono::{Datelike, Month, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::event::{EventKind, RawEvent};
use crate::models::stats::{ActivityPattern, ContributionDay, MonthlyContribution};
use crate::models::window::AnalysisWindow;
use crate::services::reconciler::{repo_update_signal, RepoSignal};

/// Minimum daily units for grid levels 1 through 4
pub const LEVEL_THRESHOLDS: [u32; 4] = [1, 2, 4, 8];

/// Product policy for the consistent/burst/sporadic split
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatternThresholds {
    /// More active days than this is `consistent`
    pub consistent_above: u32,
    /// More active days than this (but not consistent) is `burst`
    pub burst_above: u32,
}

impl Default for PatternThresholds {
    fn default() -> Self {
        Self {
            consistent_above: 15,
            burst_above: 5,
        }
    }
}

impl PatternThresholds {
    pub fn classify(&self, active_days: u32) -> ActivityPattern {
        if active_days > self.consistent_above {
            ActivityPattern::Consistent
        } else if active_days > self.burst_above {
            ActivityPattern::Burst
        } else {
            ActivityPattern::Sporadic
        }
    }
}

/// Tunables of the aggregation, swappable as a unit
#[derive(Clone, Copy, Debug)]
pub struct AggregationPolicy {
    pub repo_signal: RepoSignal,
    pub level_thresholds: [u32; 4],
    pub pattern: PatternThresholds,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            repo_signal: repo_update_signal,
            level_thresholds: LEVEL_THRESHOLDS,
            pattern: PatternThresholds::default(),
        }
    }
}

/// Contribution units an event is worth
pub fn contribution_weight(event: &RawEvent) -> u32 {
    match &event.kind {
        EventKind::Push(_) => u32::try_from(event.commit_count())
            .unwrap_or(u32::MAX)
            .max(1),
        EventKind::Create
        | EventKind::Issues
        | EventKind::PullRequest
        | EventKind::IssueComment
        | EventKind::PullRequestReview
        | EventKind::PullRequestReviewComment
        | EventKind::RepositoryUpdate => 1,
        EventKind::Other(_) => 0,
    }
}

/// Bucket a daily unit total into a 0-4 level
pub fn level_for(count: u32, thresholds: &[u32; 4]) -> u8 {
    thresholds.iter().filter(|min| count >= **min).count() as u8
}

/// Everything derived from one reconciled event set
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContributionSummary {
    /// Units per day; only days with at least one unit are present
    pub daily: BTreeMap<NaiveDate, u32>,
    /// Units per (year, month)
    pub monthly_units: BTreeMap<(i32, u32), u32>,
    /// Events of any type per (year, month)
    pub monthly_events: BTreeMap<(i32, u32), u32>,
    pub active_days: BTreeSet<NaiveDate>,
    pub event_count: u32,
    /// Units contributed by push events alone
    pub push_units: u32,
    /// Distinct repositories touched by any event
    pub repositories: BTreeSet<String>,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl ContributionSummary {
    pub fn active_day_count(&self) -> u32 {
        self.active_days.len() as u32
    }

    pub fn first_active_day(&self) -> Option<NaiveDate> {
        self.active_days.first().copied()
    }

    pub fn last_active_day(&self) -> Option<NaiveDate> {
        self.active_days.last().copied()
    }

    pub fn pattern(&self, thresholds: &PatternThresholds) -> ActivityPattern {
        thresholds.classify(self.active_day_count())
    }

    /// Month with the most events. Months are visited in calendar order and
    /// only a strictly higher count takes the lead, so ties go to the earliest.
    pub fn most_active_month(&self) -> Option<String> {
        let mut best: Option<((i32, u32), u32)> = None;
        for (month, count) in &self.monthly_events {
            if best.map_or(true, |(_, top)| *count > top) {
                best = Some((*month, *count));
            }
        }
        best.and_then(|((_, month), _)| month_name(month))
    }

    pub fn monthly(&self) -> Vec<MonthlyContribution> {
        self.monthly_units
            .iter()
            .filter_map(|((_, month), count)| {
                month_name(*month).map(|month| MonthlyContribution {
                    month,
                    count: *count,
                })
            })
            .collect()
    }

    /// One cell per window day, zero days included
    pub fn grid(&self, window: &AnalysisWindow, thresholds: &[u32; 4]) -> Vec<ContributionDay> {
        window
            .days()
            .map(|date| {
                let count = self.daily.get(&date).copied().unwrap_or(0);
                ContributionDay {
                    date,
                    count,
                    level: level_for(count, thresholds),
                }
            })
            .collect()
    }
}

fn month_name(month: u32) -> Option<String> {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
}

/// Fold reconciled events into per-day and per-month totals and streaks
pub fn aggregate(events: &[RawEvent], today: NaiveDate) -> ContributionSummary {
    let mut summary = ContributionSummary::default();

    for event in events {
        let date = event.created_at.date_naive();
        let month_key = (date.year(), date.month());

        summary.event_count += 1;
        *summary.monthly_events.entry(month_key).or_insert(0) += 1;

        let units = contribution_weight(event);
        if units == 0 {
            continue;
        }

        *summary.daily.entry(date).or_insert(0) += units;
        *summary.monthly_units.entry(month_key).or_insert(0) += units;

        if matches!(event.kind, EventKind::Push(_)) {
            summary.push_units += units;
        }
        if let Some(repo) = &event.repo_name {
            summary.repositories.insert(repo.clone());
        }
    }

    summary.active_days = summary
        .daily
        .iter()
        .filter(|(_, units)| **units > 0)
        .map(|(date, _)| *date)
        .collect();

    let (current, longest) = calculate_streaks(&summary.active_days, today);
    summary.current_streak = current;
    summary.longest_streak = longest;

    log::info!(
        "📊 Aggregated {} events: {} active days, streak {} (longest {})",
        summary.event_count,
        summary.active_days.len(),
        current,
        longest
    );

    summary
}

/// Current streak (anchored at today, or yesterday if today is empty) and
/// the longest run of consecutive days anywhere
pub fn calculate_streaks(active_days: &BTreeSet<NaiveDate>, today: NaiveDate) -> (u32, u32) {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for day in active_days {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(*day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }

    let yesterday = today.pred_opt();
    let anchor = if active_days.contains(&today) {
        Some(today)
    } else {
        yesterday.filter(|d| active_days.contains(d))
    };

    let mut current = 0;
    let mut expected = anchor;
    for day in active_days.iter().rev().skip_while(|d| Some(**d) > anchor) {
        if Some(*day) != expected {
            break;
        }
        current += 1;
        expected = day.pred_opt();
    }

    (current, longest)
}
