use std::collections::HashSet;

use crate::models::event::{EventKind, RawEvent};
use crate::models::repository::RawRepo;
use crate::models::window::AnalysisWindow;

/// Turns a repository into weak evidence of activity, or nothing
pub type RepoSignal = fn(&RawRepo) -> Option<RawEvent>;

/// One synthetic event on the repository's last update.
///
/// This double-counts on purpose: it stands in for private or aged-out
/// activity the public events feed no longer returns.
pub fn repo_update_signal(repo: &RawRepo) -> Option<RawEvent> {
    Some(RawEvent {
        id: format!("repo-update:{}", repo.id),
        kind: EventKind::RepositoryUpdate,
        created_at: repo.updated_at,
        repo_name: Some(repo.full_name.clone()),
    })
}

/// Disables the repository signal
pub fn no_repo_signal(_repo: &RawRepo) -> Option<RawEvent> {
    None
}

/// Merge primary events, received events and repository signals into the
/// single event set every statistic is derived from.
///
/// The first occurrence of an id wins; only events inside the window survive.
pub fn reconcile(
    primary: Vec<RawEvent>,
    received: Vec<RawEvent>,
    repos: &[RawRepo],
    signal: RepoSignal,
    window: &AnalysisWindow,
) -> Vec<RawEvent> {
    let mut seen = HashSet::new();
    let total_in = primary.len() + received.len();

    let events: Vec<RawEvent> = primary
        .into_iter()
        .chain(received)
        .chain(repos.iter().filter_map(signal))
        .filter(|event| window.contains(event.created_at))
        .filter(|event| seen.insert(event.id.clone()))
        .collect();

    log::info!(
        "🔀 Reconciled {} fetched events and {} repositories into {} in-window events",
        total_in,
        repos.len(),
        events.len()
    );

    events
}
