pub mod aggregator;
pub mod analytics;
pub mod errors;
pub mod github;
pub mod narrative;
pub mod pagination;
pub mod reconciler;
pub mod snapshot;
