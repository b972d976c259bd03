use serde_json::Value as JsonValue;

/// Product analytics sink. Calls are fire-and-forget and must never fail
/// the request that triggered them.
pub trait Analytics: Send + Sync {
    fn track(&self, event: &str, properties: JsonValue);
    fn identify(&self, user_id: &str, properties: JsonValue);
}

/// Writes analytics events to the log under the `analytics` target
#[derive(Clone, Copy, Debug, Default)]
pub struct LogAnalytics;

impl Analytics for LogAnalytics {
    fn track(&self, event: &str, properties: JsonValue) {
        log::info!(target: "analytics", "track {} {}", event, properties);
    }

    fn identify(&self, user_id: &str, properties: JsonValue) {
        log::info!(target: "analytics", "identify {} {}", user_id, properties);
    }
}
