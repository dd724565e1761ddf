//! Client metrics.
//!
//! Uses the `metrics` crate facade; nothing is recorded unless the
//! application installs a recorder.

use metrics::{counter, gauge};

/// Metric names.
pub mod names {
    pub const SESSIONS_ACTIVE: &str = "wstomp_sessions_active";
    pub const FRAMES_TOTAL: &str = "wstomp_frames_total";
    pub const FRAMES_BYTES: &str = "wstomp_frames_bytes";
    pub const SUBSCRIPTIONS_ACTIVE: &str = "wstomp_subscriptions_active";
    pub const ERRORS_TOTAL: &str = "wstomp_errors_total";
}

/// Describe client metrics to the installed recorder.
pub fn describe_metrics() {
    metrics::describe_gauge!(
        names::SESSIONS_ACTIVE,
        "Current number of sessions with a running dispatch task"
    );
    metrics::describe_counter!(names::FRAMES_TOTAL, "Total number of frames sent and received");
    metrics::describe_counter!(names::FRAMES_BYTES, "Total bytes of frames sent and received");
    metrics::describe_gauge!(
        names::SUBSCRIPTIONS_ACTIVE,
        "Current number of registered subscriptions"
    );
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of reported errors");
}

/// Record a frame.
pub fn record_frame(bytes: usize, direction: &'static str, command: &'static str) {
    counter!(names::FRAMES_TOTAL, "direction" => direction, "command" => command).increment(1);
    counter!(names::FRAMES_BYTES, "direction" => direction).increment(bytes as u64);
}

/// Update the registered subscription count.
pub fn set_active_subscriptions(count: usize) {
    gauge!(names::SUBSCRIPTIONS_ACTIVE).set(count as f64);
}

/// Record an error.
pub fn record_error(kind: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => kind).increment(1);
}

/// Keeps the active-session gauge raised while alive.
pub struct SessionMetricsGuard;

impl SessionMetricsGuard {
    /// Create a new metrics guard, recording a running session.
    #[must_use]
    pub fn new() -> Self {
        gauge!(names::SESSIONS_ACTIVE).increment(1.0);
        Self
    }
}

impl Default for SessionMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionMetricsGuard {
    fn drop(&mut self) {
        gauge!(names::SESSIONS_ACTIVE).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_without_recorder() {
        describe_metrics();
        let _guard = SessionMetricsGuard::new();
        record_frame(12, "outbound", "SEND");
        record_error("protocol");
        set_active_subscriptions(3);
    }
}
