//! Engine metrics definitions
//!
//! OpenTelemetry instruments for monitoring the dispatch engine. The
//! engine records into these when built with `with_metrics`; exporting
//! them is the host application's concern.
//!
//! # Metrics Collected
//!
//! - **connection_state**: device reachable flag (gauge, 0/1)
//! - **commands_total**: outbound commands sent (counter)
//! - **replies_total**: replies matched to a pending command (counter)
//! - **retries_total**: unanswered-command resends (counter)
//! - **drops_total**: commands dropped after retry exhaustion (counter)
//! - **pushes_total**: unsolicited pushes routed (counter)
//! - **frame_errors_total**: malformed inbound fragments skipped (counter)

use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Meter},
    KeyValue,
};

/// Engine metrics for monitoring
pub struct EngineMetrics {
    /// Device reachable (0=unreachable, 1=reachable)
    pub connection_state: Gauge<i64>,
    /// Total outbound commands sent (initial sends, not retries)
    pub commands_total: Counter<u64>,
    /// Total replies matched against the pending queue
    pub replies_total: Counter<u64>,
    /// Total retry resends of unanswered commands
    pub retries_total: Counter<u64>,
    /// Total commands dropped after exhausting the retry budget
    pub drops_total: Counter<u64>,
    /// Total unsolicited pushes routed
    pub pushes_total: Counter<u64>,
    /// Total malformed inbound fragments skipped
    pub frame_errors_total: Counter<u64>,
}

impl EngineMetrics {
    /// Create a new EngineMetrics instance
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create a new EngineMetrics instance with a custom meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("kodilink.engine.connection.state")
                .with_description("Device reachable flag (0=unreachable, 1=reachable)")
                .build(),
            commands_total: meter
                .u64_counter("kodilink.engine.commands.total")
                .with_description("Total number of commands sent")
                .build(),
            replies_total: meter
                .u64_counter("kodilink.engine.replies.total")
                .with_description("Total number of replies matched to a pending command")
                .build(),
            retries_total: meter
                .u64_counter("kodilink.engine.retries.total")
                .with_description("Total number of unanswered-command resends")
                .build(),
            drops_total: meter
                .u64_counter("kodilink.engine.drops.total")
                .with_description("Total number of commands dropped after retry exhaustion")
                .build(),
            pushes_total: meter
                .u64_counter("kodilink.engine.pushes.total")
                .with_description("Total number of unsolicited pushes routed")
                .build(),
            frame_errors_total: meter
                .u64_counter("kodilink.engine.frame_errors.total")
                .with_description("Total number of malformed inbound fragments skipped")
                .build(),
        }
    }

    /// Update the reachable gauge
    pub fn update_connection_state(&self, reachable: bool) {
        self.connection_state.record(i64::from(reachable), &[]);
    }

    /// Record an outbound command
    pub fn record_command(&self, method: &str) {
        self.commands_total
            .add(1, &[KeyValue::new("method", method.to_string())]);
    }

    /// Record a matched reply
    pub fn record_reply(&self, id: &str) {
        self.replies_total
            .add(1, &[KeyValue::new("id", id.to_string())]);
    }

    /// Record a retry resend
    pub fn record_retry(&self) {
        self.retries_total.add(1, &[]);
    }

    /// Record a retry-exhausted drop
    pub fn record_drop(&self, id: &str) {
        self.drops_total
            .add(1, &[KeyValue::new("id", id.to_string())]);
    }

    /// Record a routed push
    pub fn record_push(&self, method: &str) {
        self.pushes_total
            .add(1, &[KeyValue::new("method", method.to_string())]);
    }

    /// Record a malformed inbound fragment
    pub fn record_frame_error(&self) {
        self.frame_errors_total.add(1, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = EngineMetrics::new("test-engine");

        metrics.update_connection_state(true);
        metrics.record_command("JSONRPC.Ping");
        metrics.record_reply("JSONRPC.Ping");
        metrics.record_retry();
        metrics.record_drop("Input.Home");
        metrics.record_push("Player.OnStop");
        metrics.record_frame_error();
    }
}
