//! Metric name and label definitions.

/// Outgoing message metrics
pub mod transmit {
    /// Messages accepted by the server
    pub const MESSAGES_SENT_TOTAL: &str = "murmur_transmit_messages_sent_total";
    /// Sends that ended in an error reported to the caller
    pub const SEND_ERRORS_TOTAL: &str = "murmur_transmit_send_errors_total";
    /// Event queue restarts caused by a missing message event
    pub const EVENT_QUEUE_RESTARTS_TOTAL: &str = "murmur_transmit_event_queue_restarts_total";
    /// Reloads triggered by a failed send while a reload was pending
    pub const RELOADS_TOTAL: &str = "murmur_transmit_reloads_total";
    /// Time between starting a send and the server acknowledging it
    pub const ACK_DURATION_SECONDS: &str = "murmur_transmit_ack_duration_seconds";
    /// Messages currently tracked for local echo
    pub const TRACKED_MESSAGES: &str = "murmur_transmit_tracked_messages";
}

/// Common label keys
pub mod labels {
    pub const MESSAGE_TYPE: &str = "message_type";
    pub const ERROR_CODE: &str = "error_code";
}
