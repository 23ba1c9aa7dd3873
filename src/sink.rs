//! Human-readable diagnostics sink.
//!
//! The controller reports what went wrong through two one-way calls; it
//! never parses the text back. Hardware faults and rejected configuration
//! values are reported here, precondition failures (not initialized, slot
//! busy) are not.

/// Receiver for the controller's informational and error reports.
pub trait NotificationSink {
    /// Progress and lifecycle messages
    fn info(&mut self, message: &str);

    /// Failure reports, including the offending value where one exists
    fn error(&mut self, message: &str);
}

/// Sink that discards every message.
pub struct NullSink;

impl NotificationSink for NullSink {
    fn info(&mut self, _message: &str) {}

    fn error(&mut self, _message: &str) {}
}

/// Sink forwarding to the `defmt` transport.
#[cfg(feature = "defmt")]
pub struct DefmtSink;

#[cfg(feature = "defmt")]
impl NotificationSink for DefmtSink {
    fn info(&mut self, message: &str) {
        defmt::info!("{}", message);
    }

    fn error(&mut self, message: &str) {
        defmt::error!("{}", message);
    }
}
