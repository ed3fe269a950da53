use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub created: Instant,
}

/// Receives outcome messages. Fire-and-forget: nothing is returned.
pub trait Notifier {
    fn notify(&mut self, severity: Severity, message: &str);
}

/// Keeps the latest notification for the status line.
#[derive(Debug, Default)]
pub struct StatusLine {
    latest: Option<Notification>,
}

impl StatusLine {
    pub fn latest(&self) -> Option<&Notification> {
        self.latest.as_ref()
    }
}

impl Notifier for StatusLine {
    fn notify(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Warning => warn!("{message}"),
            _ => info!("{message}"),
        }
        self.latest = Some(Notification {
            severity,
            message: message.to_string(),
            created: Instant::now(),
        });
    }
}
