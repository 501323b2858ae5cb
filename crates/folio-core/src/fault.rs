//! Containment of unhandled faults.
//!
//! When something escapes the per-operation error handling, the editing
//! surface is replaced by a recovery view. `FaultState` remembers the first
//! fault until the user picks a recovery action.

use std::fmt::Write as _;

pub const FAULT_TITLE: &str = "Something went wrong";
pub const FAULT_BODY: &str =
    "The editor encountered an unexpected error. You can try again or reload the page.";
pub const RETRY_LABEL: &str = "Try Again";
pub const RELOAD_LABEL: &str = "Reload Page";

/// Everything known about one fault, for host-side logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    pub message: String,
    pub location: Option<String>,
    /// Recent log lines leading up to the fault, oldest first.
    pub recent_logs: Vec<String>,
}

impl FaultReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            recent_logs: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.recent_logs = logs;
        self
    }

    /// Multi-line text for the details pane.
    pub fn details(&self) -> String {
        let mut out = self.message.clone();
        if let Some(location) = &self.location {
            let _ = write!(out, "\n  at {}", location);
        }
        if !self.recent_logs.is_empty() {
            out.push_str("\n\nRecent log:\n");
            for line in &self.recent_logs {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

/// What the user picked in the recovery view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Clear the fault and remount the editor.
    Retry,
    /// Reload the whole host page.
    Reload,
}

#[derive(Debug, Clone, Default)]
pub struct FaultState {
    fault: Option<FaultReport>,
}

impl FaultState {
    /// Record a fault. Later faults while one is shown are only logged.
    pub fn record(&mut self, report: FaultReport) -> bool {
        if self.fault.is_some() {
            tracing::warn!(message = %report.message, "fault while recovery view is shown");
            return false;
        }
        tracing::error!(message = %report.message, location = ?report.location, "editor fault");
        self.fault = Some(report);
        true
    }

    pub fn current(&self) -> Option<&FaultReport> {
        self.fault.as_ref()
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    /// Resolve the fault. Both actions clear it; the caller performs the
    /// remount or page reload.
    pub fn recover(&mut self, action: RecoveryAction) -> Option<FaultReport> {
        tracing::info!(?action, "recovering from fault");
        self.fault.take()
    }
}
