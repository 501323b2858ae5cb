//! Ring buffer of recent editor log lines, attached to fault reports.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const MAX_ENTRIES: usize = 100;

/// Targets are module paths (`folio_core::load`) or explicit `folio::*` names.
const CAPTURED_PREFIXES: &[&str] = &["folio"];

const BUFFER_MIN_LEVEL: Level = Level::DEBUG;

thread_local! {
    static LOG_BUFFER: RefCell<VecDeque<String>> = RefCell::new(VecDeque::with_capacity(MAX_ENTRIES));
}

/// Copies folio events into the ring buffer. Console output is WASMLayer's job.
pub struct LogCaptureLayer;

impl<S: Subscriber> Layer<S> for LogCaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = metadata.level();
        let target = metadata.target();

        let ours = CAPTURED_PREFIXES.iter().any(|prefix| target.starts_with(prefix));
        if !ours || *level > BUFFER_MIN_LEVEL {
            return;
        }

        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        let line = format!("[{}] {}: {}", level, target, message);

        LOG_BUFFER.with(|buf| {
            let mut buf = buf.borrow_mut();
            if buf.len() >= MAX_ENTRIES {
                buf.pop_front();
            }
            buf.push_back(line);
        });
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl MessageVisitor<'_> {
    fn separate(&mut self) {
        if !self.0.is_empty() {
            self.0.push_str(", ");
        }
    }
}

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.0, "{:?}", value);
        } else {
            self.separate();
            let _ = write!(self.0, "{}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0.push_str(value);
        } else {
            self.separate();
            let _ = write!(self.0, "{}={}", field.name(), value);
        }
    }
}

/// Buffered lines, oldest first.
pub fn recent_logs() -> Vec<String> {
    LOG_BUFFER.with(|buf| buf.borrow().iter().cloned().collect())
}

pub fn clear_logs() {
    LOG_BUFFER.with(|buf| buf.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_captures_only_folio_targets() {
        clear_logs();
        let subscriber = Registry::default().with(LogCaptureLayer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "folio::load", sandbox = "sandbox-1", "load started");
            tracing::info!(target: "other_crate", "ignored");
            tracing::trace!(target: "folio::selection", "too verbose");
        });

        let logs = recent_logs();
        assert_eq!(logs, vec!["[INFO] folio::load: load started, sandbox=sandbox-1"]);
    }

    #[test]
    fn test_buffer_is_bounded() {
        clear_logs();
        let subscriber = Registry::default().with(LogCaptureLayer);
        tracing::subscriber::with_default(subscriber, || {
            for i in 0..(MAX_ENTRIES + 5) {
                tracing::debug!(target: "folio::load", "line {}", i);
            }
        });

        let logs = recent_logs();
        assert_eq!(logs.len(), MAX_ENTRIES);
        assert!(logs[0].ends_with("line 5"));
    }
}
