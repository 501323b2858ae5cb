//! Editor configuration.
//!
//! All timings are tunables, not correctness guarantees. The settle delay in
//! particular is a heuristic for "embedded scripts have finished mutating the
//! tree"; documents with slow asynchronous initialization can still race it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::ToolbarMetrics;

/// Default download name when the host supplies none.
pub const DEFAULT_FILE_NAME: &str = "document.html";

/// Capabilities granted to the sandbox iframe. Nothing else is allowed.
pub const SANDBOX_PERMISSIONS: &str =
    "allow-same-origin allow-scripts allow-forms allow-popups allow-modals";

/// Timing and layout settings for an editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Retry interval while the sandbox document is missing or still loading.
    pub poll_interval_ms: u32,
    /// Wait after the ready signal before editing setup begins.
    pub settle_delay_ms: u32,
    /// Wait after setup before focusing the editable root.
    pub focus_delay_ms: u32,
    pub status_duration_ms: u32,
    pub error_duration_ms: u32,
    pub toolbar: ToolbarMetrics,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            settle_delay_ms: 500,
            focus_delay_ms: 100,
            status_duration_ms: 3000,
            error_duration_ms: 5000,
            toolbar: ToolbarMetrics::default(),
        }
    }
}

impl EditorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms as u64)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms as u64)
    }

    pub fn focus_delay(&self) -> Duration {
        Duration::from_millis(self.focus_delay_ms as u64)
    }

    pub fn status_duration(&self) -> Duration {
        Duration::from_millis(self.status_duration_ms as u64)
    }

    pub fn error_duration(&self) -> Duration {
        Duration::from_millis(self.error_duration_ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.settle_delay(), Duration::from_millis(500));
        assert_eq!(config.error_duration(), Duration::from_secs(5));
        assert_eq!(config.toolbar.min_top, 60.0);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        #[derive(Deserialize)]
        struct Wrapper {
            config: EditorConfig,
        }

        let parsed: Wrapper = serde_json::from_str(
            r#"{ "config": { "settleDelayMs": 1200, "toolbar": { "width": 320 } } }"#,
        )
        .unwrap();
        assert_eq!(parsed.config.settle_delay_ms, 1200);
        assert_eq!(parsed.config.poll_interval_ms, 100);
        assert_eq!(parsed.config.toolbar.width, 320.0);
        assert_eq!(parsed.config.toolbar.height, 48.0);
    }
}
