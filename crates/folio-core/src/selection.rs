//! Selection tracking.
//!
//! The tracker holds at most one [`SelectionSnapshot`], tagged with the
//! sandbox it was captured from. Native selections are volatile (focus moving
//! to the toolbar collapses them) so the tracker always stores a cloned range.

use crate::platform::{PlatformError, SelectionPlatform};
use crate::types::{
    Rect, SandboxId, SelectionChanged, SelectionSnapshot, ToolbarMetrics, toolbar_position,
};

/// Why a snapshot could not be put back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreError {
    /// Nothing captured.
    NoSnapshot,
    /// The snapshot came from a sandbox that is no longer current.
    ForeignSandbox,
    /// The platform rejected the range (detached from its document).
    Detached(PlatformError),
}

impl std::fmt::Display for RestoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestoreError::NoSnapshot => write!(f, "no selection captured"),
            RestoreError::ForeignSandbox => write!(f, "selection belongs to a replaced sandbox"),
            RestoreError::Detached(e) => write!(f, "selection range detached: {}", e),
        }
    }
}

/// Tracks the restorable selection of the current sandbox.
#[derive(Debug, Clone)]
pub struct SelectionTracker<R> {
    sandbox: Option<SandboxId>,
    snapshot: Option<SelectionSnapshot<R>>,
}

impl<R> Default for SelectionTracker<R> {
    fn default() -> Self {
        Self {
            sandbox: None,
            snapshot: None,
        }
    }
}

impl<R: Clone> SelectionTracker<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a new sandbox, dropping anything captured from the old one.
    pub fn reset_for(&mut self, sandbox: SandboxId) {
        self.sandbox = Some(sandbox);
        self.snapshot = None;
    }

    /// Stop tracking entirely.
    pub fn detach(&mut self) {
        self.sandbox = None;
        self.snapshot = None;
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
    }

    pub fn sandbox(&self) -> Option<SandboxId> {
        self.sandbox
    }

    pub fn snapshot(&self) -> Option<&SelectionSnapshot<R>> {
        self.snapshot.as_ref()
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Handle a native selection change or pointer-up.
    ///
    /// Absent, collapsed and whitespace-only selections clear the snapshot and
    /// hide the toolbar. Anything else is captured and positioned.
    pub fn on_selection_change<P>(
        &mut self,
        platform: &P,
        frame: &Rect,
        metrics: &ToolbarMetrics,
        viewport_width: f64,
    ) -> SelectionChanged
    where
        P: SelectionPlatform<Range = R> + ?Sized,
    {
        let Some(sandbox) = self.sandbox else {
            return SelectionChanged::hidden();
        };

        let selection = match platform.get_selection() {
            Some(sel) if !sel.collapsed && !sel.text.trim().is_empty() => sel,
            _ => {
                self.snapshot = None;
                return SelectionChanged::hidden();
            }
        };

        let anchor = toolbar_position(&selection.rect, frame, metrics, viewport_width);
        let rect = selection.rect;
        tracing::trace!(
            target: "folio::selection",
            chars = selection.text.chars().count(),
            top = anchor.top,
            left = anchor.left,
            "captured selection"
        );
        self.snapshot = Some(SelectionSnapshot {
            sandbox,
            range: selection.range,
            text: selection.text,
            rect,
            collapsed: false,
        });
        SelectionChanged::shown(rect, anchor)
    }

    /// Scrolling hides floating UI. The snapshot survives so a command
    /// issued right after still has a target.
    pub fn on_scroll(&self) -> SelectionChanged {
        SelectionChanged::hidden()
    }

    /// Put the snapshot back as the native selection of `current`.
    pub fn restore<P>(&self, platform: &P, current: SandboxId) -> Result<(), RestoreError>
    where
        P: SelectionPlatform<Range = R> + ?Sized,
    {
        let snapshot = self.snapshot.as_ref().ok_or(RestoreError::NoSnapshot)?;
        if !snapshot.belongs_to(current) || self.sandbox != Some(current) {
            return Err(RestoreError::ForeignSandbox);
        }
        platform
            .restore_selection(&snapshot.range)
            .map_err(RestoreError::Detached)
    }

    /// Re-read the selection after a mutation.
    ///
    /// Unlike user-driven changes, a collapsed result is kept: the caret is
    /// still a valid target for the next command. No selection clears it.
    pub fn recapture<P>(&mut self, platform: &P)
    where
        P: SelectionPlatform<Range = R> + ?Sized,
    {
        let Some(sandbox) = self.sandbox else {
            self.snapshot = None;
            return;
        };
        self.snapshot = platform.get_selection().map(|sel| SelectionSnapshot {
            sandbox,
            range: sel.range,
            text: sel.text,
            rect: sel.rect,
            collapsed: sel.collapsed,
        });
    }
}
