//! Core session types: geometry, sandbox identity, snapshots and link context.
//!
//! These types are platform-agnostic; the browser layer converts `DomRect`s
//! and DOM ranges into them.

use serde::{Deserialize, Serialize};

/// Identity of one sandbox instance.
///
/// Every load cycle produces a new id. Work tagged with an id that is no
/// longer current must be dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SandboxId(pub u64);

impl std::fmt::Display for SandboxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sandbox-{}", self.0)
    }
}

/// Identifier assigned to an image when it is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub u32);

/// Weak reference to a bound image: valid only while its sandbox is current.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    pub sandbox: SandboxId,
    pub image: ImageId,
}

/// Axis-aligned rectangle in CSS pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// Dimensions of the floating toolbar box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolbarMetrics {
    pub height: f64,
    pub width: f64,
    pub padding: f64,
    /// Anything above this gets flipped below the selection.
    pub min_top: f64,
}

impl Default for ToolbarMetrics {
    fn default() -> Self {
        Self {
            height: 48.0,
            width: 400.0,
            padding: 8.0,
            min_top: 60.0,
        }
    }
}

/// Viewport position for the floating toolbar.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolbarPosition {
    pub top: f64,
    pub left: f64,
}

/// Place the toolbar centered above the selection, clamped to the viewport.
///
/// `selection` is relative to the sandbox viewport, `frame` is the sandbox's
/// own rect relative to the host viewport.
pub fn toolbar_position(
    selection: &Rect,
    frame: &Rect,
    metrics: &ToolbarMetrics,
    viewport_width: f64,
) -> ToolbarPosition {
    let mut top = frame.top + selection.top - metrics.height - metrics.padding;
    let mut left = frame.left + selection.left + selection.width / 2.0 - metrics.width / 2.0;

    if top < metrics.min_top {
        top = frame.top + selection.bottom() + metrics.padding;
    }
    if left + metrics.width > viewport_width - metrics.padding {
        left = viewport_width - metrics.width - metrics.padding;
    }
    if left < metrics.padding {
        left = metrics.padding;
    }

    ToolbarPosition { top, left }
}

/// A restorable selection captured from one sandbox.
#[derive(Clone, Debug)]
pub struct SelectionSnapshot<R> {
    pub sandbox: SandboxId,
    pub range: R,
    pub text: String,
    pub rect: Rect,
    pub collapsed: bool,
}

impl<R> SelectionSnapshot<R> {
    pub fn belongs_to(&self, sandbox: SandboxId) -> bool {
        self.sandbox == sandbox
    }
}

/// Payload of the "selection changed" signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionChanged {
    pub has_selection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<ToolbarPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
}

impl SelectionChanged {
    pub fn hidden() -> Self {
        Self::default()
    }

    pub fn shown(rect: Rect, anchor: ToolbarPosition) -> Self {
        Self {
            has_selection: true,
            anchor: Some(anchor),
            rect: Some(rect),
        }
    }
}

/// Link state around the selection when the link editor opens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum LinkContext {
    /// Selection is inside an existing anchor.
    Edit { url: String, text: String },
    /// No anchor; `text` is the selected text proposed as link text.
    Create { text: String },
}

impl LinkContext {
    pub fn url(&self) -> &str {
        match self {
            LinkContext::Edit { url, .. } => url,
            LinkContext::Create { .. } => "",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            LinkContext::Edit { text, .. } | LinkContext::Create { text } => text,
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self, LinkContext::Edit { .. })
    }
}
