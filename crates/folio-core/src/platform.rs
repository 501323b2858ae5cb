//! Platform abstraction traits for sandbox operations.
//!
//! These traits define the interface between the editing-session logic and
//! the rendering engine hosting the document. The browser implementation
//! drives an iframe through `web-sys`; tests drive an in-memory fake. This
//! keeps the selection, command and link protocols testable without a
//! rendering engine.

use crate::serialize::DoctypeInfo;
use crate::types::{ImageId, Rect};

/// Error type for platform operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError(pub String);

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PlatformError {}

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// A live selection read from the platform.
#[derive(Debug, Clone)]
pub struct NativeSelection<R> {
    /// Independent clone of the first range of the selection.
    pub range: R,
    /// Text content covered by the range.
    pub text: String,
    /// Bounding rectangle, relative to the sandbox viewport.
    pub rect: Rect,
    /// Whether the range is zero-length.
    pub collapsed: bool,
}

/// Reading and restoring the native text selection.
pub trait SelectionPlatform {
    /// Cloned range type. Must stay valid after the live selection changes.
    type Range: Clone;

    /// Read the current selection, cloning its first range.
    ///
    /// Returns None if there is no selection or it has no ranges.
    fn get_selection(&self) -> Option<NativeSelection<Self::Range>>;

    /// Replace the native selection with the given range.
    ///
    /// Fails if the range no longer belongs to a live document.
    fn restore_selection(&self, range: &Self::Range) -> Result<(), PlatformError>;
}

/// Native formatting commands (`execCommand` in browsers).
pub trait FormatPlatform {
    /// Apply a named formatting command to the current selection.
    ///
    /// Returns whether the engine reported the command as applied.
    fn apply_format_command(&self, command: &str, value: Option<&str>)
    -> Result<bool, PlatformError>;
}

/// Existing anchor around the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorInfo {
    pub href: String,
    pub text: String,
}

/// Link inspection and literal text insertion.
pub trait LinkPlatform {
    /// Nearest anchor element containing the selection's anchor node.
    fn enclosing_anchor(&self) -> Option<AnchorInfo>;

    /// Insert `text` as a new text node at the (collapsed) selection and
    /// select the inserted node.
    fn insert_text_and_select(&self, text: &str) -> Result<(), PlatformError>;
}

/// Display flow of an image, used to pick its wrapper container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayFlow {
    Block,
    Inline,
}

/// Image discovery and mutation inside the sandbox tree.
pub trait ImagePlatform {
    /// Opaque reference to an image element.
    type Image;

    /// All image elements currently in the tree, in document order.
    fn images(&self) -> Vec<Self::Image>;

    /// Whether this exact image was bound by this sandbox. A copy carrying
    /// the marker attribute is not.
    fn is_bound(&self, image: &Self::Image) -> bool;

    /// Computed display flow of the image.
    fn display_flow(&self, image: &Self::Image) -> DisplayFlow;

    /// Mark the image with `id`, wrap it, and attach the click affordance.
    fn bind_image(
        &self,
        image: &Self::Image,
        id: ImageId,
        flow: DisplayFlow,
    ) -> Result<(), PlatformError>;

    /// Set the source of a bound image in place.
    fn set_image_source(&self, id: ImageId, url: &str) -> Result<(), PlatformError>;
}

/// Reading the document back out.
pub trait SerializePlatform {
    /// The document's doctype node, if one was authored.
    fn doctype(&self) -> Result<Option<DoctypeInfo>, PlatformError>;

    /// Outer markup of the root element, with all live mutations applied.
    fn root_outer_html(&self) -> Result<String, PlatformError>;
}

/// Everything a sandbox must provide to host an editing session.
pub trait SandboxPlatform:
    SelectionPlatform + FormatPlatform + LinkPlatform + ImagePlatform + SerializePlatform
{
}

impl<T> SandboxPlatform for T where
    T: SelectionPlatform + FormatPlatform + LinkPlatform + ImagePlatform + SerializePlatform
{
}
