//! Browser sandbox layer for the folio HTML editor.
//!
//! This crate implements the `folio-core` platform traits on top of a
//! sandboxed iframe and drives the load cycle with real timers. It assumes
//! a `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `frame`: iframe creation, document injection, pending/visible swap
//! - `sandbox`: `BrowserSandbox`, the platform trait implementations
//! - `style`: injected stylesheet and the markers serialization strips
//! - `editor`: `BrowserEditor`, the controller bound to a container element
//! - `file` / `download`: reading local `.html` files and saving them back
//!
//! # Re-exports
//!
//! This crate re-exports `folio-core` for convenience, so consumers only
//! need to depend on `folio-browser`.

pub use folio_core;
pub use folio_core::*;

pub mod download;
pub mod editor;
pub mod file;
pub mod frame;
pub mod sandbox;
pub mod style;
pub mod timer;

pub use download::download_html;
pub use editor::BrowserEditor;
pub use file::{is_valid_html, read_html_file};
pub use frame::{FrameProbe, FrameSlot};
pub use sandbox::{BrowserSandbox, SandboxEvent, strip_editor_artifacts};
pub use timer::{GlooTimer, MessageTimer};

use wasm_bindgen::JsValue;

/// Wrap a thrown JS value with what we were doing when it was thrown.
pub(crate) fn js_error(context: &str, err: JsValue) -> PlatformError {
    PlatformError(format!("{}: {:?}", context, err))
}
