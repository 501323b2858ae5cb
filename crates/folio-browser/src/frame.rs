//! Sandbox iframe lifecycle: creation, injection, readiness, swapping.
//!
//! Every load gets a fresh iframe. It stays hidden until its document is
//! ready, then replaces the visible one. A failed load removes only its own
//! frame, so the previous document stays on screen.

use folio_core::{PlatformError, Readiness, ReadinessProbe, SANDBOX_PERMISSIONS, SandboxId};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlDocument, HtmlElement, HtmlIFrameElement};

use crate::js_error;

pub const FRAME_CLASS: &str = "folio-frame";

const PENDING_STYLE: &str = "visibility:hidden;position:absolute;inset:0;";
const FRAME_STYLE: &str = "width:100%;height:100%;border:0;display:block;";

/// Give a statically positioned container `position: relative`, so the
/// loading frame overlays the visible one instead of the page.
pub fn ensure_positioned(container: &Element) {
    let Some(element) = container.dyn_ref::<HtmlElement>() else {
        return;
    };
    let style = element.style();
    if !style.get_property_value("position").unwrap_or_default().is_empty() {
        return;
    }
    let computed = container
        .owner_document()
        .and_then(|d| d.default_view())
        .and_then(|w| w.get_computed_style(container).ok().flatten())
        .and_then(|s| s.get_property_value("position").ok())
        .unwrap_or_default();
    if computed.is_empty() || computed == "static" {
        if let Err(e) = style.set_property("position", "relative") {
            tracing::debug!("cannot position container: {:?}", e);
        }
    }
}

/// Create a sandboxed iframe inside `container`, hidden until revealed.
pub fn create_frame(container: &Element, id: SandboxId) -> Result<HtmlIFrameElement, PlatformError> {
    let document = container
        .owner_document()
        .ok_or_else(|| PlatformError::from("container is detached"))?;
    let frame: HtmlIFrameElement = document
        .create_element("iframe")
        .map_err(|e| js_error("create iframe", e))?
        .dyn_into()
        .map_err(|_| PlatformError::from("iframe element has unexpected type"))?;

    // Must be set before the frame is attached.
    frame
        .set_attribute("sandbox", SANDBOX_PERMISSIONS)
        .map_err(|e| js_error("set sandbox", e))?;
    frame.set_class_name(FRAME_CLASS);
    frame
        .set_attribute("title", "Document editor")
        .map_err(|e| js_error("set title", e))?;
    frame
        .set_attribute("data-folio-sandbox", &id.0.to_string())
        .map_err(|e| js_error("set sandbox id", e))?;
    frame
        .set_attribute("style", &format!("{}{}", FRAME_STYLE, PENDING_STYLE))
        .map_err(|e| js_error("set style", e))?;

    container
        .append_child(&frame)
        .map_err(|e| js_error("attach iframe", e))?;
    Ok(frame)
}

/// Write a complete document into the frame, replacing whatever it held.
pub fn write_document(frame: &HtmlIFrameElement, html: &str) -> Result<(), PlatformError> {
    let document = html_document(frame)?;
    document.open().map_err(|e| js_error("document.open", e))?;
    let chunks = js_sys::Array::of1(&JsValue::from_str(html));
    document
        .write(&chunks)
        .map_err(|e| js_error("document.write", e))?;
    document.close().map_err(|e| js_error("document.close", e))?;
    Ok(())
}

/// The frame's document as an `HtmlDocument`, which carries the legacy
/// `open`/`write`/`execCommand` API.
pub fn html_document(frame: &HtmlIFrameElement) -> Result<HtmlDocument, PlatformError> {
    frame
        .content_document()
        .ok_or_else(|| PlatformError::from("cannot access iframe document"))?
        .dyn_into::<HtmlDocument>()
        .map_err(|_| PlatformError::from("iframe document is not an HTML document"))
}

/// Show a frame that finished loading.
pub fn reveal(frame: &HtmlIFrameElement) -> Result<(), PlatformError> {
    frame
        .set_attribute("style", FRAME_STYLE)
        .map_err(|e| js_error("reveal iframe", e))
}

/// Readiness of one iframe's document.
pub struct FrameProbe<'a>(pub &'a HtmlIFrameElement);

impl ReadinessProbe for FrameProbe<'_> {
    fn readiness(&self) -> Readiness {
        match self.0.content_document() {
            None => Readiness::DocumentUnavailable,
            Some(doc) if doc.ready_state() == "complete" => Readiness::Complete,
            Some(_) => Readiness::Loading,
        }
    }
}

/// The visible frame plus the one currently loading, if any.
#[derive(Default)]
pub struct FrameSlot {
    shown: Option<HtmlIFrameElement>,
    pending: Option<(SandboxId, HtmlIFrameElement)>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new loading frame. An older pending frame is removed.
    pub fn set_pending(&mut self, id: SandboxId, frame: HtmlIFrameElement) {
        if let Some((old_id, old)) = self.pending.replace((id, frame)) {
            tracing::debug!(sandbox = %old_id, "discarding superseded frame");
            old.remove();
        }
    }

    /// Promote the pending frame for `id` and drop the old visible one.
    pub fn promote(&mut self, id: SandboxId) -> Result<(), PlatformError> {
        let frame = match self.pending.take() {
            Some((pending_id, frame)) if pending_id == id => frame,
            other => {
                self.pending = other;
                return Err(format!("{} is not the pending frame", id).into());
            }
        };
        reveal(&frame)?;
        if let Some(old) = self.shown.replace(frame) {
            old.remove();
        }
        Ok(())
    }

    /// Remove the pending frame for `id`, leaving the visible one.
    pub fn discard(&mut self, id: SandboxId) {
        if self.pending.as_ref().is_some_and(|(pending_id, _)| *pending_id == id) {
            if let Some((_, frame)) = self.pending.take() {
                frame.remove();
            }
        }
    }

    /// Remove every frame.
    pub fn clear(&mut self) {
        if let Some((_, frame)) = self.pending.take() {
            frame.remove();
        }
        if let Some(frame) = self.shown.take() {
            frame.remove();
        }
    }

    pub fn shown(&self) -> Option<&HtmlIFrameElement> {
        self.shown.as_ref()
    }
}
