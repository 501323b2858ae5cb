//! Editor styles and marker attributes injected into the sandbox.
//!
//! Everything the editor adds to the sandbox document is tagged with one of
//! these markers so serialization can strip it again.

use folio_core::PlatformError;
use web_sys::{Document, Element};

use crate::js_error;

/// Marks the injected `<style>` node.
pub const STYLE_MARKER: &str = "data-folio-style";
/// Set on bound images, value is the image id.
pub const IMAGE_MARKER: &str = "data-folio-image";
/// Marks elements whose `contenteditable` was set by the editor.
pub const EDITABLE_MARKER: &str = "data-folio-editable";

pub const WRAPPER_CLASS: &str = "folio-image-wrapper";
pub const ICON_CLASS: &str = "folio-image-icon";

pub const ICON_SVG: &str = r#"<svg width="20" height="20" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M11 4H4a2 2 0 0 0-2 2v14a2 2 0 0 0 2 2h14a2 2 0 0 0 2-2v-7"></path><path d="M18.5 2.5a2.121 2.121 0 0 1 3 3L12 15l-4 1 1-4 9.5-9.5z"></path></svg>"#;

const EDITOR_CSS: &str = r#"
body {
    outline: none !important;
    cursor: text !important;
    min-height: 100vh !important;
}
* {
    cursor: text !important;
}
a, button, input, select, textarea {
    cursor: pointer !important;
}
"#;

const IMAGE_CSS: &str = r#"
.folio-image-wrapper {
    position: relative !important;
    cursor: pointer !important;
}
.folio-image-wrapper img {
    transition: opacity 0.2s, filter 0.2s !important;
    cursor: pointer !important;
}
.folio-image-wrapper:hover img {
    opacity: 0.85 !important;
    filter: brightness(0.95) !important;
}
.folio-image-icon {
    position: absolute !important;
    top: 50% !important;
    left: 50% !important;
    transform: translate(-50%, -50%) !important;
    background: rgba(255, 99, 71, 0.95) !important;
    color: white !important;
    width: 50px !important;
    height: 50px !important;
    border-radius: 50% !important;
    display: flex !important;
    align-items: center !important;
    justify-content: center !important;
    cursor: pointer !important;
    opacity: 0 !important;
    transition: opacity 0.3s !important;
    pointer-events: none !important;
    box-shadow: 0 4px 12px rgba(0, 0, 0, 0.3) !important;
}
.folio-image-wrapper:hover .folio-image-icon {
    opacity: 1 !important;
    pointer-events: auto !important;
}
.folio-image-wrapper ~ *,
.folio-image-wrapper + * {
    cursor: text !important;
}
"#;

/// Stylesheet text. Image rules are only included when images are bindable.
pub fn editor_css(with_images: bool) -> String {
    let mut css = EDITOR_CSS.to_string();
    if with_images {
        css.push_str(IMAGE_CSS);
    }
    css
}

/// Replace any previously injected editor stylesheet with a fresh one.
pub fn inject_styles(document: &Document, with_images: bool) -> Result<(), PlatformError> {
    remove_marked(document, STYLE_MARKER)?;

    let style = document
        .create_element("style")
        .map_err(|e| js_error("create style", e))?;
    style
        .set_attribute(STYLE_MARKER, "true")
        .map_err(|e| js_error("mark style", e))?;
    style.set_text_content(Some(editor_css(with_images).as_str()));

    let parent: Element = match document.head() {
        Some(head) => head.into(),
        None => document
            .document_element()
            .ok_or_else(|| PlatformError::from("document has no root element"))?,
    };
    parent
        .append_child(&style)
        .map_err(|e| js_error("append style", e))?;
    Ok(())
}

fn remove_marked(document: &Document, marker: &str) -> Result<(), PlatformError> {
    let existing = document
        .query_selector_all(&format!("[{}]", marker))
        .map_err(|e| js_error("query styles", e))?;
    for i in 0..existing.length() {
        if let Some(node) = existing.item(i) {
            if let Some(parent) = node.parent_node() {
                let _ = parent.remove_child(&node);
            }
        }
    }
    Ok(())
}

/// Set `contenteditable` on an element, remembering that the editor did it.
pub fn mark_editable(element: &Element, value: &str) -> Result<(), PlatformError> {
    if !element.has_attribute("contenteditable") {
        element
            .set_attribute(EDITABLE_MARKER, "")
            .map_err(|e| js_error("mark editable", e))?;
    }
    element
        .set_attribute("contenteditable", value)
        .map_err(|e| js_error("set contenteditable", e))
}
