//! Document serialization: doctype + root element markup.
//!
//! The platform supplies the doctype node fields and the root's outer HTML;
//! this module composes them the same way `XMLSerializer` renders a doctype,
//! so the saved file reproduces what the author wrote.

use crate::error::EditorError;
use crate::platform::SerializePlatform;

/// MIME type used when offering the serialized document as a download.
pub const HTML_MIME_TYPE: &str = "text/html; charset=utf-8";

/// Fields of a doctype node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctypeInfo {
    pub name: String,
    pub public_id: String,
    pub system_id: String,
}

impl DoctypeInfo {
    pub fn html5() -> Self {
        Self {
            name: "html".into(),
            ..Default::default()
        }
    }
}

/// Render a doctype node as markup.
pub fn format_doctype(doctype: &DoctypeInfo) -> String {
    let mut out = format!("<!DOCTYPE {}", doctype.name);
    if !doctype.public_id.is_empty() {
        out.push_str(" PUBLIC \"");
        out.push_str(&doctype.public_id);
        out.push('"');
    } else if !doctype.system_id.is_empty() {
        out.push_str(" SYSTEM");
    }
    if !doctype.system_id.is_empty() {
        out.push_str(" \"");
        out.push_str(&doctype.system_id);
        out.push('"');
    }
    out.push('>');
    out
}

/// Join an optional doctype and the root element markup.
///
/// A missing doctype is omitted, never invented.
pub fn compose_document(doctype: Option<&DoctypeInfo>, root_outer_html: &str) -> String {
    match doctype {
        Some(dt) => {
            let mut out = format_doctype(dt);
            out.push('\n');
            out.push_str(root_outer_html);
            out
        }
        None => root_outer_html.to_string(),
    }
}

/// Serialize a live sandbox document.
pub fn serialize_document<P: SerializePlatform + ?Sized>(
    platform: &P,
) -> Result<String, EditorError> {
    let doctype = platform.doctype().map_err(EditorError::serialization)?;
    let root = platform
        .root_outer_html()
        .map_err(EditorError::serialization)?;
    Ok(compose_document(doctype.as_ref(), &root))
}

/// Whether a file name has an extension we accept for loading.
pub fn is_html_file_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

/// Cheap pre-check for candidate HTML before handing it to a real parser.
pub fn is_candidate_html(text: &str) -> bool {
    !text.trim().is_empty() && !text.contains('\0')
}
