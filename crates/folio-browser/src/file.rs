//! Reading user-selected `.html` files.

use folio_core::{EditorError, is_candidate_html, is_html_file_name};
use wasm_bindgen_futures::JsFuture;
use web_sys::{DomParser, File, SupportedType};

/// Read `file` as text and check it parses as an HTML document.
pub async fn read_html_file(file: &File) -> Result<String, EditorError> {
    let name = file.name();
    if !is_html_file_name(&name) {
        return Err(EditorError::FileRead(format!("unsupported file type: {}", name)));
    }

    let value = JsFuture::from(file.text())
        .await
        .map_err(|e| EditorError::FileRead(format!("{:?}", e)))?;
    let text = value
        .as_string()
        .ok_or_else(|| EditorError::InvalidContent("file content is not text".into()))?;

    if !is_valid_html(&text) {
        return Err(EditorError::InvalidContent(format!("{} is not an HTML document", name)));
    }
    tracing::debug!(file = %name, bytes = text.len(), "file read");
    Ok(text)
}

/// Whether `text` parses into a document rooted at `<html>`.
pub fn is_valid_html(text: &str) -> bool {
    if !is_candidate_html(text) {
        return false;
    }
    let Ok(parser) = DomParser::new() else {
        return false;
    };
    parser
        .parse_from_string(text, SupportedType::TextHtml)
        .ok()
        .and_then(|doc| doc.document_element())
        .is_some_and(|root| root.tag_name().eq_ignore_ascii_case("html"))
}
