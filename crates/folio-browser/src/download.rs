//! Offering the serialized document as a file download.

use folio_core::{HTML_MIME_TYPE, PlatformError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

use crate::js_error;

/// Download `html` as `file_name` through a temporary object URL.
pub fn download_html(file_name: &str, html: &str) -> Result<(), PlatformError> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| PlatformError::from("no host document"))?;

    let parts = js_sys::Array::of1(&JsValue::from_str(html));
    let options = BlobPropertyBag::new();
    options.set_type(HTML_MIME_TYPE);
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)
        .map_err(|e| js_error("create blob", e))?;
    let url = Url::create_object_url_with_blob(&blob).map_err(|e| js_error("object url", e))?;

    let anchor: HtmlAnchorElement = document
        .create_element("a")
        .map_err(|e| js_error("create anchor", e))?
        .dyn_into()
        .map_err(|_| PlatformError::from("anchor element has unexpected type"))?;
    anchor.set_href(&url);
    anchor.set_download(file_name);

    let body = document
        .body()
        .ok_or_else(|| PlatformError::from("host document has no body"))?;
    let clicked = body
        .append_child(&anchor)
        .map(|_| anchor.click())
        .map_err(|e| js_error("attach anchor", e));
    anchor.remove();
    let _ = Url::revoke_object_url(&url);
    clicked
}
