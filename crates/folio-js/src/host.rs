//! `EditorHost` backed by JavaScript callbacks.

use std::cell::RefCell;
use std::rc::Rc;

use folio_browser::{EditorHost, ImageHandle, PlatformError, SelectionChanged, download_html};
use wasm_bindgen::JsValue;

use crate::types::{JsImageRequest, JsMessages};

/// Callbacks registered from JS. Any of them may be unset.
#[derive(Default)]
pub struct Callbacks {
    pub on_change: Option<js_sys::Function>,
    pub on_save: Option<js_sys::Function>,
    pub on_selection_change: Option<js_sys::Function>,
    pub on_image_request: Option<js_sys::Function>,
    pub on_messages: Option<js_sys::Function>,
}

/// Shared so callbacks can be replaced after the editor is mounted.
#[derive(Clone, Default)]
pub struct JsHost {
    pub callbacks: Rc<RefCell<Callbacks>>,
}

impl JsHost {
    fn call(&self, pick: impl Fn(&Callbacks) -> Option<&js_sys::Function>, arg: &JsValue) -> Result<(), JsValue> {
        // Cloned out so a callback can replace callbacks while it runs.
        let callback = pick(&self.callbacks.borrow()).cloned();
        match callback {
            Some(callback) => callback.call1(&JsValue::NULL, arg).map(|_| ()),
            None => Ok(()),
        }
    }

    fn call_logged(&self, name: &str, pick: impl Fn(&Callbacks) -> Option<&js_sys::Function>, arg: &JsValue) {
        if let Err(e) = self.call(pick, arg) {
            tracing::error!(callback = name, "host callback threw: {:?}", e);
        }
    }
}

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::UNDEFINED)
}

impl EditorHost for JsHost {
    fn on_change(&self, html: &str) {
        self.call_logged("onChange", |c| c.on_change.as_ref(), &JsValue::from_str(html));
    }

    fn on_save(&self, html: &str) -> Result<(), PlatformError> {
        self.call(|c| c.on_save.as_ref(), &JsValue::from_str(html))
            .map_err(|e| PlatformError(format!("onSave threw: {:?}", e)))
    }

    fn download(&self, file_name: &str, html: &str) -> Result<(), PlatformError> {
        download_html(file_name, html)
    }

    fn on_selection_changed(&self, change: SelectionChanged) {
        self.call_logged("onSelectionChange", |c| c.on_selection_change.as_ref(), &to_js(&change));
    }

    fn on_image_request(&self, request: Option<ImageHandle>) {
        let arg = match request {
            Some(handle) => to_js(&JsImageRequest {
                sandbox: handle.sandbox.0,
                image: handle.image.0,
            }),
            None => JsValue::NULL,
        };
        self.call_logged("onImageRequest", |c| c.on_image_request.as_ref(), &arg);
    }

    fn on_messages(&self, status: Option<&str>, error: Option<&str>) {
        let messages = JsMessages {
            status: status.map(str::to_string),
            error: error.map(str::to_string),
        };
        self.call_logged("onMessages", |c| c.on_messages.as_ref(), &to_js(&messages));
    }
}
