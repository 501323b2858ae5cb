//! JsHtmlEditor - the editor wrapper exposed to JavaScript.

use std::cell::RefCell;
use std::rc::Rc;

use folio_browser::{
    BrowserEditor, BrowserSandbox, EditorConfig, EditorController, FormatCommand, LinkOutcome,
};
use wasm_bindgen::prelude::*;
use web_sys::{HtmlElement, HtmlInputElement};

use crate::boundary::FaultBoundary;
use crate::host::JsHost;
use crate::types::{EditorOptions, JsCommand, JsMessages};

/// An HTML document editor mounted into a host element.
///
/// The document lives in a sandboxed iframe inside the container. Toolbar,
/// link dialog and image picker are the host's; this object reports what
/// they should show through the registered callbacks.
type EditorSlot = Rc<RefCell<Option<BrowserEditor<JsHost>>>>;

#[wasm_bindgen(js_name = HtmlEditor)]
pub struct JsHtmlEditor {
    options: EditorOptions,
    host: JsHost,
    editor: EditorSlot,
    boundary: Option<Rc<FaultBoundary>>,
}

#[wasm_bindgen(js_class = HtmlEditor)]
impl JsHtmlEditor {
    #[wasm_bindgen(constructor)]
    pub fn new(options: EditorOptions) -> Self {
        Self {
            options,
            host: JsHost::default(),
            editor: Rc::new(RefCell::new(None)),
            boundary: None,
        }
    }

    // === Callbacks ===

    /// Called with the full serialized document after each committed edit.
    #[wasm_bindgen(js_name = setOnChange)]
    pub fn set_on_change(&self, callback: Option<js_sys::Function>) {
        self.host.callbacks.borrow_mut().on_change = callback;
    }

    /// Called with the document on save, before the download. Errors thrown
    /// here are logged and do not stop the download.
    #[wasm_bindgen(js_name = setOnSave)]
    pub fn set_on_save(&self, callback: Option<js_sys::Function>) {
        self.host.callbacks.borrow_mut().on_save = callback;
    }

    /// Called with `{ hasSelection, anchor?, rect? }` for the floating toolbar.
    #[wasm_bindgen(js_name = setOnSelectionChange)]
    pub fn set_on_selection_change(&self, callback: Option<js_sys::Function>) {
        self.host.callbacks.borrow_mut().on_selection_change = callback;
    }

    /// Called with `{ sandbox, image }` to open the picker, `null` to close it.
    #[wasm_bindgen(js_name = setOnImageRequest)]
    pub fn set_on_image_request(&self, callback: Option<js_sys::Function>) {
        self.host.callbacks.borrow_mut().on_image_request = callback;
    }

    #[wasm_bindgen(js_name = setOnMessages)]
    pub fn set_on_messages(&self, callback: Option<js_sys::Function>) {
        self.host.callbacks.borrow_mut().on_messages = callback;
    }

    // === Mounting ===

    /// Mount into `container` and load the initial document.
    #[wasm_bindgen]
    pub fn mount(&mut self, container: &HtmlElement) -> Result<(), JsError> {
        if self.is_mounted() {
            return Err(JsError::new("Editor is already mounted"));
        }

        let element: web_sys::Element = container.clone().into();
        let boundary = FaultBoundary::install(element.clone());

        let slot = self.editor.clone();
        let options = self.options.clone();
        let host = self.host.clone();
        let retry_container = element.clone();
        boundary.set_retry(Rc::new(move || {
            remount(&slot, &retry_container, &options, &host);
        }));

        remount(&self.editor, &element, &self.options, &self.host);
        self.boundary = Some(boundary);
        Ok(())
    }

    #[wasm_bindgen(js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        self.editor.borrow().is_some()
    }

    /// Stop loads, listeners and timers and remove the sandbox.
    #[wasm_bindgen]
    pub fn unmount(&mut self) {
        let editor = self.editor.borrow_mut().take();
        if let Some(editor) = editor {
            editor.unmount();
        }
        if let Some(boundary) = self.boundary.take() {
            boundary.uninstall();
        }
    }

    // === Documents ===

    /// Replace the document with `html`. Empty input is ignored.
    #[wasm_bindgen]
    pub fn load(&self, html: &str) {
        if let Some(editor) = self.current() {
            editor.load(html);
        }
    }

    /// Load a user-selected `.html`/`.htm` file.
    #[wasm_bindgen(js_name = loadFile)]
    pub fn load_file(&self, file: web_sys::File) {
        if let Some(editor) = self.current() {
            editor.load_file(file);
        }
    }

    /// Load the first file of a file input, then clear the input so the same
    /// file can be picked again.
    #[wasm_bindgen(js_name = loadFromInput)]
    pub fn load_from_input(&self, input: &HtmlInputElement) {
        if let Some(file) = input.files().and_then(|files| files.get(0)) {
            self.load_file(file);
        }
        input.set_value("");
    }

    /// Serialize and offer the document as a download.
    #[wasm_bindgen]
    pub fn save(&self) -> bool {
        self.current().is_some_and(|e| e.save())
    }

    /// The serialized document, or `""` if it cannot be read.
    #[wasm_bindgen(js_name = getHtml)]
    pub fn get_html(&self) -> String {
        self.current()
            .map(|e| e.get_html())
            .unwrap_or_default()
    }

    /// Reload the initial document. `confirmed` is the user's answer to the
    /// host's confirmation prompt.
    #[wasm_bindgen]
    pub fn reset(&self, confirmed: bool) {
        if let Some(editor) = self.current() {
            editor.reset(confirmed);
        }
    }

    // === Formatting ===

    /// Run a formatting command on the tracked selection.
    #[wasm_bindgen(js_name = executeCommand)]
    pub fn execute_command(&self, command: JsCommand) -> bool {
        let command = FormatCommand::parse(&command.command, command.value.as_deref());
        self.current()
            .is_some_and(|e| e.execute(&command).mutated())
    }

    // === Links ===

    /// Link context for the dialog (`{ mode: "edit", url, text }` or
    /// `{ mode: "create", text }`), or `null` with nothing selected.
    #[wasm_bindgen(js_name = openLinkEditor)]
    pub fn open_link_editor(&self) -> JsValue {
        self.current()
            .and_then(|e| e.open_link_editor())
            .and_then(|ctx| serde_wasm_bindgen::to_value(&ctx).ok())
            .unwrap_or(JsValue::NULL)
    }

    #[wasm_bindgen(js_name = saveLink)]
    pub fn save_link(&self, url: &str, text: &str) -> bool {
        self.current()
            .is_some_and(|e| !matches!(e.save_link(url, text), LinkOutcome::Skipped))
    }

    #[wasm_bindgen(js_name = removeLink)]
    pub fn remove_link(&self) -> bool {
        self.current()
            .is_some_and(|e| e.remove_link() == LinkOutcome::Removed)
    }

    // === Images ===

    /// Replace the requested image with `url`, one of `assets`.
    #[wasm_bindgen(js_name = selectImage)]
    pub fn select_image(&self, url: &str) -> bool {
        self.current().is_some_and(|e| e.select_image(url))
    }

    #[wasm_bindgen(js_name = cancelImagePicker)]
    pub fn cancel_image_picker(&self) {
        if let Some(editor) = self.current() {
            editor.cancel_image_picker();
        }
    }

    #[wasm_bindgen(js_name = getAssets)]
    pub fn get_assets(&self) -> Vec<String> {
        self.options.assets.clone()
    }

    // === State ===

    #[wasm_bindgen(js_name = getFileName)]
    pub fn get_file_name(&self) -> String {
        self.read(|c| c.session().current_file_name().to_string())
            .unwrap_or_else(|| self.options.file_name.clone().unwrap_or_default())
    }

    /// `idle`, `injecting`, `waitingReady`, `ready` or `failed`.
    #[wasm_bindgen(js_name = getLoadState)]
    pub fn get_load_state(&self) -> String {
        self.read(|c| c.session().load_state().as_str().to_string())
            .unwrap_or_else(|| "idle".to_string())
    }

    #[wasm_bindgen(js_name = isBusy)]
    pub fn is_busy(&self) -> bool {
        self.read(|c| c.session().is_busy()).unwrap_or(false)
    }

    #[wasm_bindgen(js_name = getMessages)]
    pub fn get_messages(&self) -> JsMessages {
        self.read(|c| JsMessages {
            status: c.session().status().map(|m| m.text.clone()),
            error: c.session().error().map(|m| m.text.clone()),
        })
        .unwrap_or_default()
    }

    #[wasm_bindgen(js_name = getShowToolbar)]
    pub fn get_show_toolbar(&self) -> bool {
        self.read(|c| c.session().show_toolbar())
            .unwrap_or(self.options.show_toolbar.unwrap_or(true))
    }

    #[wasm_bindgen(js_name = setShowToolbar)]
    pub fn set_show_toolbar(&self, show: bool) {
        if let Some(editor) = self.current() {
            editor.set_show_toolbar(show);
        }
    }

    /// Whether the recovery view is showing.
    #[wasm_bindgen(js_name = isFaulted)]
    pub fn is_faulted(&self) -> bool {
        self.boundary.as_ref().is_some_and(|b| b.is_faulted())
    }
}

impl JsHtmlEditor {
    /// The mounted editor, cloned out so host callbacks can reach this
    /// object again while it runs.
    fn current(&self) -> Option<BrowserEditor<JsHost>> {
        self.editor.borrow().clone()
    }

    fn read<R>(
        &self,
        f: impl FnOnce(&EditorController<BrowserSandbox, JsHost>) -> R,
    ) -> Option<R> {
        self.current()?.read(f)
    }
}

/// Replace whatever editor `slot` holds with a fresh one and load the
/// initial document.
///
/// A panic can leave the old controller borrowed for good, so recovery never
/// reuses it.
fn remount(slot: &EditorSlot, container: &web_sys::Element, options: &EditorOptions, host: &JsHost) {
    let stale = slot.borrow_mut().take();
    if let Some(stale) = stale {
        stale.unmount();
    }
    let editor = BrowserEditor::new(container.clone(), build_controller(options, host));
    *slot.borrow_mut() = Some(editor.clone());
    editor.mount();
}

fn build_controller(
    options: &EditorOptions,
    host: &JsHost,
) -> EditorController<BrowserSandbox, JsHost> {
    let config = options
        .config
        .clone()
        .map(EditorConfig::from)
        .unwrap_or_default();
    let controller = EditorController::new(options.initial_html.clone(), config, host.clone())
        .with_assets(options.assets.clone())
        .with_show_toolbar(options.show_toolbar.unwrap_or(true));
    match &options.file_name {
        Some(name) => controller.with_file_name(name.clone()),
        None => controller,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn options() -> EditorOptions {
        EditorOptions {
            initial_html: "<!DOCTYPE html><html><body><p>start</p></body></html>".to_string(),
            ..EditorOptions::default()
        }
    }

    fn container() -> web_sys::Element {
        let document = web_sys::window().unwrap().document().unwrap();
        let container = document.create_element("div").unwrap();
        document.body().unwrap().append_child(&container).unwrap();
        container
    }

    #[wasm_bindgen_test]
    fn test_remount_replaces_a_stuck_editor() {
        let slot: EditorSlot = Rc::new(RefCell::new(None));
        let container = container();
        let options = options();
        let host = JsHost::default();
        remount(&slot, &container, &options, &host);
        let stuck = slot.borrow().clone().unwrap();

        // Remount while the old controller is still borrowed, as after a
        // panic inside an editor call.
        let state = stuck.update(|_| {
            remount(&slot, &container, &options, &host);
            let fresh = slot.borrow().clone().unwrap();
            fresh.read(|c| c.session().load_state().as_str().to_string())
        });
        assert_eq!(state.flatten().as_deref(), Some("injecting"));
    }
}
