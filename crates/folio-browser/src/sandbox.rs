//! Browser implementation of the sandbox platform traits.
//!
//! `BrowserSandbox` wraps one loaded iframe. It owns the event listeners it
//! installs, so dropping it detaches the editor from that document.

use std::cell::RefCell;
use std::rc::Rc;

use folio_core::{
    AnchorInfo, DisplayFlow, DoctypeInfo, FormatPlatform, ImageId, ImagePlatform, LinkPlatform,
    NativeSelection, PlatformError, Rect, SandboxId, SelectionPlatform, SerializePlatform,
};
use gloo_events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlIFrameElement, Window};

use crate::frame::html_document;
use crate::js_error;
use crate::style::{
    EDITABLE_MARKER, ICON_CLASS, ICON_SVG, IMAGE_MARKER, STYLE_MARKER, WRAPPER_CLASS,
    inject_styles, mark_editable,
};

/// Something happened inside a sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxEvent {
    /// `selectionchange` or `mouseup`.
    SelectionChanged,
    /// Scroll anywhere in the document, including nested containers.
    Scrolled,
    /// `input` or `paste` on the editable body.
    Edited,
    ImageClicked(ImageId),
}

pub type EventSink = Rc<dyn Fn(SandboxId, SandboxEvent)>;

pub struct BrowserSandbox {
    id: SandboxId,
    frame: HtmlIFrameElement,
    sink: EventSink,
    listeners: RefCell<Vec<EventListener>>,
    /// Images this sandbox bound. Pasted copies carry the marker attribute
    /// but are different nodes.
    bound: RefCell<Vec<(ImageId, Element)>>,
}

impl BrowserSandbox {
    pub fn new(id: SandboxId, frame: HtmlIFrameElement, sink: EventSink) -> Self {
        Self {
            id,
            frame,
            sink,
            listeners: RefCell::new(Vec::new()),
            bound: RefCell::new(Vec::new()),
        }
    }

    pub fn id(&self) -> SandboxId {
        self.id
    }

    pub fn frame(&self) -> &HtmlIFrameElement {
        &self.frame
    }

    pub fn document(&self) -> Result<Document, PlatformError> {
        self.frame
            .content_document()
            .ok_or_else(|| PlatformError::from("cannot access iframe document"))
    }

    pub fn window(&self) -> Result<Window, PlatformError> {
        self.frame
            .content_window()
            .ok_or_else(|| PlatformError::from("iframe window not available"))
    }

    pub fn body(&self) -> Result<HtmlElement, PlatformError> {
        self.document()?
            .body()
            .ok_or_else(|| PlatformError::from("iframe body not available"))
    }

    /// Frame rect relative to the host viewport.
    pub fn frame_rect(&self) -> Rect {
        dom_rect(&self.frame.get_bounding_client_rect())
    }

    /// Make the body editable and inject the editor stylesheet.
    pub fn enable_editing(&self, with_images: bool) -> Result<(), PlatformError> {
        let document = self.document()?;
        let body = self.body()?;
        mark_editable(&body, "true")?;
        inject_styles(&document, with_images)
    }

    /// Wire selection, scroll and change events to the sink.
    pub fn install_listeners(&self) -> Result<(), PlatformError> {
        let document = self.document()?;
        let body = self.body()?;
        let mut listeners = self.listeners.borrow_mut();

        for event in ["selectionchange", "mouseup"] {
            listeners.push(self.listen(&document, event, SandboxEvent::SelectionChanged));
        }
        let sink = self.sink.clone();
        let id = self.id;
        listeners.push(EventListener::new_with_options(
            &document,
            "scroll",
            EventListenerOptions::run_in_capture_phase(),
            move |_| sink(id, SandboxEvent::Scrolled),
        ));
        for event in ["input", "paste"] {
            listeners.push(self.listen(&body, event, SandboxEvent::Edited));
        }
        tracing::debug!(sandbox = %self.id, count = listeners.len(), "sandbox listeners installed");
        Ok(())
    }

    fn listen(
        &self,
        target: &web_sys::EventTarget,
        event: &'static str,
        kind: SandboxEvent,
    ) -> EventListener {
        let sink = self.sink.clone();
        let id = self.id;
        EventListener::new(target, event, move |_| sink(id, kind))
    }

    pub fn focus(&self) {
        match self.body() {
            Ok(body) => {
                if let Err(e) = body.focus() {
                    tracing::debug!("focus failed: {:?}", e);
                }
            }
            Err(e) => tracing::debug!(error = %e, "focus skipped"),
        }
    }

    fn selection(&self) -> Option<web_sys::Selection> {
        self.document().ok()?.get_selection().ok().flatten()
    }
}

fn dom_rect(rect: &web_sys::DomRect) -> Rect {
    Rect::new(rect.top(), rect.left(), rect.width(), rect.height())
}

impl SelectionPlatform for BrowserSandbox {
    type Range = web_sys::Range;

    fn get_selection(&self) -> Option<NativeSelection<web_sys::Range>> {
        let selection = self.selection()?;
        if selection.range_count() == 0 {
            return None;
        }
        let range = selection.get_range_at(0).ok()?.clone_range();
        Some(NativeSelection {
            text: String::from(range.to_string()),
            rect: dom_rect(&range.get_bounding_client_rect()),
            collapsed: range.collapsed(),
            range,
        })
    }

    fn restore_selection(&self, range: &web_sys::Range) -> Result<(), PlatformError> {
        let document = self.document()?;
        let document_node: &web_sys::Node = &document;
        let container = range
            .start_container()
            .map_err(|e| js_error("range container", e))?;
        let same_document = container
            .owner_document()
            .is_some_and(|owner| owner.is_same_node(Some(document_node)));
        if !container.is_connected() || !same_document {
            return Err("range detached from sandbox document".into());
        }

        let selection = self
            .selection()
            .ok_or_else(|| PlatformError::from("no selection object"))?;
        selection
            .remove_all_ranges()
            .map_err(|e| js_error("clear selection", e))?;
        selection
            .add_range(range)
            .map_err(|e| js_error("add range", e))
    }
}

impl FormatPlatform for BrowserSandbox {
    fn apply_format_command(
        &self,
        command: &str,
        value: Option<&str>,
    ) -> Result<bool, PlatformError> {
        let document = html_document(&self.frame)?;
        let result = match value {
            Some(value) => document.exec_command_with_show_ui_and_value(command, false, value),
            None => document.exec_command(command),
        };
        result.map_err(|e| js_error(command, e))
    }
}

impl LinkPlatform for BrowserSandbox {
    fn enclosing_anchor(&self) -> Option<AnchorInfo> {
        let node = self.selection()?.anchor_node()?;
        let element = match node.dyn_ref::<Element>() {
            Some(element) => element.clone(),
            None => node.parent_element()?,
        };
        let anchor = element.closest("a").ok()??;
        Some(AnchorInfo {
            href: anchor.get_attribute("href").unwrap_or_default(),
            text: anchor.text_content().unwrap_or_default(),
        })
    }

    fn insert_text_and_select(&self, text: &str) -> Result<(), PlatformError> {
        let document = self.document()?;
        let selection = self
            .selection()
            .ok_or_else(|| PlatformError::from("no selection object"))?;
        let range = selection
            .get_range_at(0)
            .map_err(|e| js_error("selection range", e))?;
        let node = document.create_text_node(text);
        range
            .insert_node(&node)
            .map_err(|e| js_error("insert text", e))?;

        let inserted = document
            .create_range()
            .map_err(|e| js_error("create range", e))?;
        inserted
            .select_node_contents(&node)
            .map_err(|e| js_error("select text", e))?;
        selection
            .remove_all_ranges()
            .map_err(|e| js_error("clear selection", e))?;
        selection
            .add_range(&inserted)
            .map_err(|e| js_error("add range", e))
    }
}

impl ImagePlatform for BrowserSandbox {
    type Image = Element;

    fn images(&self) -> Vec<Element> {
        let Ok(list) = self
            .document()
            .and_then(|d| d.query_selector_all("img").map_err(|e| js_error("query images", e)))
        else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn is_bound(&self, image: &Element) -> bool {
        let image_node: &web_sys::Node = image;
        self.bound
            .borrow()
            .iter()
            .any(|(_, bound)| bound.is_same_node(Some(image_node)))
    }

    fn display_flow(&self, image: &Element) -> DisplayFlow {
        let display = self
            .window()
            .ok()
            .and_then(|w| w.get_computed_style(image).ok().flatten())
            .and_then(|style| style.get_property_value("display").ok())
            .unwrap_or_default();
        match display.as_str() {
            "block" | "flex" | "grid" | "table" | "list-item" => DisplayFlow::Block,
            _ => DisplayFlow::Inline,
        }
    }

    fn bind_image(&self, image: &Element, id: ImageId, flow: DisplayFlow) -> Result<(), PlatformError> {
        let document = self.document()?;
        let (tag, display) = match flow {
            DisplayFlow::Block => ("div", "block"),
            DisplayFlow::Inline => ("span", "inline-block"),
        };

        image
            .set_attribute(IMAGE_MARKER, &id.0.to_string())
            .map_err(|e| js_error("mark image", e))?;
        mark_editable(image, "false")?;

        let wrapper = document
            .create_element(tag)
            .map_err(|e| js_error("create wrapper", e))?;
        wrapper.set_class_name(WRAPPER_CLASS);
        wrapper
            .set_attribute("style", &format!("position:relative;display:{};", display))
            .map_err(|e| js_error("style wrapper", e))?;
        wrapper
            .set_attribute("contenteditable", "false")
            .map_err(|e| js_error("wrapper contenteditable", e))?;

        let icon = document
            .create_element("span")
            .map_err(|e| js_error("create icon", e))?;
        icon.set_class_name(ICON_CLASS);
        icon.set_inner_html(ICON_SVG);
        icon.set_attribute("contenteditable", "false")
            .map_err(|e| js_error("icon contenteditable", e))?;

        // A pasted copy of a bound image arrives inside a dead wrapper.
        if let Some(stale) = image
            .parent_element()
            .filter(|p| p.class_list().contains(WRAPPER_CLASS))
        {
            stale
                .replace_with_with_node_1(image)
                .map_err(|e| js_error("unwrap copied image", e))?;
        }

        let parent = image
            .parent_node()
            .ok_or_else(|| PlatformError::from("image has no parent"))?;
        let image_node: &web_sys::Node = image;
        parent
            .insert_before(&wrapper, Some(image_node))
            .map_err(|e| js_error("insert wrapper", e))?;
        wrapper
            .append_child(image)
            .map_err(|e| js_error("wrap image", e))?;
        wrapper
            .append_child(&icon)
            .map_err(|e| js_error("append icon", e))?;

        let mut listeners = self.listeners.borrow_mut();
        for target in [&wrapper, &icon] {
            let sink = self.sink.clone();
            let sandbox = self.id;
            listeners.push(EventListener::new_with_options(
                target,
                "click",
                EventListenerOptions::enable_prevent_default(),
                move |event| {
                    event.prevent_default();
                    event.stop_propagation();
                    sink(sandbox, SandboxEvent::ImageClicked(id));
                },
            ));
        }
        self.bound.borrow_mut().push((id, image.clone()));
        Ok(())
    }

    fn set_image_source(&self, id: ImageId, url: &str) -> Result<(), PlatformError> {
        let image = self
            .bound
            .borrow()
            .iter()
            .find(|(bound_id, image)| *bound_id == id && image.is_connected())
            .map(|(_, image)| image.clone())
            .ok_or_else(|| PlatformError::from(format!("image {} is gone", id.0)))?;
        image
            .set_attribute("src", url)
            .map_err(|e| js_error("set src", e))
    }
}

impl SerializePlatform for BrowserSandbox {
    fn doctype(&self) -> Result<Option<DoctypeInfo>, PlatformError> {
        Ok(self.document()?.doctype().map(|dt| DoctypeInfo {
            name: dt.name(),
            public_id: dt.public_id(),
            system_id: dt.system_id(),
        }))
    }

    fn root_outer_html(&self) -> Result<String, PlatformError> {
        let root = self
            .document()?
            .document_element()
            .ok_or_else(|| PlatformError::from("document has no root element"))?;
        let clean: Element = root
            .clone_node_with_deep(true)
            .map_err(|e| js_error("clone document", e))?
            .dyn_into()
            .map_err(|_| PlatformError::from("cloned root is not an element"))?;
        strip_editor_artifacts(&clean)?;
        Ok(clean.outer_html())
    }
}

/// Remove everything the editor added: stylesheet, image wrappers, markers.
pub fn strip_editor_artifacts(root: &Element) -> Result<(), PlatformError> {
    for style in query_all(root, &format!("[{}]", STYLE_MARKER))? {
        style.remove();
    }

    for wrapper in query_all(root, &format!(".{}", WRAPPER_CLASS))? {
        match wrapper.query_selector("img").ok().flatten() {
            Some(image) => wrapper
                .replace_with_with_node_1(&image)
                .map_err(|e| js_error("unwrap image", e))?,
            None => wrapper.remove(),
        }
    }

    for image in query_all(root, &format!("[{}]", IMAGE_MARKER))? {
        let _ = image.remove_attribute(IMAGE_MARKER);
    }

    let mut edited = query_all(root, &format!("[{}]", EDITABLE_MARKER))?;
    if root.has_attribute(EDITABLE_MARKER) {
        edited.push(root.clone());
    }
    for element in edited {
        let _ = element.remove_attribute("contenteditable");
        let _ = element.remove_attribute(EDITABLE_MARKER);
    }
    Ok(())
}

fn query_all(root: &Element, selector: &str) -> Result<Vec<Element>, PlatformError> {
    let list = root
        .query_selector_all(selector)
        .map_err(|e| js_error("query", e))?;
    Ok((0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}
