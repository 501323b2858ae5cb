//! In-memory sandbox, host and timer fakes for unit tests.
//!
//! `FakeSandbox` models the body as a markup string and the selection as a
//! byte range into it. Replacing the document bumps a generation counter so
//! ranges captured before the replacement fail to restore, like detached DOM
//! ranges do.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::controller::EditorHost;
use crate::load::{Readiness, ReadinessProbe, Timer};
use crate::platform::{
    AnchorInfo, DisplayFlow, FormatPlatform, ImagePlatform, LinkPlatform, NativeSelection,
    PlatformError, SelectionPlatform, SerializePlatform,
};
use crate::serialize::DoctypeInfo;
use crate::types::{ImageHandle, ImageId, Rect, SelectionChanged};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRange {
    generation: u64,
    start: usize,
    end: usize,
}

#[derive(Debug)]
struct FakeDoc {
    generation: u64,
    doctype: Option<DoctypeInfo>,
    body: String,
    selection: Option<(usize, usize)>,
    rect: Rect,
    commands: Vec<(String, Option<String>)>,
    fail_commands: bool,
    torn_down: bool,
}

/// Shared handle to an in-memory document. Clones see the same document.
#[derive(Debug, Clone)]
pub struct FakeSandbox(Rc<RefCell<FakeDoc>>);

impl FakeSandbox {
    pub fn new(body: &str) -> Self {
        Self::with_doctype(Some(DoctypeInfo::html5()), body)
    }

    pub fn with_doctype(doctype: Option<DoctypeInfo>, body: &str) -> Self {
        Self(Rc::new(RefCell::new(FakeDoc {
            generation: 0,
            doctype,
            body: body.to_string(),
            selection: None,
            rect: Rect::new(100.0, 200.0, 50.0, 20.0),
            commands: Vec::new(),
            fail_commands: false,
            torn_down: false,
        })))
    }

    pub fn body(&self) -> String {
        self.0.borrow().body.clone()
    }

    pub fn commands(&self) -> Vec<(String, Option<String>)> {
        self.0.borrow().commands.clone()
    }

    /// Select the first occurrence of `needle` in text content.
    pub fn select_text(&self, needle: &str) {
        let mut doc = self.0.borrow_mut();
        let start = find_in_text(&doc.body, needle)
            .unwrap_or_else(|| panic!("{:?} not in {:?}", needle, doc.body));
        doc.selection = Some((start, start + needle.len()));
    }

    pub fn collapse(&self) {
        let mut doc = self.0.borrow_mut();
        doc.selection = doc.selection.map(|(start, _)| (start, start));
    }

    pub fn collapse_to_end(&self) {
        let mut doc = self.0.borrow_mut();
        doc.selection = doc.selection.map(|(_, end)| (end, end));
    }

    pub fn clear_selection(&self) {
        self.0.borrow_mut().selection = None;
    }

    pub fn selected_text(&self) -> Option<String> {
        let doc = self.0.borrow();
        doc.selection.map(|(s, e)| doc.body[s..e].to_string())
    }

    pub fn set_selection_rect(&self, rect: Rect) {
        self.0.borrow_mut().rect = rect;
    }

    /// Replace the document; earlier ranges stop restoring.
    pub fn replace_document(&self, body: &str) {
        let mut doc = self.0.borrow_mut();
        doc.generation += 1;
        doc.body = body.to_string();
        doc.selection = None;
    }

    pub fn append_body(&self, markup: &str) {
        self.0.borrow_mut().body.push_str(markup);
    }

    pub fn fail_commands(&self, fail: bool) {
        self.0.borrow_mut().fail_commands = fail;
    }

    /// Make the document unreachable, as if the frame was removed.
    pub fn tear_down(&self) {
        self.0.borrow_mut().torn_down = true;
    }

    /// Source of the image bound with `id`.
    pub fn image_src(&self, id: ImageId) -> Option<String> {
        let doc = self.0.borrow();
        let (start, end) = bound_image_tag(&doc.body, id)?;
        attr_value(&doc.body[start..end], "src").map(str::to_string)
    }
}

fn find_in_text(body: &str, needle: &str) -> Option<usize> {
    body.match_indices(needle)
        .map(|(i, _)| i)
        .find(|&i| !inside_tag(body, i))
}

fn inside_tag(body: &str, index: usize) -> bool {
    let before = &body[..index];
    match (before.rfind('<'), before.rfind('>')) {
        (Some(lt), Some(gt)) => lt > gt,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Byte spans of every `<img ...>` tag.
fn image_tags(body: &str) -> Vec<(usize, usize)> {
    let mut tags = Vec::new();
    let mut from = 0;
    while let Some(offset) = body[from..].find("<img") {
        let start = from + offset;
        let Some(close) = body[start..].find('>') else {
            break;
        };
        let end = start + close + 1;
        tags.push((start, end));
        from = end;
    }
    tags
}

fn bound_image_tag(body: &str, id: ImageId) -> Option<(usize, usize)> {
    let marker = format!("data-folio-image=\"{}\"", id.0);
    image_tags(body)
        .into_iter()
        .find(|&(s, e)| body[s..e].contains(&marker))
}

fn attr_value<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let key = format!("{}=\"", name);
    let start = tag.find(&key)? + key.len();
    let len = tag[start..].find('"')?;
    Some(&tag[start..start + len])
}

impl FakeDoc {
    fn wrap_selection(&mut self, open: &str, close: &str) {
        let Some((s, e)) = self.selection else {
            return;
        };
        self.body.insert_str(e, close);
        self.body.insert_str(s, open);
        self.selection = Some((s + open.len(), e + open.len()));
    }

    fn unlink(&mut self) {
        let Some((s, e)) = self.selection else {
            return;
        };
        let Some(open_start) = self.body[..s].rfind("<a ") else {
            return;
        };
        let Some(open_len) = self.body[open_start..].find('>').map(|i| i + 1) else {
            return;
        };
        let Some(close) = self.body[e..].find("</a>").map(|i| e + i) else {
            return;
        };
        self.body.replace_range(close..close + 4, "");
        self.body.replace_range(open_start..open_start + open_len, "");
        self.selection = Some((s - open_len, e - open_len));
    }
}

impl SelectionPlatform for FakeSandbox {
    type Range = FakeRange;

    fn get_selection(&self) -> Option<NativeSelection<FakeRange>> {
        let doc = self.0.borrow();
        let (start, end) = doc.selection?;
        Some(NativeSelection {
            range: FakeRange {
                generation: doc.generation,
                start,
                end,
            },
            text: doc.body[start..end].to_string(),
            rect: doc.rect,
            collapsed: start == end,
        })
    }

    fn restore_selection(&self, range: &FakeRange) -> Result<(), PlatformError> {
        let mut doc = self.0.borrow_mut();
        if range.generation != doc.generation || range.end > doc.body.len() {
            return Err("range detached".into());
        }
        doc.selection = Some((range.start, range.end));
        Ok(())
    }
}

impl FormatPlatform for FakeSandbox {
    fn apply_format_command(
        &self,
        command: &str,
        value: Option<&str>,
    ) -> Result<bool, PlatformError> {
        let mut doc = self.0.borrow_mut();
        if doc.fail_commands {
            return Err(format!("{} rejected", command).into());
        }
        doc.commands
            .push((command.to_string(), value.map(str::to_string)));
        match command {
            "bold" => doc.wrap_selection("<b>", "</b>"),
            "italic" => doc.wrap_selection("<i>", "</i>"),
            "underline" => doc.wrap_selection("<u>", "</u>"),
            "createLink" => {
                let open = format!("<a href=\"{}\">", value.unwrap_or_default());
                doc.wrap_selection(&open, "</a>");
            }
            "unlink" => doc.unlink(),
            _ => {}
        }
        Ok(true)
    }
}

impl LinkPlatform for FakeSandbox {
    fn enclosing_anchor(&self) -> Option<AnchorInfo> {
        let doc = self.0.borrow();
        let (start, _) = doc.selection?;
        let before = &doc.body[..start];
        let open = before.rfind("<a ")?;
        if before[open..].contains("</a>") {
            return None;
        }
        let tag_end = open + doc.body[open..].find('>')? + 1;
        let href = attr_value(&doc.body[open..tag_end], "href")?.to_string();
        let close = tag_end + doc.body[tag_end..].find("</a>")?;
        Some(AnchorInfo {
            href,
            text: doc.body[tag_end..close].to_string(),
        })
    }

    fn insert_text_and_select(&self, text: &str) -> Result<(), PlatformError> {
        let mut doc = self.0.borrow_mut();
        let (at, _) = doc.selection.ok_or("no selection")?;
        doc.body.insert_str(at, text);
        doc.selection = Some((at, at + text.len()));
        Ok(())
    }
}

impl ImagePlatform for FakeSandbox {
    /// Index of the image in document order.
    type Image = usize;

    fn images(&self) -> Vec<usize> {
        (0..image_tags(&self.0.borrow().body).len()).collect()
    }

    fn is_bound(&self, image: &usize) -> bool {
        let doc = self.0.borrow();
        image_tags(&doc.body)
            .get(*image)
            .is_some_and(|&(s, e)| doc.body[s..e].contains("data-folio-image"))
    }

    fn display_flow(&self, image: &usize) -> DisplayFlow {
        let doc = self.0.borrow();
        match image_tags(&doc.body).get(*image) {
            Some(&(s, e)) if doc.body[s..e].contains("display:block") => DisplayFlow::Block,
            _ => DisplayFlow::Inline,
        }
    }

    fn bind_image(&self, image: &usize, id: ImageId, flow: DisplayFlow) -> Result<(), PlatformError> {
        let mut doc = self.0.borrow_mut();
        let &(start, end) = image_tags(&doc.body).get(*image).ok_or("image gone")?;
        let tag = match flow {
            DisplayFlow::Block => "div",
            DisplayFlow::Inline => "span",
        };
        let marked = doc.body[start..end].replacen(
            "<img",
            &format!("<img data-folio-image=\"{}\" contenteditable=\"false\"", id.0),
            1,
        );
        let wrapped = format!(
            "<{tag} class=\"folio-image-wrapper\" contenteditable=\"false\">{marked}<span class=\"folio-image-icon\"></span></{tag}>"
        );
        doc.body.replace_range(start..end, &wrapped);
        Ok(())
    }

    fn set_image_source(&self, id: ImageId, url: &str) -> Result<(), PlatformError> {
        let mut doc = self.0.borrow_mut();
        let (start, end) = bound_image_tag(&doc.body, id).ok_or("image not bound")?;
        let tag = &doc.body[start..end];
        let current = attr_value(tag, "src").ok_or("image has no src")?;
        let updated = tag.replacen(
            &format!("src=\"{}\"", current),
            &format!("src=\"{}\"", url),
            1,
        );
        doc.body.replace_range(start..end, &updated);
        Ok(())
    }
}

impl SerializePlatform for FakeSandbox {
    fn doctype(&self) -> Result<Option<DoctypeInfo>, PlatformError> {
        let doc = self.0.borrow();
        if doc.torn_down {
            return Err("document unavailable".into());
        }
        Ok(doc.doctype.clone())
    }

    fn root_outer_html(&self) -> Result<String, PlatformError> {
        let doc = self.0.borrow();
        if doc.torn_down {
            return Err("document unavailable".into());
        }
        Ok(format!("<html><head></head><body>{}</body></html>", doc.body))
    }
}

/// Everything a [`RecordingHost`] saw.
#[derive(Debug, Default)]
pub struct HostLog {
    pub changes: Vec<String>,
    pub saves: Vec<String>,
    pub downloads: Vec<(String, String)>,
    pub selections: Vec<SelectionChanged>,
    pub image_requests: Vec<Option<ImageHandle>>,
    pub status: Option<String>,
    pub error: Option<String>,
    pub fail_save: bool,
    pub fail_download: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingHost(pub Rc<RefCell<HostLog>>);

impl RecordingHost {
    pub fn log(&self) -> std::cell::Ref<'_, HostLog> {
        self.0.borrow()
    }
}

impl EditorHost for RecordingHost {
    fn on_change(&self, html: &str) {
        self.0.borrow_mut().changes.push(html.to_string());
    }

    fn on_save(&self, html: &str) -> Result<(), PlatformError> {
        let mut log = self.0.borrow_mut();
        log.saves.push(html.to_string());
        if log.fail_save {
            return Err("host storage full".into());
        }
        Ok(())
    }

    fn download(&self, file_name: &str, html: &str) -> Result<(), PlatformError> {
        let mut log = self.0.borrow_mut();
        if log.fail_download {
            return Err("blob rejected".into());
        }
        log.downloads.push((file_name.to_string(), html.to_string()));
        Ok(())
    }

    fn on_selection_changed(&self, change: SelectionChanged) {
        self.0.borrow_mut().selections.push(change);
    }

    fn on_image_request(&self, request: Option<ImageHandle>) {
        self.0.borrow_mut().image_requests.push(request);
    }

    fn on_messages(&self, status: Option<&str>, error: Option<&str>) {
        let mut log = self.0.borrow_mut();
        log.status = status.map(str::to_string);
        log.error = error.map(str::to_string);
    }
}

/// Reports the scripted states in order, then `Complete` forever.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    states: RefCell<VecDeque<Readiness>>,
}

impl ScriptedProbe {
    pub fn new(states: impl IntoIterator<Item = Readiness>) -> Self {
        Self {
            states: RefCell::new(states.into_iter().collect()),
        }
    }
}

impl ReadinessProbe for ScriptedProbe {
    fn readiness(&self) -> Readiness {
        self.states
            .borrow_mut()
            .pop_front()
            .unwrap_or(Readiness::Complete)
    }
}

type SleepHook = Box<dyn FnMut(usize)>;

/// Resolves every sleep immediately, recording the requested durations.
#[derive(Default)]
pub struct InstantTimer {
    sleeps: RefCell<Vec<Duration>>,
    hook: RefCell<Option<SleepHook>>,
    count: Cell<usize>,
}

impl InstantTimer {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    /// Run `hook` with the 1-based sleep count on every sleep.
    pub fn on_sleep(&self, hook: impl FnMut(usize) + 'static) {
        *self.hook.borrow_mut() = Some(Box::new(hook));
    }
}

impl Timer for InstantTimer {
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> {
        self.sleeps.borrow_mut().push(duration);
        let n = self.count.get() + 1;
        self.count.set(n);
        if let Some(hook) = self.hook.borrow_mut().as_mut() {
            hook(n);
        }
        std::future::ready(())
    }
}
