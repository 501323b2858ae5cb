//! `BrowserEditor`: an [`EditorController`] bound to a container element.
//!
//! The controller is synchronous; this type runs the async half of each load
//! (frame creation, injection, readiness polling, focus delay) on the
//! browser event loop and routes sandbox events back into the controller.
//!
//! All controller access goes through `try_borrow_mut`. `execCommand` fires
//! `input` synchronously while a command holds the controller, and host
//! callbacks may call back into the editor; those nested calls are dropped
//! instead of panicking.

use std::cell::RefCell;
use std::rc::Rc;

use folio_core::{
    CommandOutcome, EditorController, EditorError, EditorHost, FormatCommand, LinkContext,
    LinkOutcome, LoadToken, SandboxId, Timer, wait_until_ready,
};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, File};
use web_time::Instant;

use crate::file::read_html_file;
use crate::frame::{FrameProbe, FrameSlot, create_frame, ensure_positioned, write_document};
use crate::sandbox::{BrowserSandbox, EventSink, SandboxEvent};
use crate::timer::{GlooTimer, MessageTimer};

type Controller<H> = EditorController<BrowserSandbox, H>;

pub struct BrowserEditor<H: EditorHost + 'static> {
    inner: Rc<Inner<H>>,
}

impl<H: EditorHost + 'static> Clone for BrowserEditor<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<H: EditorHost + 'static> {
    controller: RefCell<Controller<H>>,
    frames: RefCell<FrameSlot>,
    container: Element,
    messages: RefCell<MessageTimer>,
}

impl<H: EditorHost + 'static> BrowserEditor<H> {
    /// Frames are created inside `container`. A statically positioned
    /// container is made `position: relative` so the hidden loading frame
    /// can overlay the visible one.
    pub fn new(container: Element, controller: Controller<H>) -> Self {
        ensure_positioned(&container);
        Self {
            inner: Rc::new(Inner {
                controller: RefCell::new(controller),
                frames: RefCell::new(FrameSlot::new()),
                container,
                messages: RefCell::new(MessageTimer::new()),
            }),
        }
    }

    /// Load the initial document.
    pub fn mount(&self) {
        let initial = self.read(|c| c.session().initial_html().to_string());
        if let Some(html) = initial {
            self.load(html);
        }
    }

    /// Load `html` into a fresh sandbox, superseding any in-flight load.
    pub fn load(&self, html: impl Into<String>) {
        let html = html.into();
        if let Some(token) = self.update(|c| c.begin_load(html)).flatten() {
            Inner::start_load(&self.inner, token);
        }
    }

    /// Read a user-selected file and load it.
    pub fn load_file(&self, file: File) {
        let Some(read) = self.update(|c| c.begin_file_load()) else {
            return;
        };
        let weak = Rc::downgrade(&self.inner);
        spawn_local(async move {
            let result = read_html_file(&file).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let name = file.name();
            if let Some(token) = inner
                .update(|c| c.finish_file_load(read, &name, result))
                .flatten()
            {
                Inner::start_load(&inner, token);
            }
        });
    }

    /// Reload the initial document, if the user confirmed.
    pub fn reset(&self, confirmed: bool) {
        if let Some(token) = self.update(|c| c.reset(confirmed)).flatten() {
            Inner::start_load(&self.inner, token);
        }
    }

    pub fn save(&self) -> bool {
        self.update(|c| c.save()).unwrap_or(false)
    }

    pub fn get_html(&self) -> String {
        self.update(|c| c.get_html()).unwrap_or_default()
    }

    pub fn execute(&self, command: &FormatCommand) -> CommandOutcome {
        self.update(|c| c.execute(command))
            .unwrap_or(CommandOutcome::Aborted)
    }

    pub fn open_link_editor(&self) -> Option<LinkContext> {
        self.update(|c| c.open_link_editor()).flatten()
    }

    pub fn save_link(&self, url: &str, text: &str) -> LinkOutcome {
        self.update(|c| c.save_link(url, text))
            .unwrap_or(LinkOutcome::Skipped)
    }

    pub fn remove_link(&self) -> LinkOutcome {
        self.update(|c| c.remove_link()).unwrap_or(LinkOutcome::Skipped)
    }

    /// Apply the picked asset to the image awaiting replacement.
    pub fn select_image(&self, url: &str) -> bool {
        self.update(|c| c.select_replacement_image(url))
            .unwrap_or(false)
    }

    pub fn cancel_image_picker(&self) {
        self.update(|c| c.cancel_image_picker());
    }

    pub fn set_show_toolbar(&self, show: bool) {
        self.update(|c| c.set_show_toolbar(show));
    }

    /// Read-only access to the controller. `None` while it is in use.
    pub fn read<R>(&self, f: impl FnOnce(&Controller<H>) -> R) -> Option<R> {
        match self.inner.controller.try_borrow() {
            Ok(controller) => Some(f(&controller)),
            Err(_) => {
                tracing::warn!("editor busy, read dropped");
                None
            }
        }
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut Controller<H>) -> R) -> Option<R> {
        self.inner.update(f)
    }

    /// Detach from the page: stop loads, listeners and timers, remove frames.
    ///
    /// Safe to call while a controller call is stuck mid-flight.
    pub fn unmount(&self) {
        if let Ok(mut messages) = self.inner.messages.try_borrow_mut() {
            messages.cancel();
        }
        match self.inner.controller.try_borrow_mut() {
            Ok(mut controller) => controller.teardown(),
            Err(_) => defer_teardown(&self.inner),
        }
        if let Ok(mut frames) = self.inner.frames.try_borrow_mut() {
            frames.clear();
        }
        tracing::debug!("editor unmounted");
    }
}

/// Unmount from inside a host callback. Teardown runs once the call returns.
fn defer_teardown<H: EditorHost + 'static>(inner: &Rc<Inner<H>>) {
    tracing::warn!("unmount during controller call, deferring teardown");
    let weak = Rc::downgrade(inner);
    spawn_local(async move {
        if let Some(inner) = weak.upgrade() {
            if let Ok(mut controller) = inner.controller.try_borrow_mut() {
                controller.teardown();
            }
        }
    });
}

impl<H: EditorHost + 'static> Inner<H> {
    fn update<R>(self: &Rc<Self>, f: impl FnOnce(&mut Controller<H>) -> R) -> Option<R> {
        let result = match self.controller.try_borrow_mut() {
            Ok(mut controller) => f(&mut controller),
            Err(_) => {
                tracing::warn!("editor busy, call dropped");
                return None;
            }
        };
        self.sync_message_timer();
        Some(result)
    }

    fn start_load(self: &Rc<Self>, token: LoadToken) {
        let inner = self.clone();
        spawn_local(async move { inner.run_load(token).await });
    }

    async fn run_load(self: Rc<Self>, token: LoadToken) {
        let id = token.id();
        if !token.is_current() {
            return;
        }
        let Some(html) = self.update(|c| c.session().raw_source_html().to_string()) else {
            return;
        };

        let frame = match create_frame(&self.container, id) {
            Ok(frame) => frame,
            Err(e) => {
                self.update(|c| c.fail_load(&token, EditorError::sandbox_access(e)));
                return;
            }
        };
        self.frames.borrow_mut().set_pending(id, frame.clone());

        if let Err(e) = write_document(&frame, &html) {
            self.abandon(id);
            self.update(|c| c.fail_load(&token, EditorError::load(e)));
            return;
        }
        if self.update(|c| c.mark_injected(&token)) != Some(true) {
            self.abandon(id);
            return;
        }

        let config = match self.update(|c| c.config().clone()) {
            Some(config) => config,
            None => return,
        };
        if wait_until_ready(&FrameProbe(&frame), &GlooTimer, &token, &config)
            .await
            .is_err()
        {
            self.abandon(id);
            return;
        }

        let sandbox = BrowserSandbox::new(id, frame, self.event_sink());
        let with_images = self.update(|c| !c.assets().is_empty()).unwrap_or(false);
        let setup = sandbox
            .enable_editing(with_images)
            .and_then(|()| sandbox.install_listeners());
        if let Err(e) = setup {
            self.abandon(id);
            self.update(|c| c.fail_load(&token, EditorError::sandbox_access(e)));
            return;
        }

        if let Err(e) = self.frames.borrow_mut().promote(id) {
            tracing::error!(target: "folio::load", sandbox = %id, error = %e, "frame swap failed");
            self.update(|c| c.fail_load(&token, EditorError::sandbox_access(e)));
            return;
        }
        if self.update(|c| c.on_ready(&token, sandbox)) != Some(true) {
            return;
        }

        GlooTimer.sleep(config.focus_delay()).await;
        if token.is_current() {
            if let Ok(controller) = self.controller.try_borrow() {
                if let Some(sandbox) = controller.sandbox() {
                    sandbox.focus();
                }
            }
        }
    }

    /// Drop the pending frame of a load that will not complete.
    fn abandon(&self, id: SandboxId) {
        self.frames.borrow_mut().discard(id);
    }

    fn event_sink(self: &Rc<Self>) -> EventSink {
        let weak = Rc::downgrade(self);
        Rc::new(move |sandbox: SandboxId, event: SandboxEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_event(sandbox, event);
            }
        })
    }

    fn handle_event(self: &Rc<Self>, sandbox: SandboxId, event: SandboxEvent) {
        let Ok(mut controller) = self.controller.try_borrow_mut() else {
            tracing::trace!(target: "folio::selection", ?event, "event during controller call skipped");
            return;
        };
        match event {
            SandboxEvent::SelectionChanged => {
                let frame = controller
                    .sandbox()
                    .filter(|s| s.id() == sandbox)
                    .map(|s| s.frame_rect());
                if let Some(frame) = frame {
                    controller.on_selection_change(sandbox, &frame, viewport_width());
                }
            }
            SandboxEvent::Scrolled => controller.on_scroll(sandbox),
            SandboxEvent::Edited => {
                if controller.session().ready_sandbox() == Some(sandbox) {
                    // Pasted content may bring new images.
                    controller.rebind_images();
                    controller.notify_change();
                }
            }
            SandboxEvent::ImageClicked(image) => {
                controller.request_image_replace(sandbox, image);
            }
        }
        drop(controller);
        self.sync_message_timer();
    }

    /// Reschedule the expiry callback if messages changed.
    fn sync_message_timer(self: &Rc<Self>) {
        let next = match self.controller.try_borrow_mut() {
            Ok(mut controller) => {
                if !controller.take_messages_dirty() {
                    return;
                }
                controller.session().next_expiry()
            }
            Err(_) => return,
        };
        self.schedule_expiry(next);
    }

    fn schedule_expiry(self: &Rc<Self>, next: Option<Instant>) {
        let mut timer = self.messages.borrow_mut();
        let Some(at) = next else {
            timer.cancel();
            return;
        };
        let weak = Rc::downgrade(self);
        timer.schedule(at.saturating_duration_since(Instant::now()), move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let next = match inner.controller.try_borrow_mut() {
                Ok(mut controller) => {
                    controller.expire_messages(Instant::now());
                    controller.take_messages_dirty();
                    controller.session().next_expiry()
                }
                // Busy: try again shortly.
                Err(_) => Some(Instant::now()),
            };
            inner.schedule_expiry(next);
        });
    }
}

fn viewport_width() -> f64 {
    web_sys::window()
        .and_then(|w| w.inner_width().ok())
        .and_then(|v| v.as_f64())
        .unwrap_or(f64::INFINITY)
}
