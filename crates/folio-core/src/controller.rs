//! The session controller.
//!
//! `EditorController` owns the [`EditingSession`], the live sandbox and the
//! per-sandbox trackers, and turns host requests into transitions. Every
//! failure is caught here, logged, and shown as a transient message; nothing
//! propagates to the host.
//!
//! The controller is synchronous. The async parts of a load (injection,
//! readiness polling, settle and focus delays) are driven by the platform
//! layer, which reports back through [`LoadToken`]-checked calls.

use web_time::Instant;

use crate::actions::FormatCommand;
use crate::config::EditorConfig;
use crate::error::{EditorError, messages};
use crate::execute::{CommandOutcome, execute_command};
use crate::images::{ImageRegistry, bind_images};
use crate::link::{self, LinkOutcome};
use crate::load::{LoadToken, SandboxGeneration};
use crate::platform::{PlatformError, SandboxPlatform};
use crate::selection::SelectionTracker;
use crate::serialize::serialize_document;
use crate::session::{EditingSession, LoadEvent, SessionAction};
use crate::types::{ImageHandle, ImageId, LinkContext, Rect, SandboxId, SelectionChanged};


/// Callbacks into the embedding application.
pub trait EditorHost {
    /// A committed edit. `html` is the full serialized document.
    fn on_change(&self, html: &str);

    /// Explicit save, called before the download is offered.
    fn on_save(&self, html: &str) -> Result<(), PlatformError> {
        let _ = html;
        Ok(())
    }

    /// Offer the serialized document as a file download.
    fn download(&self, file_name: &str, html: &str) -> Result<(), PlatformError>;

    /// Show or hide the floating toolbar.
    fn on_selection_changed(&self, change: SelectionChanged) {
        let _ = change;
    }

    /// Open (`Some`) or close (`None`) the image picker.
    fn on_image_request(&self, request: Option<ImageHandle>) {
        let _ = request;
    }

    /// Status and error texts changed.
    fn on_messages(&self, status: Option<&str>, error: Option<&str>) {
        let _ = (status, error);
    }
}

pub struct EditorController<P: SandboxPlatform, H: EditorHost> {
    config: EditorConfig,
    session: EditingSession,
    generation: SandboxGeneration,
    sandbox: Option<(SandboxId, P)>,
    tracker: SelectionTracker<P::Range>,
    images: ImageRegistry,
    assets: Vec<String>,
    host: H,
    messages_dirty: bool,
    file_reads: u64,
    pending_read: Option<FileRead>,
}

/// Ticket for one file read. Only the latest read, and only until teardown,
/// may start a load when it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRead(u64);

impl<P: SandboxPlatform, H: EditorHost> EditorController<P, H> {
    pub fn new(initial_html: impl Into<String>, config: EditorConfig, host: H) -> Self {
        Self {
            session: EditingSession::new(initial_html, &config),
            config,
            generation: SandboxGeneration::new(),
            sandbox: None,
            tracker: SelectionTracker::new(),
            images: ImageRegistry::new(),
            assets: Vec::new(),
            host,
            messages_dirty: false,
            file_reads: 0,
            pending_read: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.session = self.session.with_file_name(file_name);
        self
    }

    pub fn with_assets(mut self, assets: Vec<String>) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_show_toolbar(mut self, show: bool) -> Self {
        self.session.dispatch(SessionAction::SetShowToolbar(show));
        self
    }

    // === Accessors ===

    pub fn session(&self) -> &EditingSession {
        &self.session
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn tracker(&self) -> &SelectionTracker<P::Range> {
        &self.tracker
    }

    /// Shared generation counter, for checking staleness from callbacks.
    pub fn generation(&self) -> SandboxGeneration {
        self.generation.clone()
    }

    /// The live sandbox, if it is ready for editing.
    pub fn sandbox(&self) -> Option<&P> {
        self.live().map(|(_, p)| p)
    }

    fn live(&self) -> Option<(SandboxId, &P)> {
        let ready = self.session.ready_sandbox()?;
        match &self.sandbox {
            Some((id, platform)) if *id == ready => Some((ready, platform)),
            _ => None,
        }
    }

    // === Load cycle ===

    /// Start loading `html`. Empty input is skipped.
    ///
    /// Any in-flight load is superseded and the current sandbox released.
    pub fn begin_load(&mut self, html: impl Into<String>) -> Option<LoadToken> {
        let html = html.into();
        if html.is_empty() {
            tracing::debug!("empty document, load skipped");
            return None;
        }

        let token = self.generation.advance();
        self.release_sandbox();
        self.session.dispatch(SessionAction::BeginLoad {
            sandbox: token.id(),
            html,
        });
        tracing::info!(sandbox = %token.id(), "load started");
        Some(token)
    }

    /// The document was written into the sandbox.
    pub fn mark_injected(&mut self, token: &LoadToken) -> bool {
        token.is_current()
            && self
                .session
                .dispatch(SessionAction::Load(LoadEvent::Injected(token.id())))
    }

    /// The sandbox is settled and its editing surface set up.
    ///
    /// Returns false (and drops `platform`) when the load was superseded.
    pub fn on_ready(&mut self, token: &LoadToken, platform: P) -> bool {
        if !token.is_current() {
            tracing::debug!(sandbox = %token.id(), "stale ready ignored");
            return false;
        }

        let id = token.id();
        self.images.reset();
        if !self.assets.is_empty() {
            if let Err(e) = bind_images(&platform, &mut self.images) {
                // The document stays editable without image affordances.
                tracing::warn!(sandbox = %id, error = %e, "image binding failed");
            }
        }
        self.tracker.reset_for(id);
        self.sandbox = Some((id, platform));

        if !self
            .session
            .dispatch(SessionAction::Load(LoadEvent::Ready(id)))
        {
            self.release_sandbox();
            return false;
        }
        tracing::info!(sandbox = %id, images = self.images.len(), "sandbox ready");
        true
    }

    /// A load step failed. The previous document text is kept.
    pub fn fail_load(&mut self, token: &LoadToken, error: EditorError) {
        if !token.is_current() {
            tracing::debug!(sandbox = %token.id(), %error, "failure of superseded load ignored");
            return;
        }
        tracing::error!(sandbox = %token.id(), %error, "load failed");
        self.session
            .dispatch(SessionAction::Load(LoadEvent::Failed(token.id())));
        self.release_sandbox();
        self.show_error(error.user_message());
    }

    fn release_sandbox(&mut self) {
        self.sandbox = None;
        self.tracker.detach();
        self.images.reset();
        if self.session.dispatch(SessionAction::HideImagePicker) {
            self.host.on_image_request(None);
        }
    }

    /// Drop the sandbox, timers' targets and in-flight loads.
    pub fn teardown(&mut self) {
        self.generation.invalidate();
        self.pending_read = None;
        self.release_sandbox();
        self.session.dispatch(SessionAction::SetBusy(false));
        self.session.dispatch(SessionAction::ClearStatus);
        self.session.dispatch(SessionAction::ClearError);
        self.messages_dirty = true;
        tracing::debug!("editor torn down");
    }

    // === Serialization ===

    /// Serialize the live document.
    pub fn serialize(&self) -> Result<String, EditorError> {
        let (_, platform) = self
            .live()
            .ok_or_else(|| EditorError::serialization("no live sandbox"))?;
        serialize_document(platform)
    }

    /// Serialize for the host, showing an error and returning "" on failure.
    pub fn get_html(&mut self) -> String {
        match self.serialize() {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(error = %e, "get html failed");
                self.show_error(e.user_message());
                String::new()
            }
        }
    }

    /// Fire `on_change` with the current document.
    pub fn notify_change(&mut self) {
        if self.live().is_none() {
            return;
        }
        match self.serialize() {
            Ok(html) => self.host.on_change(&html),
            Err(e) => {
                tracing::error!(error = %e, "change notification failed");
                self.show_error(e.user_message());
            }
        }
    }

    // === Selection ===

    /// Native selection changed (or pointer released) in `sandbox`.
    pub fn on_selection_change(
        &mut self,
        sandbox: SandboxId,
        frame: &Rect,
        viewport_width: f64,
    ) -> SelectionChanged {
        let change = match &self.sandbox {
            Some((id, platform)) if *id == sandbox && self.session.ready_sandbox() == Some(*id) => {
                self.tracker
                    .on_selection_change(platform, frame, &self.config.toolbar, viewport_width)
            }
            _ => return SelectionChanged::hidden(),
        };
        self.host.on_selection_changed(change);
        change
    }

    /// The sandbox (or a nested container) scrolled.
    pub fn on_scroll(&mut self, sandbox: SandboxId) {
        if self.session.ready_sandbox() == Some(sandbox) {
            self.host.on_selection_changed(self.tracker.on_scroll());
        }
    }

    // === Commands ===

    /// Apply a formatting command to the tracked selection.
    pub fn execute(&mut self, command: &FormatCommand) -> CommandOutcome {
        let result = match &self.sandbox {
            Some((id, platform)) if self.session.ready_sandbox() == Some(*id) => {
                execute_command(platform, &mut self.tracker, *id, command)
            }
            _ => return CommandOutcome::NoSelection,
        };
        match result {
            Ok(outcome) => {
                if outcome.mutated() {
                    self.notify_change();
                }
                outcome
            }
            Err(e) => {
                tracing::error!(command = command.command_name(), error = %e, "command failed");
                self.show_error(e.user_message());
                CommandOutcome::Aborted
            }
        }
    }

    /// Inspect the selection for the link editor. None means "nothing to link".
    pub fn open_link_editor(&mut self) -> Option<LinkContext> {
        let result = {
            let (id, platform) = self.live()?;
            link::open_link_editor(platform, &self.tracker, id)
        };
        match result {
            Ok(context) => context,
            Err(e) => {
                tracing::error!(error = %e, "open link editor failed");
                self.show_error(e.user_message());
                None
            }
        }
    }

    pub fn save_link(&mut self, url: &str, text: &str) -> LinkOutcome {
        let result = match &self.sandbox {
            Some((id, platform)) if self.session.ready_sandbox() == Some(*id) => {
                link::save_link(platform, &mut self.tracker, *id, url, text)
            }
            _ => return LinkOutcome::Skipped,
        };
        self.finish_link_edit(result, messages::LINK_SAVED)
    }

    pub fn remove_link(&mut self) -> LinkOutcome {
        let result = match &self.sandbox {
            Some((id, platform)) if self.session.ready_sandbox() == Some(*id) => {
                link::remove_link(platform, &mut self.tracker, *id)
            }
            _ => return LinkOutcome::Skipped,
        };
        self.finish_link_edit(result, messages::LINK_REMOVED)
    }

    fn finish_link_edit(
        &mut self,
        result: Result<LinkOutcome, EditorError>,
        success: &str,
    ) -> LinkOutcome {
        match result {
            Ok(LinkOutcome::Skipped) => LinkOutcome::Skipped,
            Ok(outcome) => {
                self.notify_change();
                self.show_status(success);
                outcome
            }
            Err(e) => {
                tracing::error!(error = %e, "link edit failed");
                self.show_error(e.user_message());
                LinkOutcome::Skipped
            }
        }
    }

    // === Images ===

    /// A bound image was clicked.
    pub fn request_image_replace(&mut self, sandbox: SandboxId, image: ImageId) -> bool {
        if self.session.ready_sandbox() != Some(sandbox) || !self.images.contains(image) {
            tracing::debug!(%sandbox, ?image, "image click from stale binding ignored");
            return false;
        }
        let handle = ImageHandle { sandbox, image };
        self.session.dispatch(SessionAction::ShowImagePicker(handle));
        self.host.on_image_request(Some(handle));
        true
    }

    /// Replace the requested image's source with `url`.
    pub fn select_replacement_image(&mut self, url: &str) -> bool {
        let result = self.replace_requested_image(url);
        if self.session.dispatch(SessionAction::HideImagePicker) {
            self.host.on_image_request(None);
        }
        match result {
            Ok(()) => {
                self.show_status(messages::IMAGE_REPLACED);
                self.notify_change();
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "image replace failed");
                self.show_error(e.user_message());
                false
            }
        }
    }

    fn replace_requested_image(&self, url: &str) -> Result<(), EditorError> {
        let handle = self
            .session
            .image_request()
            .ok_or_else(|| EditorError::ImageReplace(messages::NO_IMAGE_SELECTED.into()))?;
        let (id, platform) = self
            .live()
            .filter(|(id, _)| *id == handle.sandbox)
            .ok_or_else(|| EditorError::ImageReplace(format!("{} was replaced", handle.sandbox)))?;
        tracing::debug!(sandbox = %id, image = ?handle.image, url, "replacing image");
        platform
            .set_image_source(handle.image, url)
            .map_err(|e| EditorError::ImageReplace(e.0))
    }

    pub fn cancel_image_picker(&mut self) {
        if self.session.dispatch(SessionAction::HideImagePicker) {
            self.host.on_image_request(None);
        }
    }

    /// Bind images added since the last pass.
    pub fn rebind_images(&mut self) -> usize {
        if self.assets.is_empty() {
            return 0;
        }
        let platform = match (&self.sandbox, self.session.ready_sandbox()) {
            (Some((id, platform)), Some(ready)) if *id == ready => platform,
            _ => return 0,
        };
        match bind_images(platform, &mut self.images) {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "image rebinding failed");
                0
            }
        }
    }

    // === Files ===

    /// Serialize, hand to `on_save`, then offer the download.
    pub fn save(&mut self) -> bool {
        let html = match self.serialize() {
            Ok(html) if !html.is_empty() => html,
            Ok(_) => {
                self.show_error(messages::NO_CONTENT_TO_SAVE);
                return false;
            }
            Err(e) => {
                tracing::error!(error = %e, "save failed");
                self.show_error(messages::FAILED_TO_SAVE);
                return false;
            }
        };

        if let Err(e) = self.host.on_save(&html) {
            tracing::error!(error = %e, "on_save callback failed");
        }

        let file_name = self.session.current_file_name().to_string();
        match self.host.download(&file_name, &html) {
            Ok(()) => {
                tracing::info!(file = %file_name, bytes = html.len(), "document saved");
                self.show_status(messages::FILE_SAVED);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "download failed");
                self.show_error(messages::FAILED_TO_SAVE);
                false
            }
        }
    }

    /// Reload the initial document. Does nothing unless `confirmed`.
    pub fn reset(&mut self, confirmed: bool) -> Option<LoadToken> {
        if !confirmed {
            return None;
        }
        let initial = self.session.initial_html().to_string();
        let token = self.begin_load(initial)?;
        self.show_status(messages::CONTENT_RESET);
        Some(token)
    }

    /// A file read started. A newer read supersedes this one.
    pub fn begin_file_load(&mut self) -> FileRead {
        self.file_reads += 1;
        let read = FileRead(self.file_reads);
        self.pending_read = Some(read);
        self.session.dispatch(SessionAction::SetBusy(true));
        read
    }

    /// A file read finished with `result`.
    ///
    /// Superseded reads, and reads outliving teardown, change nothing.
    pub fn finish_file_load(
        &mut self,
        read: FileRead,
        file_name: &str,
        result: Result<String, EditorError>,
    ) -> Option<LoadToken> {
        if self.pending_read != Some(read) {
            tracing::debug!(file = file_name, "stale file read ignored");
            return None;
        }
        self.pending_read = None;
        let text = match result {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(file = file_name, error = %e, "file load failed");
                self.show_error(e.user_message());
                return None;
            }
        };

        self.session.dispatch(SessionAction::SetBusy(false));
        let token = self.begin_load(text)?;
        self.session
            .dispatch(SessionAction::SetFileName(file_name.to_string()));
        self.show_status(messages::FILE_LOADED);
        Some(token)
    }

    // === Messages ===

    pub fn set_show_toolbar(&mut self, show: bool) {
        self.session.dispatch(SessionAction::SetShowToolbar(show));
    }

    pub fn show_status(&mut self, text: &str) {
        self.session.dispatch(SessionAction::SetStatus {
            text: text.to_string(),
            at: Instant::now(),
        });
        self.messages_changed();
    }

    pub fn show_error(&mut self, text: &str) {
        self.session.dispatch(SessionAction::SetError {
            text: text.to_string(),
            at: Instant::now(),
        });
        self.messages_changed();
    }

    /// Drop expired messages. Returns whether any were cleared.
    pub fn expire_messages(&mut self, now: Instant) -> bool {
        let changed = self.session.dispatch(SessionAction::Expire(now));
        if changed {
            self.messages_changed();
        }
        changed
    }

    /// Whether messages changed since the last call, so the expiry timer
    /// needs rescheduling.
    pub fn take_messages_dirty(&mut self) -> bool {
        std::mem::take(&mut self.messages_dirty)
    }

    fn messages_changed(&mut self) {
        self.messages_dirty = true;
        self.host.on_messages(
            self.session.status().map(|m| m.text.as_str()),
            self.session.error().map(|m| m.text.as_str()),
        );
    }
}
