//! The editing-session aggregate.
//!
//! `EditingSession` is mutated only through [`SessionAction`]s. Load cycle
//! bookkeeping goes through the pure [`transition`] function so the allowed
//! moves are auditable in one place.

use std::time::Duration;

use web_time::Instant;

use crate::config::{DEFAULT_FILE_NAME, EditorConfig};
use crate::types::{ImageHandle, SandboxId};

/// Lifecycle of one load cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Injecting,
    WaitingReady,
    Ready,
    Failed,
}

impl LoadState {
    /// Ready and Failed end a cycle; only a new load leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadState::Ready | LoadState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::Injecting => "injecting",
            LoadState::WaitingReady => "waitingReady",
            LoadState::Ready => "ready",
            LoadState::Failed => "failed",
        }
    }
}

/// The current sandbox together with the state of its load cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadCycle {
    pub sandbox: Option<SandboxId>,
    pub state: LoadState,
}

/// Inputs to the load-cycle state machine. Each names the sandbox it is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadEvent {
    Begin(SandboxId),
    Injected(SandboxId),
    Ready(SandboxId),
    Failed(SandboxId),
}

impl LoadEvent {
    pub fn sandbox(self) -> SandboxId {
        match self {
            LoadEvent::Begin(id)
            | LoadEvent::Injected(id)
            | LoadEvent::Ready(id)
            | LoadEvent::Failed(id) => id,
        }
    }
}

/// Apply a load event to a cycle.
///
/// Returns None when the event is not allowed: it names a sandbox other than
/// the current one, or it would move the cycle backwards. `Begin` must carry
/// a sandbox newer than the current one.
pub fn transition(cycle: LoadCycle, event: LoadEvent) -> Option<LoadCycle> {
    use LoadState::*;

    if let LoadEvent::Begin(id) = event {
        if cycle.sandbox.is_some_and(|current| current >= id) {
            return None;
        }
        return Some(LoadCycle {
            sandbox: Some(id),
            state: Injecting,
        });
    }

    if cycle.sandbox != Some(event.sandbox()) {
        return None;
    }

    let next = match (cycle.state, event) {
        (Injecting, LoadEvent::Injected(_)) => WaitingReady,
        (WaitingReady, LoadEvent::Ready(_)) => Ready,
        (Injecting | WaitingReady, LoadEvent::Failed(_)) => Failed,
        _ => return None,
    };
    Some(LoadCycle {
        sandbox: cycle.sandbox,
        state: next,
    })
}

/// A user-facing message with an expiry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransientMessage {
    pub text: String,
    pub expires_at: Instant,
}

impl TransientMessage {
    pub fn new(text: impl Into<String>, at: Instant, ttl: Duration) -> Self {
        Self {
            text: text.into(),
            expires_at: at + ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Everything that can change an [`EditingSession`].
#[derive(Clone, Debug)]
pub enum SessionAction {
    /// Start a load cycle for `sandbox` with the given document text.
    BeginLoad { sandbox: SandboxId, html: String },
    /// Advance the current load cycle.
    Load(LoadEvent),
    SetFileName(String),
    /// Show a success message. Clears any error.
    SetStatus { text: String, at: Instant },
    /// Show an error. Clears any status and the busy flag.
    SetError { text: String, at: Instant },
    SetBusy(bool),
    ShowImagePicker(ImageHandle),
    HideImagePicker,
    ClearStatus,
    ClearError,
    /// Drop messages whose expiry has passed.
    Expire(Instant),
    SetShowToolbar(bool),
}

/// The root aggregate of one mounted editor.
#[derive(Clone, Debug)]
pub struct EditingSession {
    initial_html: String,
    raw_source_html: String,
    /// Document text before the in-flight load, restored if that load fails.
    previous_html: Option<String>,
    current_file_name: String,
    cycle: LoadCycle,
    status: Option<TransientMessage>,
    error: Option<TransientMessage>,
    is_busy: bool,
    image_request: Option<ImageHandle>,
    show_toolbar: bool,
    status_ttl: Duration,
    error_ttl: Duration,
}

impl EditingSession {
    pub fn new(initial_html: impl Into<String>, config: &EditorConfig) -> Self {
        Self {
            initial_html: initial_html.into(),
            raw_source_html: String::new(),
            previous_html: None,
            current_file_name: DEFAULT_FILE_NAME.to_string(),
            cycle: LoadCycle::default(),
            status: None,
            error: None,
            is_busy: false,
            image_request: None,
            show_toolbar: true,
            status_ttl: config.status_duration(),
            error_ttl: config.error_duration(),
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.current_file_name = name;
        }
        self
    }

    /// Apply an action. Returns whether anything changed.
    pub fn dispatch(&mut self, action: SessionAction) -> bool {
        match action {
            SessionAction::BeginLoad { sandbox, html } => {
                let Some(next) = transition(self.cycle, LoadEvent::Begin(sandbox)) else {
                    tracing::warn!(%sandbox, current = ?self.cycle.sandbox, "rejected stale load");
                    return false;
                };
                self.cycle = next;
                self.previous_html = Some(std::mem::replace(&mut self.raw_source_html, html));
                self.image_request = None;
                true
            }
            SessionAction::Load(event) => {
                let Some(next) = transition(self.cycle, event) else {
                    tracing::debug!(?event, cycle = ?self.cycle, "ignored load event");
                    return false;
                };
                self.cycle = next;
                match next.state {
                    LoadState::Ready => self.previous_html = None,
                    LoadState::Failed => {
                        if let Some(previous) = self.previous_html.take() {
                            self.raw_source_html = previous;
                        }
                        self.image_request = None;
                    }
                    _ => {}
                }
                true
            }
            SessionAction::SetFileName(name) => {
                if name == self.current_file_name {
                    return false;
                }
                self.current_file_name = name;
                true
            }
            SessionAction::SetStatus { text, at } => {
                self.status = Some(TransientMessage::new(text, at, self.status_ttl));
                self.error = None;
                true
            }
            SessionAction::SetError { text, at } => {
                self.error = Some(TransientMessage::new(text, at, self.error_ttl));
                self.status = None;
                self.is_busy = false;
                true
            }
            SessionAction::SetBusy(busy) => {
                let changed = self.is_busy != busy;
                self.is_busy = busy;
                changed
            }
            SessionAction::ShowImagePicker(handle) => {
                self.image_request = Some(handle);
                true
            }
            SessionAction::HideImagePicker => self.image_request.take().is_some(),
            SessionAction::ClearStatus => self.status.take().is_some(),
            SessionAction::ClearError => self.error.take().is_some(),
            SessionAction::Expire(now) => {
                let mut changed = false;
                if self.status.as_ref().is_some_and(|m| m.is_expired(now)) {
                    self.status = None;
                    changed = true;
                }
                if self.error.as_ref().is_some_and(|m| m.is_expired(now)) {
                    self.error = None;
                    changed = true;
                }
                changed
            }
            SessionAction::SetShowToolbar(show) => {
                let changed = self.show_toolbar != show;
                self.show_toolbar = show;
                changed
            }
        }
    }

    pub fn initial_html(&self) -> &str {
        &self.initial_html
    }

    pub fn raw_source_html(&self) -> &str {
        &self.raw_source_html
    }

    pub fn current_file_name(&self) -> &str {
        &self.current_file_name
    }

    pub fn load_state(&self) -> LoadState {
        self.cycle.state
    }

    pub fn cycle(&self) -> LoadCycle {
        self.cycle
    }

    /// The sandbox of the latest load cycle, whatever its state.
    pub fn current_sandbox(&self) -> Option<SandboxId> {
        self.cycle.sandbox
    }

    /// The current sandbox, only once it is ready for editing.
    pub fn ready_sandbox(&self) -> Option<SandboxId> {
        match self.cycle.state {
            LoadState::Ready => self.cycle.sandbox,
            _ => None,
        }
    }

    pub fn status(&self) -> Option<&TransientMessage> {
        self.status.as_ref()
    }

    pub fn error(&self) -> Option<&TransientMessage> {
        self.error.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.is_busy
    }

    pub fn image_request(&self) -> Option<ImageHandle> {
        self.image_request
    }

    pub fn show_toolbar(&self) -> bool {
        self.show_toolbar
    }

    /// Earliest expiry among the visible messages.
    pub fn next_expiry(&self) -> Option<Instant> {
        [self.status.as_ref(), self.error.as_ref()]
            .into_iter()
            .flatten()
            .map(|m| m.expires_at)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(id: u64, state: LoadState) -> LoadCycle {
        LoadCycle {
            sandbox: Some(SandboxId(id)),
            state,
        }
    }

    #[test]
    fn test_transitions_are_monotonic() {
        let c = transition(LoadCycle::default(), LoadEvent::Begin(SandboxId(1))).unwrap();
        assert_eq!(c, cycle(1, LoadState::Injecting));

        // Cannot skip injection.
        assert!(transition(c, LoadEvent::Ready(SandboxId(1))).is_none());

        let c = transition(c, LoadEvent::Injected(SandboxId(1))).unwrap();
        assert_eq!(c.state, LoadState::WaitingReady);
        let c = transition(c, LoadEvent::Ready(SandboxId(1))).unwrap();
        assert_eq!(c.state, LoadState::Ready);

        // Terminal for this cycle.
        assert!(transition(c, LoadEvent::Failed(SandboxId(1))).is_none());
        assert!(transition(c, LoadEvent::Injected(SandboxId(1))).is_none());

        // A new load restarts at Injecting.
        let c = transition(c, LoadEvent::Begin(SandboxId(2))).unwrap();
        assert_eq!(c, cycle(2, LoadState::Injecting));
    }

    #[test]
    fn test_failed_from_non_terminal() {
        let c = cycle(3, LoadState::Injecting);
        assert_eq!(
            transition(c, LoadEvent::Failed(SandboxId(3))).unwrap().state,
            LoadState::Failed
        );
        let c = cycle(3, LoadState::WaitingReady);
        assert_eq!(
            transition(c, LoadEvent::Failed(SandboxId(3))).unwrap().state,
            LoadState::Failed
        );
        assert!(transition(LoadCycle::default(), LoadEvent::Failed(SandboxId(3))).is_none());
    }

    #[test]
    fn test_stale_events_ignored() {
        let c = cycle(5, LoadState::WaitingReady);
        assert!(transition(c, LoadEvent::Ready(SandboxId(4))).is_none());
        assert!(transition(c, LoadEvent::Failed(SandboxId(4))).is_none());
        // Older or equal sandboxes cannot restart the cycle.
        assert!(transition(c, LoadEvent::Begin(SandboxId(5))).is_none());
        assert!(transition(c, LoadEvent::Begin(SandboxId(2))).is_none());
    }

    #[test]
    fn test_failed_load_restores_previous_document() {
        let mut session = EditingSession::new("<p>a</p>", &EditorConfig::default());
        session.dispatch(SessionAction::BeginLoad {
            sandbox: SandboxId(1),
            html: "<p>a</p>".into(),
        });
        session.dispatch(SessionAction::Load(LoadEvent::Injected(SandboxId(1))));
        session.dispatch(SessionAction::Load(LoadEvent::Ready(SandboxId(1))));

        session.dispatch(SessionAction::BeginLoad {
            sandbox: SandboxId(2),
            html: "<p>b</p>".into(),
        });
        assert_eq!(session.raw_source_html(), "<p>b</p>");
        assert!(session.dispatch(SessionAction::Load(LoadEvent::Failed(SandboxId(2)))));
        assert_eq!(session.load_state(), LoadState::Failed);
        assert_eq!(session.raw_source_html(), "<p>a</p>");
        assert_eq!(session.ready_sandbox(), None);
    }

    #[test]
    fn test_status_and_error_exclusive() {
        let mut session = EditingSession::new("", &EditorConfig::default());
        let now = Instant::now();

        session.dispatch(SessionAction::SetBusy(true));
        session.dispatch(SessionAction::SetStatus {
            text: "ok".into(),
            at: now,
        });
        assert!(session.status().is_some());

        session.dispatch(SessionAction::SetError {
            text: "bad".into(),
            at: now,
        });
        assert!(session.status().is_none());
        assert!(!session.is_busy());
        assert_eq!(session.error().unwrap().text, "bad");

        session.dispatch(SessionAction::SetStatus {
            text: "ok again".into(),
            at: now,
        });
        assert!(session.error().is_none());
    }

    #[test]
    fn test_messages_expire() {
        let mut session = EditingSession::new("", &EditorConfig::default());
        let now = Instant::now();
        session.dispatch(SessionAction::SetStatus {
            text: "saved".into(),
            at: now,
        });
        assert_eq!(session.next_expiry(), Some(now + Duration::from_secs(3)));

        assert!(!session.dispatch(SessionAction::Expire(now + Duration::from_millis(2999))));
        assert!(session.status().is_some());
        assert!(session.dispatch(SessionAction::Expire(now + Duration::from_secs(3))));
        assert!(session.status().is_none());
        assert_eq!(session.next_expiry(), None);
    }

    #[test]
    fn test_file_name_default() {
        let session = EditingSession::new("", &EditorConfig::default()).with_file_name("");
        assert_eq!(session.current_file_name(), "document.html");
        let session = EditingSession::new("", &EditorConfig::default()).with_file_name("a.html");
        assert_eq!(session.current_file_name(), "a.html");
    }
}
