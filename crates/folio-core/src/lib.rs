//! folio-core: editing-session logic for the folio HTML editor, without
//! browser dependencies.
//!
//! This crate provides:
//! - `EditingSession` - the session aggregate and its load-cycle state machine
//! - Platform traits (`SelectionPlatform`, `FormatPlatform`, ...) that a
//!   rendering engine implements for one sandboxed document
//! - `SelectionTracker`, command execution, link and image layers, all
//!   generic over those traits
//! - `EditorController` - ties the above together behind an `EditorHost`
//! - `wait_until_ready` - the readiness poll, cancelled by sandbox identity

pub mod actions;
pub mod config;
pub mod controller;
pub mod error;
pub mod execute;
pub mod fault;
pub mod images;
pub mod link;
pub mod load;
pub mod platform;
pub mod selection;
pub mod serialize;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use actions::FormatCommand;
pub use config::{DEFAULT_FILE_NAME, EditorConfig, SANDBOX_PERMISSIONS};
pub use controller::{EditorController, EditorHost, FileRead};
pub use error::{EditorError, messages};
pub use execute::{CommandOutcome, execute_command};
pub use fault::{FaultReport, FaultState, RecoveryAction};
pub use images::{ImageRegistry, bind_images};
pub use link::{LinkOutcome, normalize_link_url};
pub use load::{LoadToken, Readiness, ReadinessProbe, SandboxGeneration, Superseded, Timer, wait_until_ready};
pub use platform::{
    AnchorInfo, DisplayFlow, FormatPlatform, ImagePlatform, LinkPlatform, NativeSelection,
    PlatformError, SandboxPlatform, SelectionPlatform, SerializePlatform,
};
pub use selection::{RestoreError, SelectionTracker};
pub use serialize::{
    DoctypeInfo, HTML_MIME_TYPE, compose_document, format_doctype, is_candidate_html,
    is_html_file_name, serialize_document,
};
pub use session::{EditingSession, LoadEvent, LoadState, SessionAction, TransientMessage, transition};
pub use smol_str::SmolStr;
pub use types::{
    ImageHandle, ImageId, LinkContext, Rect, SandboxId, SelectionChanged, SelectionSnapshot,
    ToolbarMetrics, ToolbarPosition, toolbar_position,
};
