//! Error taxonomy for editing-session operations.
//!
//! Every variant is recoverable at the session level. Callers log the error
//! where it originates and surface `user_message()` as a transient message.

use miette::Diagnostic;

use crate::platform::PlatformError;

/// Errors raised while operating on the sandboxed document.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditorError {
    /// The sandbox document or body could not be reached.
    #[error("sandbox access failed: {0}")]
    #[diagnostic(code(folio::sandbox_access))]
    SandboxAccess(String),

    /// Writing a document into a fresh sandbox failed.
    #[error("load failed: {0}")]
    #[diagnostic(code(folio::load))]
    Load(String),

    /// The sandbox content could not be read back.
    #[error("serialization failed: {0}")]
    #[diagnostic(code(folio::serialization))]
    Serialization(String),

    /// A native formatting command failed, or its selection could not be restored.
    #[error("format command failed: {0}")]
    #[diagnostic(code(folio::format_command))]
    FormatCommand(String),

    /// Creating, updating or removing a link failed.
    #[error("link edit failed: {0}")]
    #[diagnostic(code(folio::link_edit), help("select the text to link again"))]
    LinkEdit(String),

    /// A user-selected file could not be read as text.
    #[error("file read failed: {0}")]
    #[diagnostic(code(folio::file_read), help("only .html and .htm files can be loaded"))]
    FileRead(String),

    /// Loaded content is not text, or not an HTML document.
    #[error("invalid content: {0}")]
    #[diagnostic(code(folio::invalid_content))]
    InvalidContent(String),

    /// Replacing an image failed (no pending request, or the image went stale).
    #[error("image replace failed: {0}")]
    #[diagnostic(code(folio::image_replace))]
    ImageReplace(String),
}

impl EditorError {
    /// The short message shown to the user for this error.
    pub fn user_message(&self) -> &'static str {
        match self {
            EditorError::SandboxAccess(_) => messages::FAILED_TO_INITIALIZE,
            EditorError::Load(_) => messages::FAILED_TO_LOAD_HTML,
            EditorError::Serialization(_) => messages::FAILED_TO_GET_HTML,
            EditorError::FormatCommand(_) => messages::FAILED_TO_FORMAT,
            EditorError::LinkEdit(_) => messages::FAILED_TO_EDIT_LINK,
            EditorError::FileRead(_) => messages::FAILED_TO_READ_FILE,
            EditorError::InvalidContent(_) => messages::INVALID_FILE_CONTENT,
            EditorError::ImageReplace(_) => messages::FAILED_TO_REPLACE_IMAGE,
        }
    }

    pub fn sandbox_access(e: impl Into<PlatformError>) -> Self {
        EditorError::SandboxAccess(e.into().0)
    }

    pub fn load(e: impl Into<PlatformError>) -> Self {
        EditorError::Load(e.into().0)
    }

    pub fn serialization(e: impl Into<PlatformError>) -> Self {
        EditorError::Serialization(e.into().0)
    }

    pub fn format_command(e: impl Into<PlatformError>) -> Self {
        EditorError::FormatCommand(e.into().0)
    }

    pub fn link_edit(e: impl Into<PlatformError>) -> Self {
        EditorError::LinkEdit(e.into().0)
    }
}

/// User-facing message texts.
pub mod messages {
    pub const FAILED_TO_INITIALIZE: &str = "Failed to initialize editor. Please refresh the page.";
    pub const FAILED_TO_LOAD_HTML: &str = "Failed to load HTML content";
    pub const FAILED_TO_GET_HTML: &str = "Failed to get HTML content";
    pub const FAILED_TO_FORMAT: &str = "Failed to apply formatting";
    pub const FAILED_TO_EDIT_LINK: &str = "Failed to update link";
    pub const FAILED_TO_READ_FILE: &str = "Failed to read file";
    pub const FAILED_TO_LOAD_FILE: &str = "Failed to load file";
    pub const INVALID_FILE_CONTENT: &str = "Invalid file content";
    pub const NO_CONTENT_TO_SAVE: &str = "No content to save";
    pub const FAILED_TO_SAVE: &str = "Failed to save file";
    pub const NO_IMAGE_SELECTED: &str = "No image selected";
    pub const FAILED_TO_REPLACE_IMAGE: &str = "Failed to replace image";

    pub const FILE_LOADED: &str = "File loaded successfully!";
    pub const FILE_SAVED: &str = "File saved successfully!";
    pub const CONTENT_RESET: &str = "Content reset to original";
    pub const IMAGE_REPLACED: &str = "Image replaced successfully!";
    pub const LINK_SAVED: &str = "Link updated";
    pub const LINK_REMOVED: &str = "Link removed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let err = EditorError::sandbox_access("no body");
        assert_eq!(err.to_string(), "sandbox access failed: no body");
        assert_eq!(err.user_message(), messages::FAILED_TO_INITIALIZE);

        let err = EditorError::FileRead("not utf-8".into());
        assert_eq!(err.user_message(), "Failed to read file");

        let err = EditorError::load("document.write threw");
        assert_eq!(err.user_message(), "Failed to load HTML content");
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = EditorError::link_edit("range detached");
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("folio::link_edit"));
    }
}
