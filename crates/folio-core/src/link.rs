//! Link editing against the tracked selection.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::actions::FormatCommand;
use crate::error::EditorError;
use crate::platform::{FormatPlatform, LinkPlatform, SelectionPlatform};
use crate::selection::{RestoreError, SelectionTracker};
use crate::types::{LinkContext, SandboxId};

static EXPLICIT_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?://|mailto:)").expect("EXPLICIT_SCHEME: hardcoded regex is valid")
});

/// Trim a user-typed URL and give it a scheme.
///
/// Returns None for blank input. Anything without `http://`, `https://` or
/// `mailto:` is assumed to be a web address and gets `https://`.
pub fn normalize_link_url(input: &str) -> Option<String> {
    let url = input.trim();
    if url.is_empty() {
        return None;
    }
    if EXPLICIT_SCHEME.is_match(url) {
        Some(url.to_string())
    } else {
        Some(format!("https://{}", url))
    }
}

/// Result of a save or remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Blank URL or no captured selection; nothing changed.
    Skipped,
    /// The link was written with this href.
    Saved(String),
    Removed,
}

fn restore_for_link<P>(
    platform: &P,
    tracker: &SelectionTracker<P::Range>,
    sandbox: SandboxId,
) -> Result<bool, EditorError>
where
    P: SelectionPlatform + ?Sized,
{
    match tracker.restore(platform, sandbox) {
        Ok(()) => Ok(true),
        Err(RestoreError::NoSnapshot | RestoreError::ForeignSandbox) => Ok(false),
        Err(RestoreError::Detached(e)) => Err(EditorError::link_edit(e)),
    }
}

/// Inspect the selection for the link editor.
///
/// Returns None when there is no selection to link.
pub fn open_link_editor<P>(
    platform: &P,
    tracker: &SelectionTracker<P::Range>,
    sandbox: SandboxId,
) -> Result<Option<LinkContext>, EditorError>
where
    P: SelectionPlatform + LinkPlatform + ?Sized,
{
    if !restore_for_link(platform, tracker, sandbox)? {
        return Ok(None);
    }

    let context = match platform.enclosing_anchor() {
        Some(anchor) => LinkContext::Edit {
            url: anchor.href,
            text: anchor.text,
        },
        None => LinkContext::Create {
            text: tracker
                .snapshot()
                .map(|s| s.text.clone())
                .unwrap_or_default(),
        },
    };
    Ok(Some(context))
}

/// Create or update a link on the tracked selection.
///
/// With a collapsed selection, non-blank `text` is inserted first so the
/// link command has something to wrap.
pub fn save_link<P>(
    platform: &P,
    tracker: &mut SelectionTracker<P::Range>,
    sandbox: SandboxId,
    url: &str,
    text: &str,
) -> Result<LinkOutcome, EditorError>
where
    P: SelectionPlatform + FormatPlatform + LinkPlatform + ?Sized,
{
    let Some(href) = normalize_link_url(url) else {
        return Ok(LinkOutcome::Skipped);
    };
    if !restore_for_link(platform, tracker, sandbox)? {
        return Ok(LinkOutcome::Skipped);
    }

    let collapsed = platform.get_selection().is_none_or(|sel| sel.collapsed);
    let text = text.trim();
    if collapsed && !text.is_empty() {
        platform
            .insert_text_and_select(text)
            .map_err(EditorError::link_edit)?;
    }

    let command = FormatCommand::CreateLink(href.clone());
    platform
        .apply_format_command(command.command_name(), command.value().as_deref())
        .map_err(EditorError::link_edit)?;
    tracker.recapture(platform);
    tracing::debug!(%href, "link saved");
    Ok(LinkOutcome::Saved(href))
}

/// Unlink the tracked selection.
pub fn remove_link<P>(
    platform: &P,
    tracker: &mut SelectionTracker<P::Range>,
    sandbox: SandboxId,
) -> Result<LinkOutcome, EditorError>
where
    P: SelectionPlatform + FormatPlatform + ?Sized,
{
    if !restore_for_link(platform, tracker, sandbox)? {
        return Ok(LinkOutcome::Skipped);
    }
    platform
        .apply_format_command(FormatCommand::Unlink.command_name(), None)
        .map_err(EditorError::link_edit)?;
    tracker.recapture(platform);
    Ok(LinkOutcome::Removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRange, FakeSandbox};
    use crate::types::{Rect, ToolbarMetrics};

    fn tracked(fake: &FakeSandbox, text: &str) -> SelectionTracker<FakeRange> {
        let mut tracker = SelectionTracker::new();
        tracker.reset_for(SandboxId(1));
        fake.select_text(text);
        tracker.on_selection_change(fake, &Rect::default(), &ToolbarMetrics::default(), 1000.0);
        tracker
    }

    #[test]
    fn test_scheme_normalization() {
        assert_eq!(
            normalize_link_url("example.com").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            normalize_link_url("mailto:a@b.com").as_deref(),
            Some("mailto:a@b.com")
        );
        assert_eq!(
            normalize_link_url("https://x.com").as_deref(),
            Some("https://x.com")
        );
        assert_eq!(
            normalize_link_url("  HTTP://Y.org ").as_deref(),
            Some("HTTP://Y.org")
        );
        assert_eq!(normalize_link_url("   "), None);
    }

    #[test]
    fn test_open_create_mode() {
        let fake = FakeSandbox::new("<p>visit our site</p>");
        let tracker = tracked(&fake, "our site");
        let ctx = open_link_editor(&fake, &tracker, SandboxId(1))
            .unwrap()
            .unwrap();
        assert_eq!(
            ctx,
            LinkContext::Create {
                text: "our site".into()
            }
        );
    }

    #[test]
    fn test_open_edit_mode() {
        let fake = FakeSandbox::new(r#"<p>see <a href="https://a.dev">docs</a></p>"#);
        let tracker = tracked(&fake, "docs");
        let ctx = open_link_editor(&fake, &tracker, SandboxId(1))
            .unwrap()
            .unwrap();
        assert_eq!(
            ctx,
            LinkContext::Edit {
                url: "https://a.dev".into(),
                text: "docs".into()
            }
        );
    }

    #[test]
    fn test_open_without_selection() {
        let fake = FakeSandbox::new("<p>x</p>");
        let mut tracker = SelectionTracker::new();
        tracker.reset_for(SandboxId(1));
        assert_eq!(open_link_editor(&fake, &tracker, SandboxId(1)).unwrap(), None);
    }

    #[test]
    fn test_save_wraps_selection() {
        let fake = FakeSandbox::new("<p>visit example</p>");
        let mut tracker = tracked(&fake, "example");
        let outcome = save_link(&fake, &mut tracker, SandboxId(1), "example.com", "").unwrap();
        assert_eq!(outcome, LinkOutcome::Saved("https://example.com".into()));
        assert_eq!(
            fake.body(),
            r#"<p>visit <a href="https://example.com">example</a></p>"#
        );
    }

    #[test]
    fn test_save_inserts_text_for_caret() {
        let fake = FakeSandbox::new("<p>end</p>");
        let mut tracker = tracked(&fake, "end");
        // A previous command left a caret after "end".
        fake.collapse_to_end();
        tracker.recapture(&fake);

        save_link(&fake, &mut tracker, SandboxId(1), "mailto:a@b.com", " mail me ").unwrap();
        assert_eq!(
            fake.body(),
            r#"<p>end<a href="mailto:a@b.com">mail me</a></p>"#
        );
    }

    #[test]
    fn test_blank_url_skipped() {
        let fake = FakeSandbox::new("<p>x</p>");
        let mut tracker = tracked(&fake, "x");
        assert_eq!(
            save_link(&fake, &mut tracker, SandboxId(1), "  ", "").unwrap(),
            LinkOutcome::Skipped
        );
        assert!(fake.commands().is_empty());
    }

    #[test]
    fn test_remove_link() {
        let fake = FakeSandbox::new(r#"<p>see <a href="https://a.dev">docs</a></p>"#);
        let mut tracker = tracked(&fake, "docs");
        assert_eq!(
            remove_link(&fake, &mut tracker, SandboxId(1)).unwrap(),
            LinkOutcome::Removed
        );
        assert_eq!(fake.body(), "<p>see docs</p>");
    }

    #[test]
    fn test_detached_restore_is_link_error() {
        let fake = FakeSandbox::new("<p>x</p>");
        let mut tracker = tracked(&fake, "x");
        fake.replace_document("<p>y</p>");
        let err = remove_link(&fake, &mut tracker, SandboxId(1)).unwrap_err();
        assert!(matches!(err, EditorError::LinkEdit(_)));
    }
}
