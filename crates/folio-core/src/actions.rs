//! Formatting commands.
//!
//! `FormatCommand` names the native text-mutation operations the toolbar can
//! request. Parsing accepts the browser's `execCommand` names (case
//! insensitive); unrecognized names pass through as `Other` so hosts can use
//! engine-specific commands without a core change.

use std::borrow::Cow;

use smol_str::SmolStr;

/// A named formatting command with its optional value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCommand {
    // === Inline ===
    Bold,
    Italic,
    Underline,
    Strikethrough,
    ForeColor(SmolStr),
    BackColor(SmolStr),
    RemoveFormat,

    // === Block ===
    /// Heading level 1..=6.
    Heading(u8),
    Paragraph,
    JustifyLeft,
    JustifyCenter,
    JustifyRight,
    InsertOrderedList,
    InsertUnorderedList,

    // === History ===
    Undo,
    Redo,

    // === Links and text ===
    CreateLink(String),
    Unlink,
    InsertText(String),

    /// Any other engine command, forwarded verbatim.
    Other {
        name: SmolStr,
        value: Option<String>,
    },
}

impl FormatCommand {
    /// Parse a command name and optional value.
    pub fn parse(name: &str, value: Option<&str>) -> Self {
        let value_str = || value.unwrap_or_default().trim();
        match name.to_ascii_lowercase().as_str() {
            "bold" => FormatCommand::Bold,
            "italic" => FormatCommand::Italic,
            "underline" => FormatCommand::Underline,
            "strikethrough" => FormatCommand::Strikethrough,
            "forecolor" => FormatCommand::ForeColor(value_str().into()),
            "backcolor" | "hilitecolor" => FormatCommand::BackColor(value_str().into()),
            "removeformat" => FormatCommand::RemoveFormat,
            "formatblock" => parse_block(value_str()).unwrap_or_else(|| FormatCommand::Other {
                name: name.into(),
                value: value.map(str::to_string),
            }),
            "justifyleft" => FormatCommand::JustifyLeft,
            "justifycenter" => FormatCommand::JustifyCenter,
            "justifyright" => FormatCommand::JustifyRight,
            "insertorderedlist" => FormatCommand::InsertOrderedList,
            "insertunorderedlist" => FormatCommand::InsertUnorderedList,
            "undo" => FormatCommand::Undo,
            "redo" => FormatCommand::Redo,
            "createlink" => FormatCommand::CreateLink(value.unwrap_or_default().to_string()),
            "unlink" => FormatCommand::Unlink,
            "inserttext" => FormatCommand::InsertText(value.unwrap_or_default().to_string()),
            _ => FormatCommand::Other {
                name: name.into(),
                value: value.map(str::to_string),
            },
        }
    }

    /// The engine's command name.
    pub fn command_name(&self) -> &str {
        match self {
            FormatCommand::Bold => "bold",
            FormatCommand::Italic => "italic",
            FormatCommand::Underline => "underline",
            FormatCommand::Strikethrough => "strikeThrough",
            FormatCommand::ForeColor(_) => "foreColor",
            FormatCommand::BackColor(_) => "backColor",
            FormatCommand::RemoveFormat => "removeFormat",
            FormatCommand::Heading(_) | FormatCommand::Paragraph => "formatBlock",
            FormatCommand::JustifyLeft => "justifyLeft",
            FormatCommand::JustifyCenter => "justifyCenter",
            FormatCommand::JustifyRight => "justifyRight",
            FormatCommand::InsertOrderedList => "insertOrderedList",
            FormatCommand::InsertUnorderedList => "insertUnorderedList",
            FormatCommand::Undo => "undo",
            FormatCommand::Redo => "redo",
            FormatCommand::CreateLink(_) => "createLink",
            FormatCommand::Unlink => "unlink",
            FormatCommand::InsertText(_) => "insertText",
            FormatCommand::Other { name, .. } => name,
        }
    }

    /// The value argument passed alongside the command name.
    pub fn value(&self) -> Option<Cow<'_, str>> {
        match self {
            FormatCommand::ForeColor(c) | FormatCommand::BackColor(c) => {
                Some(Cow::Borrowed(c.as_str()))
            }
            FormatCommand::Heading(level) => Some(Cow::Owned(format!("<h{}>", level))),
            FormatCommand::Paragraph => Some(Cow::Borrowed("<p>")),
            FormatCommand::CreateLink(url) | FormatCommand::InsertText(url) => {
                Some(Cow::Borrowed(url.as_str()))
            }
            FormatCommand::Other { value, .. } => value.as_deref().map(Cow::Borrowed),
            _ => None,
        }
    }
}

/// Parse a `formatBlock` value such as `<h2>`, `h2` or `p`.
fn parse_block(value: &str) -> Option<FormatCommand> {
    let tag = value
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_ascii_lowercase();
    match tag.as_str() {
        "p" => Some(FormatCommand::Paragraph),
        _ => {
            let level: u8 = tag.strip_prefix('h')?.parse().ok()?;
            (1..=6).contains(&level).then_some(FormatCommand::Heading(level))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inline() {
        assert_eq!(FormatCommand::parse("bold", None), FormatCommand::Bold);
        assert_eq!(
            FormatCommand::parse("strikeThrough", None),
            FormatCommand::Strikethrough
        );
        assert_eq!(
            FormatCommand::parse("foreColor", Some("#ff6347")),
            FormatCommand::ForeColor("#ff6347".into())
        );
    }

    #[test]
    fn test_parse_format_block() {
        assert_eq!(
            FormatCommand::parse("formatBlock", Some("<h1>")),
            FormatCommand::Heading(1)
        );
        assert_eq!(
            FormatCommand::parse("formatBlock", Some("H3")),
            FormatCommand::Heading(3)
        );
        assert_eq!(
            FormatCommand::parse("formatBlock", Some("<p>")),
            FormatCommand::Paragraph
        );
        // Out of range level passes through untouched.
        assert!(matches!(
            FormatCommand::parse("formatBlock", Some("<h9>")),
            FormatCommand::Other { .. }
        ));
    }

    #[test]
    fn test_round_trip_names() {
        let cmd = FormatCommand::Heading(2);
        assert_eq!(cmd.command_name(), "formatBlock");
        assert_eq!(cmd.value().as_deref(), Some("<h2>"));

        let cmd = FormatCommand::parse("insertUnorderedList", None);
        assert_eq!(cmd.command_name(), "insertUnorderedList");
        assert_eq!(cmd.value(), None);
    }

    #[test]
    fn test_unknown_passthrough() {
        let cmd = FormatCommand::parse("superscript", Some("x"));
        assert_eq!(cmd.command_name(), "superscript");
        assert_eq!(cmd.value().as_deref(), Some("x"));
    }
}
