//! Selection-preserving command execution.
//!
//! Restore the snapshot, apply the native command, re-capture. The caller
//! owns change notification since it needs the serialized document.

use crate::actions::FormatCommand;
use crate::error::EditorError;
use crate::platform::{FormatPlatform, SelectionPlatform};
use crate::selection::{RestoreError, SelectionTracker};
use crate::types::SandboxId;

/// What happened to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// No snapshot for the current sandbox; nothing was touched.
    NoSelection,
    /// The snapshot could not be restored. The command was not applied.
    Aborted,
    /// The command ran. `accepted` is what the engine reported.
    Applied { accepted: bool },
}

impl CommandOutcome {
    /// Whether the document may have changed.
    pub fn mutated(self) -> bool {
        matches!(self, CommandOutcome::Applied { .. })
    }
}

/// Execute a formatting command against the tracked selection.
pub fn execute_command<P>(
    platform: &P,
    tracker: &mut SelectionTracker<P::Range>,
    sandbox: SandboxId,
    command: &FormatCommand,
) -> Result<CommandOutcome, EditorError>
where
    P: SelectionPlatform + FormatPlatform + ?Sized,
{
    match tracker.restore(platform, sandbox) {
        Ok(()) => {}
        Err(RestoreError::NoSnapshot | RestoreError::ForeignSandbox) => {
            return Ok(CommandOutcome::NoSelection);
        }
        Err(e @ RestoreError::Detached(_)) => {
            tracing::debug!(command = command.command_name(), "{}", e);
            tracker.clear();
            return Ok(CommandOutcome::Aborted);
        }
    }

    let value = command.value();
    let accepted = platform
        .apply_format_command(command.command_name(), value.as_deref())
        .map_err(EditorError::format_command)?;
    if !accepted {
        tracing::debug!(command = command.command_name(), "engine declined command");
    }

    tracker.recapture(platform);
    Ok(CommandOutcome::Applied { accepted })
}
