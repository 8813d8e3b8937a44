//! Seam to the hosting editor.
//!
//! The controller never touches the editor directly; it issues named
//! commands through [`NotebookHost`] and asks for execution state. The
//! production implementation is the HTTP bridge; tests script their own.

pub mod bridge;

use anyhow::Result;
use async_trait::async_trait;

/// Commands the workflow issues to the hosting editor. `id` is the host's
/// own command identifier, forwarded over the wire untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    FocusFirstEditorGroup,
    FocusNotebookTop,
    ExecuteAllCells,
    ClearAllCellOutputs,
    RestartRuntime,
}

impl HostCommand {
    pub fn id(self) -> &'static str {
        match self {
            HostCommand::FocusFirstEditorGroup => "workbench.action.focusFirstEditorGroup",
            HostCommand::FocusNotebookTop => "notebook.focusTop",
            HostCommand::ExecuteAllCells => "notebook.execute",
            HostCommand::ClearAllCellOutputs => "notebook.clearAllCellsOutputs",
            HostCommand::RestartRuntime => "jupyter.restartkernel",
        }
    }
}

/// What the host reports about notebook execution right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Busy,
    /// The host cannot say. Callers fall back to their fixed cooldown.
    Unknown,
}

/// Dispatch acknowledges that the host accepted a command; it never waits
/// for the underlying action to finish. Execution is fire-and-forget.
#[async_trait]
pub trait NotebookHost: Send + Sync {
    async fn dispatch(&mut self, command: HostCommand) -> Result<()>;
    async fn execution_state(&mut self) -> Result<ExecutionState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_ids_match_the_editor() {
        assert_eq!(
            HostCommand::FocusFirstEditorGroup.id(),
            "workbench.action.focusFirstEditorGroup"
        );
        assert_eq!(HostCommand::FocusNotebookTop.id(), "notebook.focusTop");
        assert_eq!(HostCommand::ExecuteAllCells.id(), "notebook.execute");
        assert_eq!(HostCommand::ClearAllCellOutputs.id(), "notebook.clearAllCellsOutputs");
        assert_eq!(HostCommand::RestartRuntime.id(), "jupyter.restartkernel");
    }
}
