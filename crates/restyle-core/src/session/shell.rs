//! Message contract between the session coordinator and the control-panel
//! shell.
//!
//! Requests and responses are JSON objects tagged by `type`. Each request
//! belongs to a timeout class; the dispatcher enforces the budget.

use super::notice::Notice;
use super::state::{InteractionMode, SessionState};
use crate::config::TimeoutConfig;
use crate::error::RestyleError;
use crate::history::ChatRecord;
use crate::project::{ProjectSummary, SnapshotRef};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout budget a request runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    /// Local operations: selection toggles, queries, storage.
    Fast,
    /// Instruction submission, including the external round trip.
    Submit,
}

impl TimeoutClass {
    pub fn budget(self, config: &TimeoutConfig) -> Duration {
        match self {
            TimeoutClass::Fast => config.fast(),
            TimeoutClass::Submit => config.submit(),
        }
    }
}

/// A request from the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShellRequest {
    EnterSelectionMode,
    ExitSelectionMode,
    SelectionStatus,
    TargetInfo,
    SubmitInstruction { instruction: String },
    SetMode { mode: InteractionMode },
    SaveCredential { credential: String },
    ListProjects,
    CreateProject { name: String },
    RenameProject { id: String, name: String },
    DuplicateProject {
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
    DeleteProject { id: String },
    /// Saves into `id`, or into the active project when omitted.
    SaveProject {
        #[serde(default)]
        id: Option<String>,
    },
    SwitchProject { id: String },
    Discard,
    LoadHistory,
    ClearHistory,
    DismissNotice { id: String },
}

impl ShellRequest {
    /// Operation name used in logs.
    pub fn operation(&self) -> &'static str {
        match self {
            ShellRequest::EnterSelectionMode => "enter_selection_mode",
            ShellRequest::ExitSelectionMode => "exit_selection_mode",
            ShellRequest::SelectionStatus => "selection_status",
            ShellRequest::TargetInfo => "target_info",
            ShellRequest::SubmitInstruction { .. } => "submit_instruction",
            ShellRequest::SetMode { .. } => "set_mode",
            ShellRequest::SaveCredential { .. } => "save_credential",
            ShellRequest::ListProjects => "list_projects",
            ShellRequest::CreateProject { .. } => "create_project",
            ShellRequest::RenameProject { .. } => "rename_project",
            ShellRequest::DuplicateProject { .. } => "duplicate_project",
            ShellRequest::DeleteProject { .. } => "delete_project",
            ShellRequest::SaveProject { .. } => "save_project",
            ShellRequest::SwitchProject { .. } => "switch_project",
            ShellRequest::Discard => "discard",
            ShellRequest::LoadHistory => "load_history",
            ShellRequest::ClearHistory => "clear_history",
            ShellRequest::DismissNotice { .. } => "dismiss_notice",
        }
    }

    pub fn timeout_class(&self) -> TimeoutClass {
        match self {
            ShellRequest::SubmitInstruction { .. } => TimeoutClass::Submit,
            _ => TimeoutClass::Fast,
        }
    }
}

/// Snapshot of coordinator state for the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub mode: InteractionMode,
    pub selecting: bool,
    pub has_target: bool,
    pub active_project_id: Option<String>,
    /// Instruction kept after a failed request.
    pub draft: Option<String>,
    pub notices: Vec<Notice>,
}

/// Current target as reported to the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub tag: String,
    pub address: String,
    /// Whether the address still names exactly the target.
    pub resolves: bool,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub mode: InteractionMode,
    pub rationale: String,
    pub styles_applied: usize,
    pub skipped: Vec<String>,
    pub content_replaced: bool,
}

/// A response to the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShellResponse {
    Ack { state: SessionState },
    Status { status: SessionStatus },
    TargetInfo { info: Option<TargetInfo> },
    Submitted { outcome: SubmitOutcome },
    Projects { projects: Vec<ProjectSummary> },
    Project { project: ProjectSummary },
    Restored { restored: SnapshotRef },
    History { records: Vec<ChatRecord> },
    Error { code: String, message: String },
}

impl From<&RestyleError> for ShellResponse {
    fn from(err: &RestyleError) -> Self {
        ShellResponse::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let request: ShellRequest = serde_json::from_value(json!({
            "type": "submit_instruction",
            "instruction": "make it pop"
        }))
        .unwrap();
        assert_eq!(request.timeout_class(), TimeoutClass::Submit);
        assert_eq!(request.operation(), "submit_instruction");

        let request: ShellRequest =
            serde_json::from_value(json!({"type": "save_project"})).unwrap();
        assert_eq!(request, ShellRequest::SaveProject { id: None });
        assert_eq!(request.timeout_class(), TimeoutClass::Fast);

        let request: ShellRequest =
            serde_json::from_value(json!({"type": "set_mode", "mode": "chat"})).unwrap();
        assert_eq!(request, ShellRequest::SetMode { mode: InteractionMode::Chat });
    }

    #[test]
    fn test_error_response() {
        let response = ShellResponse::from(&RestyleError::RequestInFlight);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "type": "error",
                "code": "request_in_flight",
                "message": "A request is already in flight"
            })
        );
    }

    #[test]
    fn test_budgets() {
        let config = TimeoutConfig::default();
        assert_eq!(TimeoutClass::Fast.budget(&config), Duration::from_secs(5));
        assert_eq!(TimeoutClass::Submit.budget(&config), Duration::from_secs(60));
    }
}
