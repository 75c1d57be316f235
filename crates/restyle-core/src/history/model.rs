//! Chat record types.

use crate::patch::Patch;
use crate::session::InteractionMode;
use crate::target::TargetRef;
use serde::{Deserialize, Serialize};

/// Who produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The human operating the editor.
    Operator,
    /// The engine, reporting a service answer or outcome.
    System,
}

/// One interaction turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    /// Unique record identifier (UUID format)
    pub id: String,
    /// Creation time (RFC 3339)
    pub timestamp: String,
    pub role: ChatRole,
    pub text: String,
    pub mode: InteractionMode,
    #[serde(default)]
    pub target_ref: Option<TargetRef>,
    #[serde(default)]
    pub patch: Option<Patch>,
}

impl ChatRecord {
    fn new(role: ChatRole, text: impl Into<String>, mode: InteractionMode) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            role,
            text: text.into(),
            mode,
            target_ref: None,
            patch: None,
        }
    }

    /// An instruction or question typed by the operator.
    pub fn operator(text: impl Into<String>, mode: InteractionMode, target: Option<TargetRef>) -> Self {
        Self {
            target_ref: target,
            ..Self::new(ChatRole::Operator, text, mode)
        }
    }

    /// The engine's answer, with the applied patch when there was one.
    pub fn system(
        text: impl Into<String>,
        mode: InteractionMode,
        target: Option<TargetRef>,
        patch: Option<Patch>,
    ) -> Self {
        Self {
            target_ref: target,
            patch,
            ..Self::new(ChatRole::System, text, mode)
        }
    }
}
