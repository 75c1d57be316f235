//! Session state machine vocabulary.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Coordinator state.
///
/// `Idle → AwaitingCredential → Ready ⇄ Selecting → Targeted → Requesting`,
/// with `Requesting` resolving back to `Ready` on success and to `Targeted`
/// (or `Ready` in chat mode) on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    /// Not yet activated on this document.
    Idle,
    /// Activated, but no credential is stored.
    AwaitingCredential,
    /// Waiting for the operator.
    Ready,
    /// Selection mode is active.
    Selecting,
    /// A target is committed.
    Targeted,
    /// A generative request is outstanding.
    Requesting,
}

impl SessionState {
    /// States in which an instruction may be submitted for `mode`.
    pub fn accepts_submit(self, mode: InteractionMode) -> bool {
        match mode {
            InteractionMode::Edit => self == SessionState::Targeted,
            InteractionMode::Chat => matches!(self, SessionState::Ready | SessionState::Targeted),
        }
    }

    /// States in which selection mode may be entered.
    pub fn accepts_selection(self) -> bool {
        matches!(
            self,
            SessionState::Ready | SessionState::Selecting | SessionState::Targeted
        )
    }
}

/// Edit applies patches to a target; chat asks questions without one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InteractionMode {
    #[default]
    Edit,
    Chat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_display_and_parse() {
        assert_eq!(SessionState::AwaitingCredential.to_string(), "awaiting_credential");
        assert_eq!(InteractionMode::from_str("chat").unwrap(), InteractionMode::Chat);
        assert_eq!(
            serde_json::to_string(&SessionState::Targeted).unwrap(),
            "\"targeted\""
        );
    }

    #[test]
    fn test_submit_guards() {
        assert!(SessionState::Targeted.accepts_submit(InteractionMode::Edit));
        assert!(!SessionState::Ready.accepts_submit(InteractionMode::Edit));
        assert!(SessionState::Ready.accepts_submit(InteractionMode::Chat));
        assert!(!SessionState::Requesting.accepts_submit(InteractionMode::Chat));
        assert!(!SessionState::AwaitingCredential.accepts_selection());
    }
}
