//! Session vocabulary shared by the coordinator and the shell.
//!
//! # Module Structure
//!
//! - `state`: `SessionState` and `InteractionMode`
//! - `notice`: dismissible operator notices
//! - `shell`: the shell request/response contract

mod notice;
pub mod shell;
mod state;

pub use notice::{Notice, NoticeSeverity};
pub use shell::{SessionStatus, ShellRequest, ShellResponse, SubmitOutcome, TargetInfo, TimeoutClass};
pub use state::{InteractionMode, SessionState};
