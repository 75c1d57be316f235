//! Application layer for Restyle.
//!
//! # Module Structure
//!
//! - `coordinator`: the session state machine owning the live document
//! - `shell`: request dispatcher for the control-panel shell
//! - `bootstrap`: default wiring on the on-disk stack
//! - `telemetry`: tracing subscriber setup

pub mod bootstrap;
pub mod coordinator;
pub mod shell;
pub mod telemetry;

pub use bootstrap::open_session;
pub use coordinator::{CONTROL_ROOT_ROLE, SessionCoordinator, SessionServices};
pub use shell::ShellDispatcher;
pub use telemetry::init_tracing;
