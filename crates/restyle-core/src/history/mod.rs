//! Per-origin interaction history.

mod log;
mod model;

pub use log::{DEFAULT_HISTORY_CAP, HistoryLog};
pub use model::{ChatRecord, ChatRole};
