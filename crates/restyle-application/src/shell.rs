//! Dispatcher for control-panel shell requests.
//!
//! Every request runs under its timeout budget. Errors never escape: they are
//! turned into `ShellResponse::Error` with a stable code.

use crate::coordinator::SessionCoordinator;
use restyle_core::config::TimeoutConfig;
use restyle_core::session::{ShellRequest, ShellResponse, TimeoutClass};
use restyle_core::{RestyleError, Result};
use std::sync::Arc;

/// Routes [`ShellRequest`]s to a [`SessionCoordinator`].
#[derive(Clone)]
pub struct ShellDispatcher {
    coordinator: Arc<SessionCoordinator>,
    timeouts: TimeoutConfig,
}

impl ShellDispatcher {
    /// Uses the coordinator's configured budgets.
    pub fn new(coordinator: Arc<SessionCoordinator>) -> Self {
        let timeouts = coordinator.config().timeouts.clone();
        Self {
            coordinator,
            timeouts,
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Handles one request.
    pub async fn handle(&self, request: ShellRequest) -> ShellResponse {
        let operation = request.operation();
        let class = request.timeout_class();
        let budget = class.budget(&self.timeouts);
        tracing::debug!("[Shell] {} (budget {:?})", operation, budget);

        let result = match tokio::time::timeout(budget, self.route(request)).await {
            Ok(result) => result,
            Err(_) => {
                let err = RestyleError::TransportTimeout {
                    elapsed_ms: budget.as_millis() as u64,
                };
                if class == TimeoutClass::Submit {
                    self.coordinator.abandon_request(&err).await;
                }
                Err(err)
            }
        };

        result.unwrap_or_else(|e| {
            tracing::warn!("[Shell] {} failed: {}", operation, e);
            ShellResponse::from(&e)
        })
    }

    /// Handles a request in wire form.
    ///
    /// A request that does not decode is answered with a `serialization` error.
    pub async fn handle_json(&self, request: serde_json::Value) -> serde_json::Value {
        let response = match serde_json::from_value::<ShellRequest>(request) {
            Ok(request) => self.handle(request).await,
            Err(e) => ShellResponse::from(&RestyleError::from(e)),
        };
        serde_json::to_value(&response).unwrap_or_else(|e| {
            serde_json::json!({ "type": "error", "code": "serialization", "message": e.to_string() })
        })
    }

    async fn route(&self, request: ShellRequest) -> Result<ShellResponse> {
        let c = &self.coordinator;
        let response = match request {
            ShellRequest::EnterSelectionMode => ShellResponse::Ack {
                state: c.enter_selection_mode().await?,
            },
            ShellRequest::ExitSelectionMode => ShellResponse::Ack {
                state: c.exit_selection_mode().await?,
            },
            ShellRequest::SelectionStatus => ShellResponse::Status {
                status: c.selection_status().await?,
            },
            ShellRequest::TargetInfo => ShellResponse::TargetInfo {
                info: c.target_info().await,
            },
            ShellRequest::SubmitInstruction { instruction } => ShellResponse::Submitted {
                outcome: c.submit(&instruction).await?,
            },
            ShellRequest::SetMode { mode } => ShellResponse::Ack {
                state: c.set_mode(mode).await?,
            },
            ShellRequest::SaveCredential { credential } => ShellResponse::Ack {
                state: c.save_credential(&credential).await?,
            },
            ShellRequest::ListProjects => ShellResponse::Projects {
                projects: c.list_projects().await?,
            },
            ShellRequest::CreateProject { name } => ShellResponse::Project {
                project: c.create_project(&name).await?,
            },
            ShellRequest::RenameProject { id, name } => ShellResponse::Project {
                project: c.rename_project(&id, &name).await?,
            },
            ShellRequest::DuplicateProject { id, name } => ShellResponse::Project {
                project: c.duplicate_project(&id, name.as_deref()).await?,
            },
            ShellRequest::DeleteProject { id } => {
                c.delete_project(&id).await?;
                ShellResponse::Projects {
                    projects: c.list_projects().await?,
                }
            }
            ShellRequest::SaveProject { id } => ShellResponse::Project {
                project: c.save_project(id.as_deref()).await?,
            },
            ShellRequest::SwitchProject { id } => ShellResponse::Restored {
                restored: c.switch_project(&id).await?,
            },
            ShellRequest::Discard => ShellResponse::Restored {
                restored: c.discard().await?,
            },
            ShellRequest::LoadHistory => ShellResponse::History {
                records: c.restore_history().await,
            },
            ShellRequest::ClearHistory => {
                c.clear_history().await?;
                ShellResponse::History { records: Vec::new() }
            }
            ShellRequest::DismissNotice { id } => {
                c.dismiss_notice(&id).await?;
                ShellResponse::Status {
                    status: c.selection_status().await?,
                }
            }
        };
        Ok(response)
    }
}
