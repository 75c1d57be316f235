//! Session coordinator: the state machine that owns one live document.

use restyle_core::config::EngineConfig;
use restyle_core::context::ContextSnapshot;
use restyle_core::dom::{CONTROL_SURFACE_ATTR, Document, NodeId};
use restyle_core::generative::{GenerativeService, PatchRequest};
use restyle_core::history::{ChatRecord, HistoryLog};
use restyle_core::patch::{Patch, apply_patch};
use restyle_core::project::{ProjectSummary, SnapshotRef, VersionStore};
use restyle_core::secret::{Credential, CredentialStore};
use restyle_core::session::{
    InteractionMode, Notice, NoticeSeverity, SessionState, SessionStatus, SubmitOutcome, TargetInfo,
};
use restyle_core::storage::KeyValueStore;
use restyle_core::target::{LayoutProbe, NoLayout, Target, TargetRef, TargetResolver, resolve_address};
use restyle_core::{OriginKey, RestyleError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Role of the control-surface root mounted into the body.
pub const CONTROL_ROOT_ROLE: &str = "root";

/// Collaborators the coordinator calls into.
pub struct SessionServices {
    pub store: Arc<dyn KeyValueStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub generative: Arc<dyn GenerativeService>,
    pub layout: Arc<dyn LayoutProbe>,
}

impl SessionServices {
    /// Services with no layout information.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        credentials: Arc<dyn CredentialStore>,
        generative: Arc<dyn GenerativeService>,
    ) -> Self {
        Self {
            store,
            credentials,
            generative,
            layout: Arc::new(NoLayout),
        }
    }

    pub fn with_layout(mut self, layout: Arc<dyn LayoutProbe>) -> Self {
        self.layout = layout;
        self
    }
}

/// Mutable session state, guarded by the coordinator's mutex.
struct SessionInner {
    document: Document,
    resolver: TargetResolver,
    target: Option<Target>,
    state: SessionState,
    mode: InteractionMode,
    credential: Option<Credential>,
    notices: Vec<Notice>,
    draft: Option<String>,
    /// State to fall back to if the outstanding request is abandoned.
    pending: Option<PendingRequest>,
}

/// Version-store operations that replace the body content.
enum BodyRewrite {
    Switch(SnapshotRef),
    Discard,
}

impl BodyRewrite {
    fn operation(&self) -> &'static str {
        match self {
            BodyRewrite::Switch(_) => "switch_project",
            BodyRewrite::Discard => "discard",
        }
    }
}

struct PendingRequest {
    instruction: String,
    fallback: SessionState,
}

impl SessionInner {
    /// State to settle in when no request or selection is running.
    fn resting_state(&self) -> SessionState {
        if self.target.is_some() {
            SessionState::Targeted
        } else {
            SessionState::Ready
        }
    }

    fn ensure_activated(&self, operation: &str) -> Result<()> {
        match self.state {
            SessionState::Idle => Err(RestyleError::invalid_state(self.state, operation)),
            _ => Ok(()),
        }
    }

    fn drop_target(&mut self) {
        self.target = None;
        self.resolver.clear_selection(&mut self.document);
    }

    fn notify(&mut self, severity: NoticeSeverity, message: impl Into<String>) {
        let notice = Notice::new(severity, message);
        tracing::debug!("[Coordinator] Notice {}: {}", notice.id, notice.message);
        self.notices.push(notice);
    }
}

/// Clears an [`AtomicBool`] when dropped, so a cancelled future never leaves
/// its flag set.
struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| FlagGuard(flag))
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns one live document and drives every component that touches it.
///
/// `SessionCoordinator` is responsible for:
/// - The session state machine (`Idle` through `Requesting`)
/// - Being the only caller of the generative service
/// - Writing the history log and triggering version-store operations
/// - Keeping patch application and project switches from overlapping
///
/// # Concurrency
///
/// All document access goes through one async mutex. The generative call runs
/// outside the lock; the `in_flight` flag keeps a second submission from
/// reaching the service, and the `switching` flag keeps switch/discard from
/// rewriting the body while a request is outstanding (and vice versa).
pub struct SessionCoordinator {
    origin: OriginKey,
    config: EngineConfig,
    versions: VersionStore,
    history: HistoryLog,
    credentials: Arc<dyn CredentialStore>,
    generative: Arc<dyn GenerativeService>,
    inner: Mutex<SessionInner>,
    in_flight: AtomicBool,
    switching: AtomicBool,
}

impl SessionCoordinator {
    /// Creates an idle coordinator for `document` served from `origin`.
    ///
    /// # Arguments
    ///
    /// * `origin` - Storage partition for projects and history
    /// * `document` - The live document; the coordinator owns it from now on
    /// * `config` - Engine limits and budgets
    /// * `services` - Store, credential store, generative service, layout probe
    pub fn new(origin: OriginKey, document: Document, config: EngineConfig, services: SessionServices) -> Self {
        let history = HistoryLog::with_cap(services.store.clone(), config.history_cap);
        Self {
            origin,
            versions: VersionStore::new(services.store),
            history,
            credentials: services.credentials,
            generative: services.generative,
            inner: Mutex::new(SessionInner {
                document,
                resolver: TargetResolver::new(services.layout),
                target: None,
                state: SessionState::Idle,
                mode: InteractionMode::default(),
                credential: None,
                notices: Vec::new(),
                draft: None,
                pending: None,
            }),
            config,
            in_flight: AtomicBool::new(false),
            switching: AtomicBool::new(false),
        }
    }

    pub fn origin(&self) -> &OriginKey {
        &self.origin
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Runs `f` against the live document.
    pub async fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.inner.lock().await.document)
    }

    // ============================================================================
    // Activation and credential
    // ============================================================================

    /// First activation on this document.
    ///
    /// Mounts the control root, captures the baseline if the origin has none,
    /// restores the active project and checks for a stored credential.
    /// Calling it again only reports the current state.
    ///
    /// # Returns
    ///
    /// `Ready`, or `AwaitingCredential` when no credential is stored.
    pub async fn activate(&self) -> Result<SessionState> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Idle {
            return Ok(inner.state);
        }

        mount_control_root(&mut inner.document)?;
        if self.versions.ensure_baseline(&self.origin, &inner.document).await? {
            tracing::info!("[Coordinator] First run on {}", self.origin);
        }

        if let Some(id) = self.versions.active_project(&self.origin).await? {
            let restore = self
                .versions
                .switch_to(&self.origin, &SnapshotRef::Project(id.clone()), &mut inner.document)
                .await;
            if let Err(e) = restore {
                tracing::warn!("[Coordinator] Could not restore active project {}: {}", id, e);
            }
        }

        inner.credential = self.credentials.load().await?;
        inner.state = if inner.credential.is_some() {
            SessionState::Ready
        } else {
            SessionState::AwaitingCredential
        };
        tracing::info!("[Coordinator] Activated on {} ({})", self.origin, inner.state);
        Ok(inner.state)
    }

    /// Validates (format only) and stores the credential.
    ///
    /// # Errors
    ///
    /// - `RestyleError::Config` when the format is wrong
    /// - `RestyleError::InvalidState` before activation
    pub async fn save_credential(&self, raw: &str) -> Result<SessionState> {
        let credential = Credential::parse(raw)?;
        let mut inner = self.inner.lock().await;
        inner.ensure_activated("save_credential")?;
        self.credentials.save(&credential).await?;
        inner.credential = Some(credential);
        if inner.state == SessionState::AwaitingCredential {
            inner.state = SessionState::Ready;
        }
        tracing::info!("[Coordinator] Credential stored");
        Ok(inner.state)
    }

    // ============================================================================
    // Selection
    // ============================================================================

    /// Hands pointer control to the target resolver.
    pub async fn enter_selection_mode(&self) -> Result<SessionState> {
        let mut inner = self.inner.lock().await;
        if !inner.state.accepts_selection() {
            return Err(RestyleError::invalid_state(inner.state, "enter_selection_mode"));
        }
        let inner = &mut *inner;
        inner.resolver.enter_selection_mode(&mut inner.document)?;
        inner.state = SessionState::Selecting;
        Ok(inner.state)
    }

    /// Leaves selection mode, keeping any committed target.
    pub async fn exit_selection_mode(&self) -> Result<SessionState> {
        let mut inner = self.inner.lock().await;
        if inner.state == SessionState::Selecting {
            let inner = &mut *inner;
            inner.resolver.exit_selection_mode(&mut inner.document);
            inner.state = inner.resting_state();
        }
        Ok(inner.state)
    }

    /// Pointer moved over `node`. Returns whether it was outlined.
    pub async fn pointer_over(&self, node: NodeId) -> bool {
        let mut inner = self.inner.lock().await;
        let inner = &mut *inner;
        inner.resolver.on_hover(&mut inner.document, node)
    }

    /// Pointer left the outlined node.
    pub async fn pointer_out(&self) {
        let mut inner = self.inner.lock().await;
        let inner = &mut *inner;
        inner.resolver.on_hover_out(&mut inner.document);
    }

    /// Click on `node` while selecting. A committed node replaces any
    /// previous target.
    ///
    /// # Errors
    ///
    /// - `RestyleError::InvalidState` when not selecting
    /// - `RestyleError::UnsafeTarget` for protected nodes; selection stays active
    pub async fn commit(&self, node: NodeId) -> Result<TargetInfo> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Selecting {
            return Err(RestyleError::invalid_state(inner.state, "commit"));
        }
        let inner = &mut *inner;
        let target = inner.resolver.on_commit(&mut inner.document, node)?;
        let info = TargetInfo {
            tag: target.tag().to_string(),
            address: target.address().to_string(),
            resolves: true,
        };
        inner.target = Some(target);
        inner.state = SessionState::Targeted;
        Ok(info)
    }

    /// Scroll or resize: keeps the selected outline on its node.
    pub async fn viewport_changed(&self) {
        let mut inner = self.inner.lock().await;
        let inner = &mut *inner;
        inner.resolver.on_viewport_change(&mut inner.document);
    }

    /// Drops the committed target.
    pub async fn clear_target(&self) -> Result<SessionState> {
        let mut inner = self.inner.lock().await;
        if inner.state == SessionState::Requesting {
            return Err(RestyleError::invalid_state(inner.state, "clear_target"));
        }
        inner.drop_target();
        if inner.state == SessionState::Targeted {
            inner.state = SessionState::Ready;
        }
        Ok(inner.state)
    }

    pub async fn status(&self) -> SessionStatus {
        let inner = self.inner.lock().await;
        SessionStatus {
            state: inner.state,
            mode: inner.mode,
            selecting: inner.resolver.is_active(),
            has_target: inner.target.is_some(),
            active_project_id: None,
            draft: inner.draft.clone(),
            notices: inner.notices.clone(),
        }
    }

    /// Status including the active project, which needs a store read.
    pub async fn selection_status(&self) -> Result<SessionStatus> {
        let mut status = self.status().await;
        status.active_project_id = self.versions.active_project(&self.origin).await?;
        Ok(status)
    }

    /// Current target, with whether its address still names exactly that node.
    pub async fn target_info(&self) -> Option<TargetInfo> {
        let inner = self.inner.lock().await;
        let target = inner.target.as_ref()?;
        let resolves = match resolve_address(&inner.document, target.address()) {
            Ok(node) => node == target.node(),
            Err(e) => {
                tracing::debug!("[Coordinator] Target address no longer resolves: {}", e);
                false
            }
        };
        Some(TargetInfo {
            tag: target.tag().to_string(),
            address: target.address().to_string(),
            resolves,
        })
    }

    /// Switches between edit and chat.
    pub async fn set_mode(&self, mode: InteractionMode) -> Result<SessionState> {
        let mut inner = self.inner.lock().await;
        if inner.state == SessionState::Requesting {
            return Err(RestyleError::invalid_state(inner.state, "set_mode"));
        }
        inner.mode = mode;
        tracing::info!("[Coordinator] Mode set to {}", mode);
        Ok(inner.state)
    }

    // ============================================================================
    // Submission
    // ============================================================================

    /// Sends `instruction` to the generative service and applies the result.
    ///
    /// In edit mode the patch lands on the committed target, which is then
    /// cleared. In chat mode only the rationale is reported. Both turns are
    /// appended to the history log on success.
    ///
    /// # Errors
    ///
    /// - `RestyleError::RequestInFlight` when a request is already outstanding;
    ///   the service is not contacted
    /// - `RestyleError::SwitchInProgress` while a switch or discard runs
    /// - `RestyleError::InvalidState` when the state does not accept a submission
    /// - `RestyleError::CredentialMissing`, transport and validation errors; these
    ///   also raise a notice and keep the instruction as the draft
    pub async fn submit(&self, instruction: &str) -> Result<SubmitOutcome> {
        let Some(_flight) = FlagGuard::try_acquire(&self.in_flight) else {
            tracing::warn!("[Coordinator] Rejected submission: request already in flight");
            return Err(RestyleError::RequestInFlight);
        };
        if self.switching.load(Ordering::SeqCst) {
            return Err(RestyleError::SwitchInProgress);
        }

        let (mode, credential, target, request) = {
            let mut inner = self.inner.lock().await;
            inner.ensure_activated("submit_instruction")?;
            let Some(credential) = inner.credential.clone() else {
                inner.draft = Some(instruction.to_string());
                inner.notify(NoticeSeverity::Error, RestyleError::CredentialMissing.to_string());
                return Err(RestyleError::CredentialMissing);
            };
            let mode = inner.mode;
            if !inner.state.accepts_submit(mode) {
                return Err(RestyleError::invalid_state(inner.state, "submit_instruction"));
            }
            if instruction.trim().is_empty() {
                return Err(RestyleError::invalid_state(inner.state, "submit_instruction (empty instruction)"));
            }

            let target = match mode {
                InteractionMode::Edit => inner.target.clone(),
                InteractionMode::Chat => None,
            };
            let context = target
                .as_ref()
                .map(|t| ContextSnapshot::capture(&inner.document, t, &self.config.snapshot));

            inner.pending = Some(PendingRequest {
                instruction: instruction.to_string(),
                fallback: inner.state,
            });
            inner.state = SessionState::Requesting;
            let request = PatchRequest {
                instruction: instruction.to_string(),
                context,
            };
            (mode, credential, target, request)
        };

        tracing::info!("[Coordinator] Submitting {} instruction", mode);
        let response = self.generative.request_patch(&credential, &request).await;

        let mut inner = self.inner.lock().await;
        let fallback = inner
            .pending
            .take()
            .map(|p| p.fallback)
            .unwrap_or_else(|| inner.resting_state());

        let applied = response.and_then(|response| {
            let patch = Patch::from(response);
            let outcome = match (&target, mode) {
                (Some(target), InteractionMode::Edit) => {
                    Some(apply_patch(&mut inner.document, target.node(), &patch)?)
                }
                _ => None,
            };
            Ok((patch, outcome))
        });

        let (patch, outcome) = match applied {
            Ok(applied) => applied,
            Err(e) => {
                tracing::warn!("[Coordinator] Request failed: {}", e);
                inner.state = fallback;
                inner.draft = Some(instruction.to_string());
                if e.is_operator_notice() {
                    inner.notify(NoticeSeverity::Error, e.to_string());
                }
                return Err(e);
            }
        };

        let target_ref = target.as_ref().map(Target::to_ref);
        inner.draft = None;
        if mode == InteractionMode::Edit {
            inner.drop_target();
            inner.state = SessionState::Ready;
            if outcome.as_ref().is_some_and(|o| o.content_replaced()) {
                // The replaced target was the last handle into the old subtree.
                let inner = &mut *inner;
                inner.resolver.reset(&mut inner.document);
                inner.document.compact();
            }
        } else {
            inner.state = fallback;
        }
        drop(inner);

        self.log_turn(instruction, mode, target_ref, &patch).await;

        let outcome = outcome.unwrap_or_default();
        Ok(SubmitOutcome {
            mode,
            rationale: patch.rationale,
            styles_applied: outcome.styles_applied,
            skipped: outcome.skipped,
            content_replaced: !outcome.replacement.is_empty(),
        })
    }

    /// Puts the session back after the shell gave up waiting on a submission.
    ///
    /// The dropped submission future already released the in-flight flag;
    /// this restores the pre-request state, keeps the draft and raises a notice.
    pub async fn abandon_request(&self, error: &RestyleError) {
        let mut inner = self.inner.lock().await;
        let Some(pending) = inner.pending.take() else {
            return;
        };
        if inner.state == SessionState::Requesting {
            inner.state = pending.fallback;
        }
        inner.draft = Some(pending.instruction);
        inner.notify(NoticeSeverity::Error, error.to_string());
        tracing::warn!("[Coordinator] Abandoned request: {}", error);
    }

    async fn log_turn(&self, instruction: &str, mode: InteractionMode, target: Option<TargetRef>, patch: &Patch) {
        let records = [
            ChatRecord::operator(instruction, mode, target.clone()),
            ChatRecord::system(
                patch.rationale.clone(),
                mode,
                target,
                patch.has_changes().then(|| patch.clone()),
            ),
        ];
        for record in records {
            if let Err(e) = self.history.append(&self.origin, record).await {
                tracing::warn!("[Coordinator] Failed to log history: {}", e);
            }
        }
    }

    // ============================================================================
    // Projects
    // ============================================================================

    pub async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        self.versions.list_projects(&self.origin).await
    }

    /// Creates an unsaved project. It shows the baseline until first saved.
    pub async fn create_project(&self, name: &str) -> Result<ProjectSummary> {
        let project = self.versions.create_project(&self.origin, name, None).await?;
        self.summary(&project.id).await
    }

    pub async fn rename_project(&self, id: &str, name: &str) -> Result<ProjectSummary> {
        let project = self.versions.rename_project(&self.origin, id, name).await?;
        self.summary(&project.id).await
    }

    /// Copies project `id` (or the baseline) into a new project.
    pub async fn duplicate_project(&self, id: &str, name: Option<&str>) -> Result<ProjectSummary> {
        let project = self
            .versions
            .duplicate_project(&self.origin, &SnapshotRef::from_id(id), name)
            .await?;
        self.summary(&project.id).await
    }

    pub async fn delete_project(&self, id: &str) -> Result<()> {
        self.versions.delete_project(&self.origin, id).await
    }

    /// Saves the live document into `id`, or into the active project.
    ///
    /// # Errors
    ///
    /// `RestyleError::BaselineImmutable` when no project is named or active.
    pub async fn save_project(&self, id: Option<&str>) -> Result<ProjectSummary> {
        let id = match id {
            Some(id) => id.to_string(),
            None => self
                .versions
                .active_project(&self.origin)
                .await?
                .ok_or(RestyleError::BaselineImmutable)?,
        };
        let inner = self.inner.lock().await;
        inner.ensure_activated("save_project")?;
        self.versions.save(&self.origin, &id, &inner.document).await?;
        drop(inner);
        self.summary(&id).await
    }

    /// Replaces the body with project `id` (or the baseline) and makes it active.
    ///
    /// # Errors
    ///
    /// `RestyleError::RequestInFlight` while a submission is outstanding.
    pub async fn switch_project(&self, id: &str) -> Result<SnapshotRef> {
        self.rewrite_body(BodyRewrite::Switch(SnapshotRef::from_id(id))).await
    }

    /// Reverts the body to the active project's last save, or to the baseline.
    pub async fn discard(&self) -> Result<SnapshotRef> {
        self.rewrite_body(BodyRewrite::Discard).await
    }

    /// Runs a body-replacing version-store operation under the switch guard.
    ///
    /// Node handles into the old body die with it, so the target, selection
    /// mode and outlines are all dropped first.
    async fn rewrite_body(&self, rewrite: BodyRewrite) -> Result<SnapshotRef> {
        let Some(_switch) = FlagGuard::try_acquire(&self.switching) else {
            return Err(RestyleError::SwitchInProgress);
        };
        if self.in_flight.load(Ordering::SeqCst) {
            return Err(RestyleError::RequestInFlight);
        }

        let mut inner = self.inner.lock().await;
        inner.ensure_activated(rewrite.operation())?;
        let inner = &mut *inner;
        inner.resolver.reset(&mut inner.document);
        inner.target = None;
        if matches!(inner.state, SessionState::Selecting | SessionState::Targeted) {
            inner.state = SessionState::Ready;
        }

        let restored = match rewrite {
            BodyRewrite::Switch(target) => {
                self.versions
                    .switch_to(&self.origin, &target, &mut inner.document)
                    .await?;
                target
            }
            BodyRewrite::Discard => self.versions.discard(&self.origin, &mut inner.document).await?,
        };
        mount_control_root(&mut inner.document)?;
        tracing::info!("[Coordinator] Body now shows {}", restored);
        Ok(restored)
    }

    async fn summary(&self, id: &str) -> Result<ProjectSummary> {
        self.versions
            .list_projects(&self.origin)
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| RestyleError::not_found("Project", id))
    }

    // ============================================================================
    // History and notices
    // ============================================================================

    /// The origin's chat log, oldest first. Read failures yield an empty log.
    pub async fn restore_history(&self) -> Vec<ChatRecord> {
        self.history.load(&self.origin).await
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.history.clear(&self.origin).await
    }

    /// Removes a notice.
    ///
    /// # Errors
    ///
    /// `RestyleError::NotFound` when no notice has that id.
    pub async fn dismiss_notice(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let before = inner.notices.len();
        inner.notices.retain(|n| n.id != id);
        if inner.notices.len() == before {
            return Err(RestyleError::not_found("Notice", id));
        }
        Ok(())
    }
}

/// Appends the control root to the body unless it is already there.
fn mount_control_root(doc: &mut Document) -> Result<NodeId> {
    if let Some(root) = doc.control_element(CONTROL_ROOT_ROLE) {
        return Ok(root);
    }
    let body = doc
        .body()
        .ok_or_else(|| RestyleError::internal("document has no body"))?;
    let root = doc.create_element("div");
    doc.set_attr(root, CONTROL_SURFACE_ATTR, CONTROL_ROOT_ROLE);
    doc.append_child(body, root);
    Ok(root)
}
