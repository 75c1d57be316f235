//! Per-origin snapshot and project management.

use super::model::{BASELINE_ID, DocumentSnapshot, Project, ProjectSummary, SiteRecord, SnapshotRef};
use crate::dom::Document;
use crate::error::{RestyleError, Result};
use crate::origin::OriginKey;
use crate::storage::{KeyValueStore, load_json, store_json};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Durable per-origin store of the baseline and named projects.
///
/// `VersionStore` is responsible for:
/// - Capturing the baseline once per origin
/// - Project CRUD (create, rename, duplicate, delete, save)
/// - Restoring a snapshot into the live body on switch or discard
/// - Tracking the active project
///
/// Every write reads the origin's [`SiteRecord`], changes it and writes it
/// back while holding `write_lock`, so concurrent operations on one store
/// never lose each other's changes.
pub struct VersionStore {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl VersionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    async fn load_record(&self, origin: &OriginKey) -> Result<SiteRecord> {
        Ok(load_json(self.store.as_ref(), &origin.site_key())
            .await?
            .unwrap_or_default())
    }

    async fn save_record(&self, origin: &OriginKey, record: &SiteRecord) -> Result<()> {
        store_json(self.store.as_ref(), &origin.site_key(), record).await
    }

    // ============================================================================
    // Baseline
    // ============================================================================

    /// Captures the baseline for `origin` from `doc` unless one exists.
    ///
    /// # Returns
    ///
    /// `true` when a baseline was captured by this call.
    pub async fn ensure_baseline(&self, origin: &OriginKey, doc: &Document) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_record(origin).await?;
        if record.baseline.is_some() {
            return Ok(false);
        }
        record.baseline = Some(DocumentSnapshot::capture(doc));
        self.save_record(origin, &record).await?;
        tracing::info!("[VersionStore] Captured baseline for {}", origin);
        Ok(true)
    }

    pub async fn baseline(&self, origin: &OriginKey) -> Result<Option<DocumentSnapshot>> {
        Ok(self.load_record(origin).await?.baseline)
    }

    // ============================================================================
    // Projects
    // ============================================================================

    /// Lists projects in creation order with active/saved flags.
    pub async fn list_projects(&self, origin: &OriginKey) -> Result<Vec<ProjectSummary>> {
        let record = self.load_record(origin).await?;
        let active = record.active_project_id.as_deref();
        Ok(record
            .projects
            .iter()
            .map(|p| ProjectSummary::new(p, active))
            .collect())
    }

    pub async fn get_project(&self, origin: &OriginKey, id: &str) -> Result<Project> {
        let record = self.load_record(origin).await?;
        record
            .project(id)
            .cloned()
            .ok_or_else(|| RestyleError::not_found("Project", id))
    }

    /// Creates a project. `snapshot` is `None` for an unsaved project that
    /// shows the baseline until first saved.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name; blank names get a generated one
    /// * `snapshot` - Initial document snapshot, if any
    pub async fn create_project(
        &self,
        origin: &OriginKey,
        name: &str,
        snapshot: Option<DocumentSnapshot>,
    ) -> Result<Project> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_record(origin).await?;
        let now = chrono::Utc::now().to_rfc3339();
        let project = Project {
            id: new_project_id(&record),
            name: display_name(name, &record),
            document_snapshot: snapshot,
            created_at: now.clone(),
            updated_at: now,
            duplicated_from: None,
        };
        record.projects.push(project.clone());
        self.save_record(origin, &record).await?;
        tracing::info!("[VersionStore] Created project '{}' ({})", project.name, project.id);
        Ok(project)
    }

    pub async fn rename_project(&self, origin: &OriginKey, id: &str, name: &str) -> Result<Project> {
        if id == BASELINE_ID {
            return Err(RestyleError::BaselineImmutable);
        }
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_record(origin).await?;
        let fallback = display_name(name, &record);
        let project = record
            .project_mut(id)
            .ok_or_else(|| RestyleError::not_found("Project", id))?;
        project.name = fallback;
        project.updated_at = chrono::Utc::now().to_rfc3339();
        let renamed = project.clone();
        self.save_record(origin, &record).await?;
        tracing::info!("[VersionStore] Renamed project {} to '{}'", id, renamed.name);
        Ok(renamed)
    }

    /// Copies a project (or the baseline) into a new project.
    pub async fn duplicate_project(
        &self,
        origin: &OriginKey,
        source: &SnapshotRef,
        name: Option<&str>,
    ) -> Result<Project> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_record(origin).await?;
        let (source_name, snapshot) = match source {
            SnapshotRef::Baseline => ("Baseline".to_string(), record.baseline.clone()),
            SnapshotRef::Project(id) => {
                let project = record
                    .project(id)
                    .ok_or_else(|| RestyleError::not_found("Project", id.as_str()))?;
                (project.name.clone(), project.document_snapshot.clone())
            }
        };
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} (copy)", source_name));

        let now = chrono::Utc::now().to_rfc3339();
        let project = Project {
            id: new_project_id(&record),
            name,
            document_snapshot: snapshot,
            created_at: now.clone(),
            updated_at: now,
            duplicated_from: Some(match source {
                SnapshotRef::Baseline => BASELINE_ID.to_string(),
                SnapshotRef::Project(id) => id.clone(),
            }),
        };
        record.projects.push(project.clone());
        self.save_record(origin, &record).await?;
        tracing::info!("[VersionStore] Duplicated {} into '{}'", source, project.name);
        Ok(project)
    }

    /// Deletes a project. Deleting the active project makes the baseline active.
    pub async fn delete_project(&self, origin: &OriginKey, id: &str) -> Result<()> {
        if id == BASELINE_ID {
            return Err(RestyleError::BaselineImmutable);
        }
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_record(origin).await?;
        let before = record.projects.len();
        record.projects.retain(|p| p.id != id);
        if record.projects.len() == before {
            return Err(RestyleError::not_found("Project", id));
        }
        if record.active_project_id.as_deref() == Some(id) {
            record.active_project_id = None;
        }
        self.save_record(origin, &record).await?;
        tracing::info!("[VersionStore] Deleted project {}", id);
        Ok(())
    }

    /// Saves the live document (control surface stripped) into project `id`.
    ///
    /// # Errors
    ///
    /// - `RestyleError::BaselineImmutable` when `id` names the baseline
    /// - `RestyleError::NotFound` when the project does not exist
    pub async fn save(&self, origin: &OriginKey, id: &str, doc: &Document) -> Result<Project> {
        if id == BASELINE_ID {
            return Err(RestyleError::BaselineImmutable);
        }
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_record(origin).await?;
        let project = record
            .project_mut(id)
            .ok_or_else(|| RestyleError::not_found("Project", id))?;
        let snapshot = DocumentSnapshot::capture(doc);
        project.updated_at = snapshot.captured_at.clone();
        project.document_snapshot = Some(snapshot);
        let saved = project.clone();
        self.save_record(origin, &record).await?;
        tracing::info!("[VersionStore] Saved project '{}' ({})", saved.name, saved.id);
        Ok(saved)
    }

    // ============================================================================
    // Switching
    // ============================================================================

    pub async fn active_project(&self, origin: &OriginKey) -> Result<Option<String>> {
        Ok(self.load_record(origin).await?.active_project_id)
    }

    /// Replaces the live body with the snapshot of `target` and makes it active.
    ///
    /// An unsaved project shows the baseline.
    pub async fn switch_to(&self, origin: &OriginKey, target: &SnapshotRef, doc: &mut Document) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_record(origin).await?;
        let snapshot = snapshot_for(&record, target)?;
        restore_body(doc, &snapshot)?;
        record.active_project_id = match target {
            SnapshotRef::Baseline => None,
            SnapshotRef::Project(id) => Some(id.clone()),
        };
        self.save_record(origin, &record).await?;
        tracing::info!("[VersionStore] Switched {} to {}", origin, target);
        Ok(())
    }

    /// Reverts the live body to the active project's last save, or to the
    /// baseline when it was never saved.
    ///
    /// # Returns
    ///
    /// What was restored.
    pub async fn discard(&self, origin: &OriginKey, doc: &mut Document) -> Result<SnapshotRef> {
        let _guard = self.write_lock.lock().await;
        let record = self.load_record(origin).await?;
        let restored = match record.active_project_id.as_deref().and_then(|id| record.project(id)) {
            Some(project) if project.is_saved() => SnapshotRef::Project(project.id.clone()),
            _ => SnapshotRef::Baseline,
        };
        let snapshot = snapshot_for(&record, &restored)?;
        restore_body(doc, &snapshot)?;
        tracing::info!("[VersionStore] Discarded changes, restored {}", restored);
        Ok(restored)
    }
}

fn new_project_id(record: &SiteRecord) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if record.project(&id).is_none() {
            return id;
        }
    }
}

fn display_name(name: &str, record: &SiteRecord) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        format!("Project {}", record.projects.len() + 1)
    } else {
        trimmed.to_string()
    }
}

/// Snapshot shown for `target`; unsaved projects fall back to the baseline.
fn snapshot_for(record: &SiteRecord, target: &SnapshotRef) -> Result<DocumentSnapshot> {
    let baseline = || {
        record
            .baseline
            .clone()
            .ok_or_else(|| RestyleError::not_found("Baseline", BASELINE_ID))
    };
    match target {
        SnapshotRef::Baseline => baseline(),
        SnapshotRef::Project(id) => {
            let project = record
                .project(id)
                .ok_or_else(|| RestyleError::not_found("Project", id.as_str()))?;
            match &project.document_snapshot {
                Some(snapshot) => Ok(snapshot.clone()),
                None => baseline(),
            }
        }
    }
}

/// Replaces the children of the live `<body>` with those of the snapshot.
///
/// The head and the body element itself are untouched. Control-surface roots
/// under the body are detached first and re-attached afterwards, so the
/// engine's own UI survives while nothing from the snapshot carries a marker.
///
/// The replaced body content is dropped from the arena afterwards, so every
/// [`crate::dom::NodeId`] taken before the call is invalidated.
pub fn restore_body(doc: &mut Document, snapshot: &DocumentSnapshot) -> Result<()> {
    let mut source = Document::parse(&snapshot.html);
    let source_body = source
        .body()
        .ok_or_else(|| RestyleError::storage("snapshot has no body"))?;
    source.strip_control_surface(source_body);

    let body = doc
        .body()
        .ok_or_else(|| RestyleError::internal("live document has no body"))?;
    let control = doc.control_surface_children(body);
    for node in &control {
        doc.detach(*node);
    }
    doc.take_children(body);

    let children: Vec<_> = source.children(source_body).to_vec();
    for child in children {
        let copy = doc.import_subtree(&source, child);
        doc.append_child(body, copy);
    }
    for node in control {
        doc.append_child(body, node);
    }
    doc.compact();
    Ok(())
}
