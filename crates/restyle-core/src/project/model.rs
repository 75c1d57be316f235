//! Project domain models.

use crate::dom::Document;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved identifier naming the baseline in switch requests.
pub const BASELINE_ID: &str = "baseline";

/// A full-document capture with the control surface stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    /// Serialized document, doctype included.
    pub html: String,
    /// Capture time (RFC 3339).
    pub captured_at: String,
}

impl DocumentSnapshot {
    /// Serializes a copy of `doc` without any control-surface elements.
    pub fn capture(doc: &Document) -> Self {
        let mut copy = doc.clone();
        let root = copy.root();
        copy.strip_control_surface(root);
        Self {
            html: copy.to_html(),
            captured_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Inner markup of the snapshot's body.
    pub fn body_html(&self) -> String {
        let doc = Document::parse(&self.html);
        doc.body().map(|b| doc.inner_html(b)).unwrap_or_default()
    }
}

/// A named snapshot of a site the operator can switch to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique within the origin (UUID format)
    pub id: String,
    pub name: String,
    /// `None` until the project is first saved.
    #[serde(default)]
    pub document_snapshot: Option<DocumentSnapshot>,
    pub created_at: String,
    pub updated_at: String,
    /// Project (or baseline) this one was duplicated from.
    #[serde(default)]
    pub duplicated_from: Option<String>,
}

impl Project {
    pub fn is_saved(&self) -> bool {
        self.document_snapshot.is_some()
    }
}

/// Everything stored for one origin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    #[serde(default)]
    pub baseline: Option<DocumentSnapshot>,
    #[serde(default)]
    pub projects: Vec<Project>,
    /// Project the operator last switched to; `None` means the baseline.
    #[serde(default)]
    pub active_project_id: Option<String>,
}

impl SiteRecord {
    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }
}

/// What a switch or discard restores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SnapshotRef {
    Baseline,
    Project(String),
}

impl SnapshotRef {
    /// Maps the reserved [`BASELINE_ID`] to `Baseline`, anything else to a project.
    pub fn from_id(id: &str) -> Self {
        if id == BASELINE_ID {
            SnapshotRef::Baseline
        } else {
            SnapshotRef::Project(id.to_string())
        }
    }
}

impl fmt::Display for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotRef::Baseline => f.write_str(BASELINE_ID),
            SnapshotRef::Project(id) => write!(f, "project {}", id),
        }
    }
}

/// Listing entry for the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_active: bool,
    pub is_saved: bool,
    pub duplicated_from: Option<String>,
}

impl ProjectSummary {
    pub fn new(project: &Project, active_id: Option<&str>) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            created_at: project.created_at.clone(),
            updated_at: project.updated_at.clone(),
            is_active: active_id == Some(project.id.as_str()),
            is_saved: project.is_saved(),
            duplicated_from: project.duplicated_from.clone(),
        }
    }
}
