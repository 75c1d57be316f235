//! Version store and history log running on the file-backed store.

use restyle_core::dom::Document;
use restyle_core::history::{ChatRecord, HistoryLog};
use restyle_core::origin::OriginKey;
use restyle_core::project::VersionStore;
use restyle_core::session::InteractionMode;
use restyle_infrastructure::JsonFileStore;
use std::sync::Arc;
use tempfile::TempDir;

const PAGE: &str = "<!DOCTYPE html><html><head><title>t</title></head><body><h1>Hello</h1></body></html>";

#[tokio::test]
async fn test_projects_and_history_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.json");
    let origin = OriginKey::parse("https://shop.test/landing/?utm=x#top").unwrap();

    let project_id = {
        let store = Arc::new(JsonFileStore::new(path.clone()));
        let versions = VersionStore::new(store.clone());
        let history = HistoryLog::new(store);

        let doc = Document::parse(PAGE);
        assert!(versions.ensure_baseline(&origin, &doc).await.unwrap());
        let project = versions.create_project(&origin, "Spring sale", None).await.unwrap();
        versions.save(&origin, &project.id, &doc).await.unwrap();

        history
            .append(&origin, ChatRecord::operator("make it red", InteractionMode::Edit, None))
            .await
            .unwrap();
        project.id
    };

    let store = Arc::new(JsonFileStore::new(path));
    let versions = VersionStore::new(store.clone());
    let history = HistoryLog::new(store);

    let doc = Document::parse(PAGE);
    assert!(!versions.ensure_baseline(&origin, &doc).await.unwrap());
    let projects = versions.list_projects(&origin).await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, project_id);
    assert!(projects[0].is_saved);

    let records = history.load(&origin).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text, "make it red");
}
