//! End-to-end behaviour of the session coordinator.

mod support;

use restyle_core::RestyleError;
use restyle_core::dom::CONTROL_SURFACE_ATTR;
use restyle_core::history::ChatRole;
use restyle_core::project::{SnapshotRef, VersionStore};
use restyle_core::session::{InteractionMode, SessionState};
use restyle_core::target::resolve_address;
use std::sync::Arc;
use support::*;
use tokio::sync::Notify;

#[tokio::test]
async fn test_activation_requires_credential() {
    let harness = Harness::new(ScriptedService::replying(style_reply("color: red")), false);
    let c = &harness.coordinator;

    assert!(matches!(
        c.enter_selection_mode().await,
        Err(RestyleError::InvalidState { .. })
    ));
    assert_eq!(c.activate().await.unwrap(), SessionState::AwaitingCredential);
    assert!(c.enter_selection_mode().await.is_err());

    assert!(matches!(c.save_credential("short").await, Err(RestyleError::Config(_))));
    assert_eq!(
        c.save_credential("sk-test-0123456789abcdef").await.unwrap(),
        SessionState::Ready
    );

    // The baseline was captured without the mounted control root.
    let baseline = VersionStore::new(harness.store.clone())
        .baseline(&harness.origin)
        .await
        .unwrap()
        .unwrap();
    assert!(!baseline.html.contains(CONTROL_SURFACE_ATTR));
    assert!(
        c.with_document(|doc| doc.control_element("root").is_some())
            .await
    );
}

#[tokio::test]
async fn test_unique_id_gets_short_address() {
    let harness = Harness::ready(ScriptedService::replying(style_reply("color: red"))).await;
    let h1 = harness.node_by_id("title").await;

    let info = harness.target(h1).await;
    assert_eq!(info.address, "#title");
    assert_eq!(info.tag, "h1");
    assert_eq!(harness.coordinator.state().await, SessionState::Targeted);
}

#[tokio::test]
async fn test_sibling_button_gets_positional_qualifier() {
    let harness = Harness::ready(ScriptedService::replying(style_reply("color: red"))).await;
    let buttons = harness.nodes_by_tag("button").await;
    assert_eq!(buttons.len(), 2);

    let info = harness.target(buttons[1]).await;
    assert!(info.address.contains(":nth-of-type(2)"), "{}", info.address);

    let resolved = harness
        .coordinator
        .with_document(|doc| resolve_address(doc, &info.address))
        .await
        .unwrap();
    assert_eq!(resolved, buttons[1]);
    assert!(harness.coordinator.target_info().await.unwrap().resolves);
}

#[tokio::test]
async fn test_unsafe_commit_keeps_selecting() {
    let harness = Harness::ready(ScriptedService::replying(style_reply("color: red"))).await;
    let c = &harness.coordinator;
    let body = c.with_document(|doc| doc.body()).await.unwrap();

    c.enter_selection_mode().await.unwrap();
    assert!(!c.pointer_over(body).await);
    assert!(matches!(c.commit(body).await, Err(RestyleError::UnsafeTarget { .. })));
    assert_eq!(c.state().await, SessionState::Selecting);
    assert!(c.target_info().await.is_none());

    assert_eq!(c.exit_selection_mode().await.unwrap(), SessionState::Ready);
}

#[tokio::test]
async fn test_bogus_declaration_is_skipped() {
    let harness = Harness::ready(ScriptedService::replying(style_reply("color: red; bogus-prop purple"))).await;
    let h1 = harness.node_by_id("title").await;
    harness.target(h1).await;

    let outcome = harness.coordinator.submit("make the title red").await.unwrap();
    assert_eq!(outcome.styles_applied, 1);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.rationale, "Adjusted the styles");
    assert_eq!(
        harness.coordinator.with_document(|doc| doc.attr(h1, "style").map(str::to_string)).await,
        Some("color: red".to_string())
    );

    // Success clears the target and returns to Ready.
    assert_eq!(harness.coordinator.state().await, SessionState::Ready);
    assert!(harness.coordinator.target_info().await.is_none());

    let request = harness.service.last_request().unwrap();
    let context = request.context.unwrap();
    assert_eq!(context.address, "#title");
    assert_eq!(context.effective_styles.get("font-size").map(String::as_str), Some("40px"));

    let records = harness.coordinator.restore_history().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].role, ChatRole::Operator);
    assert_eq!(records[0].target_ref.as_ref().unwrap().address, "#title");
    assert_eq!(records[1].role, ChatRole::System);
    assert!(records[1].patch.is_some());
}

#[tokio::test]
async fn test_failed_request_keeps_target_and_draft() {
    let harness = Harness::ready(ScriptedService::replying(Err(RestyleError::transport("connection reset")))).await;
    let c = &harness.coordinator;
    let h1 = harness.node_by_id("title").await;
    harness.target(h1).await;

    let err = c.submit("make it blue").await.unwrap_err();
    assert!(err.is_transport());

    let status = c.status().await;
    assert_eq!(status.state, SessionState::Targeted);
    assert!(status.has_target);
    assert_eq!(status.draft.as_deref(), Some("make it blue"));
    assert_eq!(status.notices.len(), 1);
    assert!(c.restore_history().await.is_empty());

    c.dismiss_notice(&status.notices[0].id).await.unwrap();
    assert!(c.status().await.notices.is_empty());
    assert!(c.dismiss_notice(&status.notices[0].id).await.is_err());

    // Retry succeeds against the preserved target.
    harness.service.set_reply(style_reply("color: blue"));
    c.submit("make it blue").await.unwrap();
    assert_eq!(c.status().await.draft, None);
}

#[tokio::test]
async fn test_invalid_response_is_a_notice() {
    let harness = Harness::ready(ScriptedService::replying(Err(RestyleError::patch_validation(
        "unexpected response shape",
    ))))
    .await;
    let h1 = harness.node_by_id("title").await;
    harness.target(h1).await;

    let err = harness.coordinator.submit("x").await.unwrap_err();
    assert!(matches!(err, RestyleError::PatchValidation(_)));
    assert_eq!(harness.coordinator.status().await.notices.len(), 1);
}

#[tokio::test]
async fn test_missing_credential_is_a_notice() {
    let harness = Harness::new(ScriptedService::replying(style_reply("color: red")), false);
    let c = &harness.coordinator;
    c.activate().await.unwrap();
    c.set_mode(InteractionMode::Chat).await.unwrap();

    assert!(matches!(c.submit("hello").await, Err(RestyleError::CredentialMissing)));
    let status = c.status().await;
    assert_eq!(status.state, SessionState::AwaitingCredential);
    assert_eq!(status.draft.as_deref(), Some("hello"));
    assert_eq!(status.notices.len(), 1);
    assert_eq!(harness.service.calls(), 0);

    c.save_credential("sk-test-0123456789abcdef").await.unwrap();
    c.submit("hello").await.unwrap();
    assert_eq!(harness.service.calls(), 1);
}

#[tokio::test]
async fn test_second_submission_is_rejected_locally() {
    let gate = Arc::new(Notify::new());
    let harness = Harness::ready(ScriptedService::gated(style_reply("color: red"), gate.clone())).await;
    let c = harness.coordinator.clone();
    let h1 = harness.node_by_id("title").await;
    harness.target(h1).await;

    let (first, second) = tokio::join!(c.submit("first"), async {
        tokio::task::yield_now().await;
        assert_eq!(c.state().await, SessionState::Requesting);
        let second = c.submit("second").await;
        // Switching is refused while the first request is outstanding.
        assert!(matches!(c.discard().await, Err(RestyleError::RequestInFlight)));
        gate.notify_one();
        second
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(RestyleError::RequestInFlight)));
    assert_eq!(harness.service.calls(), 1);
}

#[tokio::test]
async fn test_history_keeps_most_recent_hundred() {
    let harness = Harness::ready(ScriptedService::replying(Ok(restyle_core::patch::PatchResponse {
        style_changes: String::new(),
        content_changes: String::new(),
        rationale: "answer".into(),
    })))
    .await;
    let c = &harness.coordinator;
    c.set_mode(InteractionMode::Chat).await.unwrap();

    for i in 0..60 {
        let outcome = c.submit(&format!("q{}", i)).await.unwrap();
        assert_eq!(outcome.mode, InteractionMode::Chat);
    }
    assert_eq!(harness.service.last_request().unwrap().context, None);

    let records = c.restore_history().await;
    assert_eq!(records.len(), 100);
    assert_eq!(records[0].text, "q10");
    assert_eq!(records[99].text, "answer");
    assert!(records[99].patch.is_none());

    c.clear_history().await.unwrap();
    assert!(c.restore_history().await.is_empty());
}

#[tokio::test]
async fn test_switch_preserves_control_surface_only_once() {
    let harness = Harness::ready(ScriptedService::replying(style_reply("color: red"))).await;
    let c = &harness.coordinator;

    let a = c.create_project("A").await.unwrap();
    assert!(!a.is_saved);
    let h1 = harness.node_by_id("title").await;
    harness.target(h1).await;
    c.submit("red title").await.unwrap();
    c.save_project(Some(&a.id)).await.unwrap();

    // Leave a live selection outline behind before switching.
    let buttons = harness.nodes_by_tag("button").await;
    harness.target(buttons[0]).await;
    assert_eq!(
        c.switch_project(&a.id).await.unwrap(),
        SnapshotRef::Project(a.id.clone())
    );

    let marked = c
        .with_document(|doc| {
            let body = doc.body().unwrap();
            doc.descendant_elements(body)
                .into_iter()
                .filter(|n| doc.attr(*n, CONTROL_SURFACE_ATTR).is_some())
                .count()
        })
        .await;
    assert_eq!(marked, 1);
    assert_eq!(c.state().await, SessionState::Ready);
    assert!(harness.body_content().await.contains(r#"style="color: red""#));

    let projects = c.list_projects().await.unwrap();
    assert!(projects[0].is_active);
    assert!(projects[0].is_saved);
}

#[tokio::test]
async fn test_discard_on_unsaved_project_restores_baseline() {
    let harness = Harness::ready(ScriptedService::replying(style_reply("color: red"))).await;
    let c = &harness.coordinator;
    let baseline = harness.body_content().await;

    let a = c.create_project("A").await.unwrap();
    let h1 = harness.node_by_id("title").await;
    harness.target(h1).await;
    c.submit("red").await.unwrap();
    c.save_project(Some(&a.id)).await.unwrap();

    let b = c.create_project("B").await.unwrap();
    assert_eq!(
        c.switch_project(&b.id).await.unwrap(),
        SnapshotRef::Project(b.id.clone())
    );
    assert_eq!(harness.body_content().await, baseline);

    // Edit B without saving, then discard.
    let h1 = harness.node_by_id("title").await;
    harness.target(h1).await;
    harness.service.set_reply(style_reply("color: green"));
    c.submit("green").await.unwrap();
    assert_ne!(harness.body_content().await, baseline);

    assert_eq!(c.discard().await.unwrap(), SnapshotRef::Baseline);
    assert_eq!(harness.body_content().await, baseline);
}

#[tokio::test]
async fn test_baseline_is_immutable() {
    let harness = Harness::ready(ScriptedService::replying(style_reply("color: red"))).await;
    let c = &harness.coordinator;

    assert!(matches!(c.save_project(None).await, Err(RestyleError::BaselineImmutable)));
    assert!(matches!(c.save_project(Some("baseline")).await, Err(RestyleError::BaselineImmutable)));
    assert!(matches!(c.delete_project("baseline").await, Err(RestyleError::BaselineImmutable)));

    let copy = c.duplicate_project("baseline", None).await.unwrap();
    assert_eq!(copy.name, "Baseline (copy)");
    assert_eq!(copy.duplicated_from.as_deref(), Some("baseline"));
    c.rename_project(&copy.id, "Autumn").await.unwrap();
    c.delete_project(&copy.id).await.unwrap();
    assert!(c.list_projects().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_active_project_restored_on_next_activation() {
    let harness = Harness::ready(ScriptedService::replying(style_reply("color: red"))).await;
    let c = &harness.coordinator;
    let a = c.create_project("A").await.unwrap();
    c.switch_project(&a.id).await.unwrap();
    let h1 = harness.node_by_id("title").await;
    harness.target(h1).await;
    c.submit("red").await.unwrap();
    c.save_project(None).await.unwrap();

    // A fresh page load on the same origin and store.
    let reloaded = restyle_application::SessionCoordinator::new(
        harness.origin.clone(),
        restyle_core::dom::Document::parse(PAGE),
        restyle_core::config::EngineConfig::default(),
        restyle_application::SessionServices::new(
            harness.store.clone(),
            Arc::new(restyle_infrastructure::MemoryCredentialStore::with_credential(credential())),
            harness.service.clone(),
        ),
    );
    reloaded.activate().await.unwrap();
    let body = reloaded
        .with_document(|doc| doc.body().map(|b| doc.inner_html(b)).unwrap_or_default())
        .await;
    assert!(body.contains(r#"<h1 id="title" style="color: red">"#), "{}", body);
}

#[tokio::test]
async fn test_concurrent_project_requests_keep_every_write() {
    let harness = Harness::ready(ScriptedService::replying(style_reply("color: red"))).await;
    let c = &harness.coordinator;

    let (a, b) = tokio::join!(c.create_project("A"), c.create_project("B"));
    let (a, b) = (a.unwrap(), b.unwrap());
    let mut names: Vec<_> = c.list_projects().await.unwrap().into_iter().map(|p| p.name).collect();
    names.sort();
    assert_eq!(names, vec!["A", "B"]);

    let (renamed, copy, saved) = tokio::join!(
        c.rename_project(&a.id, "Autumn"),
        c.duplicate_project(&b.id, None),
        c.save_project(Some(&b.id)),
    );
    renamed.unwrap();
    copy.unwrap();
    saved.unwrap();

    let projects = c.list_projects().await.unwrap();
    assert_eq!(projects.len(), 3);
    assert!(projects.iter().any(|p| p.name == "Autumn"));
    assert!(projects.iter().any(|p| p.id == b.id && p.is_saved));
}

#[tokio::test]
async fn test_content_edits_do_not_grow_the_document() {
    let harness = Harness::ready(ScriptedService::replying(content_reply("<p>Fresh copy</p>"))).await;
    let c = &harness.coordinator;

    let mut sizes = Vec::new();
    for _ in 0..4 {
        let paragraph = harness.nodes_by_tag("p").await[0];
        harness.target(paragraph).await;
        let outcome = c.submit("rewrite the intro").await.unwrap();
        assert!(outcome.content_replaced);
        sizes.push(c.with_document(|doc| doc.node_count()).await);
    }
    assert!(sizes.windows(2).all(|w| w[0] == w[1]), "{:?}", sizes);
    assert!(harness.body_content().await.contains("<p>Fresh copy</p>"));
}
