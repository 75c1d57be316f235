//! Shared fixtures for the session tests.
#![allow(dead_code)]

use async_trait::async_trait;
use restyle_application::{SessionCoordinator, SessionServices};
use restyle_core::config::EngineConfig;
use restyle_core::dom::{Document, NodeId};
use restyle_core::generative::{GenerativeService, PatchRequest};
use restyle_core::patch::PatchResponse;
use restyle_core::secret::Credential;
use restyle_core::storage::KeyValueStore;
use restyle_core::{OriginKey, Result};
use serde_json::Value;
use restyle_infrastructure::{MemoryCredentialStore, MemoryStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const PAGE: &str = r#"<!DOCTYPE html><html><head><title>Shop</title><style>h1 { font-size: 40px }</style></head><body><main><section class="hero"><div><h1 id="title">Spring sale</h1><p>Everything must go</p></div><div class="actions"><button class="cta">Buy</button><button class="cta">Later</button></div></section></main></body></html>"#;

pub const URL: &str = "https://shop.test/landing";

/// In-memory store that yields before every call, so concurrent operations
/// interleave at each await point.
#[derive(Default)]
pub struct YieldingStore {
    inner: MemoryStore,
}

#[async_trait]
impl KeyValueStore for YieldingStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        tokio::task::yield_now().await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.remove(key).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        tokio::task::yield_now().await;
        self.inner.keys().await
    }
}

/// Generative service returning a scripted reply.
pub struct ScriptedService {
    reply: Mutex<Result<PatchResponse>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<PatchRequest>>,
    /// When set, every call waits for a permit before replying.
    gate: Option<Arc<Notify>>,
}

impl ScriptedService {
    pub fn replying(reply: Result<PatchResponse>) -> Self {
        Self {
            reply: Mutex::new(reply),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(reply: Result<PatchResponse>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::replying(reply)
        }
    }

    pub fn set_reply(&self, reply: Result<PatchResponse>) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<PatchRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerativeService for ScriptedService {
    async fn request_patch(&self, _credential: &Credential, request: &PatchRequest) -> Result<PatchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply.lock().unwrap().clone()
    }
}

pub fn content_reply(markup: &str) -> Result<PatchResponse> {
    Ok(PatchResponse {
        style_changes: String::new(),
        content_changes: markup.to_string(),
        rationale: "Rewrote the content".to_string(),
    })
}

pub fn style_reply(style: &str) -> Result<PatchResponse> {
    Ok(PatchResponse {
        style_changes: style.to_string(),
        content_changes: String::new(),
        rationale: "Adjusted the styles".to_string(),
    })
}

pub fn credential() -> Credential {
    Credential::parse("sk-test-0123456789abcdef").unwrap()
}

pub struct Harness {
    pub coordinator: Arc<SessionCoordinator>,
    pub service: Arc<ScriptedService>,
    pub store: Arc<YieldingStore>,
    pub origin: OriginKey,
}

impl Harness {
    pub fn new(service: ScriptedService, with_credential: bool) -> Self {
        let store = Arc::new(YieldingStore::default());
        let service = Arc::new(service);
        let credentials = if with_credential {
            MemoryCredentialStore::with_credential(credential())
        } else {
            MemoryCredentialStore::new()
        };
        let origin = OriginKey::parse(URL).unwrap();
        let coordinator = SessionCoordinator::new(
            origin.clone(),
            Document::parse(PAGE),
            EngineConfig::default(),
            SessionServices::new(store.clone(), Arc::new(credentials), service.clone()),
        );
        Self {
            coordinator: Arc::new(coordinator),
            service,
            store,
            origin,
        }
    }

    /// Activated session with a stored credential.
    pub async fn ready(service: ScriptedService) -> Self {
        let harness = Self::new(service, true);
        harness.coordinator.activate().await.unwrap();
        harness
    }

    pub async fn node_by_id(&self, id: &str) -> NodeId {
        self.coordinator
            .with_document(|doc| doc.element_by_id(id))
            .await
            .unwrap()
    }

    pub async fn nodes_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.coordinator
            .with_document(|doc| {
                doc.descendant_elements(doc.root())
                    .into_iter()
                    .filter(|n| doc.tag_name(*n) == Some(tag))
                    .collect()
            })
            .await
    }

    /// Enters selection mode and commits `node`.
    pub async fn target(&self, node: NodeId) -> restyle_core::session::TargetInfo {
        self.coordinator.enter_selection_mode().await.unwrap();
        self.coordinator.commit(node).await.unwrap()
    }

    /// Body markup without the control surface.
    pub async fn body_content(&self) -> String {
        self.coordinator
            .with_document(|doc| {
                let mut copy = doc.clone();
                let root = copy.root();
                copy.strip_control_surface(root);
                copy.body().map(|b| copy.inner_html(b)).unwrap_or_default()
            })
            .await
    }
}
