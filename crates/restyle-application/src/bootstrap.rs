//! Wiring of a coordinator on the default on-disk stack.

use crate::coordinator::{SessionCoordinator, SessionServices};
use restyle_core::dom::Document;
use restyle_core::{OriginKey, Result};
use restyle_infrastructure::storage::ConfigStorage;
use restyle_infrastructure::{FileCredentialStore, JsonFileStore, RestylePaths};
use restyle_interaction::HttpPatchService;
use std::sync::Arc;

/// Opens a session for the page at `url` with markup `html`.
///
/// Reads `~/.config/restyle/config.toml` (defaults when missing) and uses the
/// JSON file store, file credential store and HTTP patch service. The returned
/// coordinator is not yet activated.
///
/// # Errors
///
/// - `RestyleError::Storage` when `url` is not a valid origin
/// - `RestyleError::Config` when the config directory or file is unusable
pub fn open_session(url: &str, html: &str) -> Result<Arc<SessionCoordinator>> {
    let origin = OriginKey::parse(url)?;
    let config = ConfigStorage::new(RestylePaths::config_file()?).load()?;

    let services = SessionServices::new(
        Arc::new(JsonFileStore::default_location()?),
        Arc::new(FileCredentialStore::default_location()?),
        Arc::new(HttpPatchService::new(&config.service, &config.timeouts)?),
    );
    tracing::info!("[Bootstrap] Opening session for {}", origin);
    Ok(Arc::new(SessionCoordinator::new(
        origin,
        Document::parse(html),
        config,
        services,
    )))
}
