//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the loaded configuration, the backend every screen delegates to,
//! the session store and the contact log. Clone is required by Axum; every
//! field is `Arc`-wrapped or cheap to clone.

use std::sync::Arc;

use crate::baas::Backend;
use crate::config::AppConfig;
use crate::services::contact::ContactLog;
use crate::services::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: Arc<dyn Backend>,
    pub sessions: SessionStore,
    pub contact: Arc<ContactLog>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, backend: Arc<dyn Backend>) -> Self {
        let contact = Arc::new(ContactLog::new(config.contact_log_path.clone()));
        Self { config: Arc::new(config), backend, sessions: SessionStore::new(), contact }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::baas::memory::MemoryBackend;
    use crate::config::{BackendConfig, BaasTimeouts};

    /// Config for an in-memory backend with the contact log under a fresh
    /// temp directory.
    #[must_use]
    pub fn test_config() -> AppConfig {
        let scratch = std::env::temp_dir().join(format!("valleystays-test-{}", uuid::Uuid::new_v4()));
        AppConfig {
            port: 0,
            backend: BackendConfig::Memory,
            storage_bucket: "property-media".into(),
            site_url: "http://localhost:3000".into(),
            contact_log_path: scratch.join("contact_messages.json"),
            timeouts: BaasTimeouts { request_secs: 5, connect_secs: 2 },
            bootstrap_admin: None,
            cookie_secure: false,
        }
    }

    /// A test `AppState` backed by a fresh `MemoryBackend`.
    #[must_use]
    pub fn test_app_state() -> (AppState, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let state = AppState::new(test_config(), backend.clone());
        (state, backend)
    }
}
