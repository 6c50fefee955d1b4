pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use crate::app::auth::AuthService;
use crate::config::AppConfig;
use crate::infra::ai::AiCollaborator;
use crate::infra::store::StoreHandle;

#[derive(Clone)]
pub struct AppState {
    pub store: StoreHandle,
    pub ai: Arc<dyn AiCollaborator>,
    pub upload_max_bytes: usize,
}

impl AppState {
    /// Fresh, empty store with the configured admin (and optionally the demo
    /// members) already registered.
    pub fn from_config(config: &AppConfig, ai: Arc<dyn AiCollaborator>) -> Self {
        let store = StoreHandle::default();
        let auth = AuthService::new(store.clone());
        let admin_id = auth.seed_admin(&config.admin_username, &config.admin_password);
        tracing::info!(user_id = admin_id, username = %config.admin_username, "admin account ready");
        if config.seed_demo_users {
            auth.seed_demo_users();
        }

        Self {
            store,
            ai,
            upload_max_bytes: config.upload_max_bytes,
        }
    }
}
