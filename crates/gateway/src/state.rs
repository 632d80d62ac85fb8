//! Shared application state for the HTTP handlers.

use std::sync::Arc;

use catalyst_config::CatalystConfig;

use crate::{service::LoginService, task_store::TaskStore};

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CatalystConfig>,
    pub login: Arc<dyn LoginService>,
    pub tasks: Arc<TaskStore>,
    pub version: &'static str,
}

impl AppState {
    pub fn new(config: CatalystConfig, login: Arc<dyn LoginService>) -> Self {
        Self {
            config: Arc::new(config),
            login,
            tasks: Arc::new(TaskStore::new()),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
