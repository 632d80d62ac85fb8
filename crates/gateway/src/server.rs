//! Router assembly and server startup.

use std::{sync::Arc, time::Duration};

use {
    axum::Router,
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use crate::{
    routes::login_router,
    service::{LiveLoginService, LoginService},
    state::AppState,
};

/// How often the task registry is swept for expired entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Build the service router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    login_router().layer(cors).with_state(state)
}

/// Load configuration, wire the live login service, and serve until the
/// process exits.
pub async fn start_gateway(bind: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = catalyst_config::discover_and_load();
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    // Startup diagnostics only: a missing browser is reported here, but every
    // login attempt still walks the full launch-strategy chain.
    catalyst_browser::detect::check_and_warn(config.browser.chrome_path.as_deref()).await;

    let login: Arc<dyn LoginService> = Arc::new(LiveLoginService::new(&config));
    let state = AppState::new(config, login);

    let ttl = Duration::from_secs(state.config.login.task_ttl_secs);
    let tasks = Arc::clone(&state.tasks);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            tasks.sweep_expired(ttl);
        }
    });

    let addr = format!(
        "{}:{}",
        state.config.server.bind, state.config.server.port
    );
    let app = build_app(state);

    info!(addr, "catalyst gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
