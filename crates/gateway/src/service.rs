//! The login service seam between the HTTP handlers and the browser flow.
//!
//! Handlers talk to [`LoginService`] so tests can substitute a scripted
//! implementation. The live implementation owns the semaphore bounding how
//! many browser sessions run at once.

use std::sync::Arc;

use {async_trait::async_trait, tokio::sync::Semaphore, tracing::debug};

use catalyst_browser::{BrowserRuntimeConfig, Credentials, LoginOutcome, LoginParams, run_login};

/// Executes one login attempt end to end.
#[async_trait]
pub trait LoginService: Send + Sync {
    async fn login(&self, credentials: Credentials) -> LoginOutcome;
}

/// Browser-backed implementation.
///
/// Each login owns one heavyweight browser process, so attempts beyond
/// `max_sessions` queue for a permit here instead of launching unbounded
/// browsers.
pub struct LiveLoginService {
    browser: BrowserRuntimeConfig,
    params: LoginParams,
    sessions: Arc<Semaphore>,
}

impl LiveLoginService {
    pub fn new(config: &catalyst_config::CatalystConfig) -> Self {
        Self {
            browser: BrowserRuntimeConfig::from(&config.browser),
            params: LoginParams::from(&config.login),
            sessions: Arc::new(Semaphore::new(config.login.max_sessions.max(1))),
        }
    }
}

#[async_trait]
impl LoginService for LiveLoginService {
    async fn login(&self, credentials: Credentials) -> LoginOutcome {
        let Ok(_permit) = self.sessions.acquire().await else {
            return LoginOutcome::failure("login service is shutting down");
        };
        debug!(
            available = self.sessions.available_permits(),
            "acquired browser session permit"
        );
        run_login(&self.browser, &self.params, &credentials).await
    }
}

/// Stand-in used when no browser is wired (tests and bare
/// [`build_app`](crate::server::build_app) callers). Always reports an
/// unsuccessful outcome.
pub struct NoopLoginService;

#[async_trait]
impl LoginService for NoopLoginService {
    async fn login(&self, _credentials: Credentials) -> LoginOutcome {
        LoginOutcome::failure("login service not configured")
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_service_reports_failure() {
        let outcome = NoopLoginService
            .login(Credentials {
                email: "a@b.c".into(),
                password: "pw".into(),
            })
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn live_service_never_starts_with_zero_permits() {
        let mut config = catalyst_config::CatalystConfig::default();
        config.login.max_sessions = 0;
        let service = LiveLoginService::new(&config);
        assert_eq!(service.sessions.available_permits(), 1);
    }
}
