//! Credential, outcome, and runtime-settings types shared by the login flow
//! and the gateway.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Credentials for one login attempt. Supplied per request, passed through to
/// the target site verbatim (empty strings included), never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Outcome of one login attempt. Immutable once produced.
///
/// `success` is true only when both target cookies were captured; an attempt
/// that completed without raising an error but missed a cookie is still
/// unsuccessful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoginOutcome {
    pub fn success(session_cookie: String, csrf_token: String) -> Self {
        Self {
            success: true,
            session_cookie: Some(session_cookie),
            csrf_token: Some(csrf_token),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            session_cookie: None,
            csrf_token: None,
            error: Some(error.into()),
        }
    }
}

/// Message used when the click-through completed but the target cookies never
/// appeared.
pub const COOKIES_MISSING: &str = "Failed to retrieve required cookies";

/// Browser-launch settings resolved from configuration. Everything else about
/// the browser profile is fixed in the launcher.
#[derive(Debug, Clone, Default)]
pub struct BrowserRuntimeConfig {
    /// Explicit browser executable, tried before host detection.
    pub chrome_path: Option<String>,
    /// Where the managed Chromium download lands.
    pub fetch_dir: Option<PathBuf>,
    /// Container platform: add flags for hosts without a usable zygote.
    pub container: bool,
}

impl From<&catalyst_config::BrowserConfig> for BrowserRuntimeConfig {
    fn from(cfg: &catalyst_config::BrowserConfig) -> Self {
        Self {
            chrome_path: cfg.chrome_path.clone(),
            fetch_dir: cfg.fetch_dir.clone(),
            container: cfg.container,
        }
    }
}

/// Login-flow settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct LoginParams {
    pub url: String,
    pub session_cookie: String,
    pub csrf_cookie: String,
    pub settle_delay: Duration,
    pub form_timeout: Duration,
    pub cookie_timeout: Duration,
}

impl From<&catalyst_config::LoginConfig> for LoginParams {
    fn from(cfg: &catalyst_config::LoginConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            session_cookie: cfg.session_cookie.clone(),
            csrf_cookie: cfg.csrf_cookie.clone(),
            settle_delay: Duration::from_millis(cfg.settle_delay_ms),
            form_timeout: Duration::from_millis(cfg.form_timeout_ms),
            cookie_timeout: Duration::from_millis(cfg.cookie_timeout_ms),
        }
    }
}

impl Default for LoginParams {
    fn default() -> Self {
        Self::from(&catalyst_config::LoginConfig::default())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_outcome_carries_both_cookies() {
        let outcome = LoginOutcome::success("sess".into(), "csrf".into());
        assert!(outcome.success);
        assert_eq!(outcome.session_cookie.as_deref(), Some("sess"));
        assert_eq!(outcome.csrf_token.as_deref(), Some("csrf"));
        assert!(outcome.error.is_none());
    }

    #[test]
    fn failure_outcome_serializes_without_cookie_fields() {
        let outcome = LoginOutcome::failure("boom");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("session_cookie").is_none());
        assert!(json.get("csrf_token").is_none());
    }

    #[test]
    fn login_params_from_config() {
        let cfg = catalyst_config::LoginConfig::default();
        let params = LoginParams::from(&cfg);
        assert_eq!(params.settle_delay, Duration::from_millis(1_500));
        assert_eq!(params.form_timeout, Duration::from_millis(10_000));
        assert_eq!(params.cookie_timeout, Duration::from_millis(15_000));
        assert_eq!(params.url, cfg.url);
    }
}
