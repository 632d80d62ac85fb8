//! Typed configuration schema. Defaults reproduce the original deployment of
//! the login service (bind-all on port 5001, Biopharm Catalyst login URL and
//! cookie names).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalystConfig {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub login: LoginConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0" so the service is reachable
    /// from outside its container.
    pub bind: String,
    /// Port to listen on. The `PORT` environment variable overrides this.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5001,
        }
    }
}

/// Browser launch configuration.
///
/// Only the executable location is configurable. The rest of the browser
/// profile (headless mode, viewport, user agent, Chrome flags) is fixed by
/// the launcher and deliberately not exposed here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Path to a Chrome/Chromium binary. Tried before host detection and the
    /// managed download. `GOOGLE_CHROME_BIN` and `CHROME` override this.
    pub chrome_path: Option<String>,
    /// Directory for the managed Chromium download (the launch strategy of
    /// last resort). Defaults to `<config dir>/chromium`.
    pub fetch_dir: Option<PathBuf>,
    /// Add Chrome flags for container platforms where the default zygote
    /// process setup fails. Set by `CATALYST_CONTAINER` or implied by
    /// `GOOGLE_CHROME_BIN`.
    pub container: bool,
}

/// Login flow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Login page URL.
    pub url: String,
    /// Name of the session cookie to extract.
    pub session_cookie: String,
    /// Name of the CSRF token cookie to extract.
    pub csrf_cookie: String,
    /// Delay after navigation before the form wait begins, in milliseconds.
    /// Gives client-side rendering and anti-bot interstitials a moment.
    pub settle_delay_ms: u64,
    /// How long to wait for a `<form>` element to appear, in milliseconds.
    pub form_timeout_ms: u64,
    /// How long to wait after submit for both cookies to appear, in
    /// milliseconds.
    pub cookie_timeout_ms: u64,
    /// Maximum concurrently running browser sessions. Attempts beyond this
    /// queue for a free slot instead of launching more browsers.
    pub max_sessions: usize,
    /// Seconds a completed task result is kept for polling before expiry.
    pub task_ttl_secs: u64,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            url: "https://www.biopharmcatalyst.com/account/login".into(),
            session_cookie: "biopharm_user_session".into(),
            csrf_cookie: "XSRF-TOKEN".into(),
            settle_delay_ms: 1_500,
            form_timeout_ms: 10_000,
            cookie_timeout_ms: 15_000,
            max_sessions: 2,
            task_ttl_secs: 600,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 5001);
    }

    #[test]
    fn default_login_config_targets_biopharm() {
        let config = LoginConfig::default();
        assert!(config.url.contains("biopharmcatalyst.com"));
        assert_eq!(config.session_cookie, "biopharm_user_session");
        assert_eq!(config.csrf_cookie, "XSRF-TOKEN");
        assert!(config.max_sessions >= 1);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: CatalystConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [login]
            max_sessions = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.login.max_sessions, 4);
        assert_eq!(config.login.session_cookie, "biopharm_user_session");
        assert!(config.browser.chrome_path.is_none());
    }
}
