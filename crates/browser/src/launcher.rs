//! Browser session launcher.
//!
//! Produces one ready-to-use headless browser session. Initialization
//! strategies are tried in a fixed order until one succeeds: the configured
//! binary path, a browser detected on the host, then a managed Chromium
//! download. Every failed attempt is recorded; when all fail the aggregate is
//! surfaced as [`LoginError::BrowserInit`].
//!
//! The browser profile (viewport, user agent, Chrome flags, page-load
//! timeout) is fixed here and not exposed to callers.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use {
    chromiumoxide::{
        Browser, BrowserConfig as CdpBrowserConfig, Page,
        cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams,
        fetcher::{BrowserFetcher, BrowserFetcherOptions},
        handler::viewport::Viewport,
    },
    futures::StreamExt,
    tokio::task::JoinHandle,
    tracing::{debug, info, warn},
};

use crate::{detect, error::LoginError, types::BrowserRuntimeConfig};

/// Fixed viewport, matching a common desktop resolution.
pub const VIEWPORT_WIDTH: u32 = 1920;
pub const VIEWPORT_HEIGHT: u32 = 1080;

/// Desktop user agent presented to the target site.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// CDP request timeout; bounds page loads and individual commands.
const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Chrome flags applied to every launch: resource trimming plus suppression
/// of the automation-detection surface.
const CHROME_ARGS: &[&str] = &[
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-infobars",
    "--disable-notifications",
    "--blink-settings=imagesEnabled=false",
    "--disable-blink-features=AutomationControlled",
];

/// Extra flags for container platforms without a usable zygote setup.
const CONTAINER_ARGS: &[&str] = &["--single-process", "--no-zygote"];

/// One live automation-controlled browser plus its event-handler task and a
/// single page. Owned by exactly one login attempt and released exactly once
/// via [`BrowserSession::close`].
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
}

impl BrowserSession {
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Tear the session down. Consumes the session so teardown cannot run
    /// twice; the login flow calls this on every exit path.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed, relying on process teardown");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
        debug!("browser session closed");
    }
}

/// Launch a browser session, trying each initialization strategy in order.
pub async fn launch(config: &BrowserRuntimeConfig) -> Result<BrowserSession, LoginError> {
    let mut attempts: Vec<String> = Vec::new();

    // 1. Explicit executable path from configuration (or its env overrides).
    if let Some(ref path) = config.chrome_path {
        let path = PathBuf::from(path);
        log_version(&path).await;
        match try_launch(&path, config).await {
            Ok(session) => {
                info!(strategy = "configured path", path = %path.display(), "browser launched");
                return Ok(session);
            },
            Err(e) => {
                warn!(strategy = "configured path", error = %e, "launch strategy failed");
                attempts.push(format!("configured path: {e}"));
            },
        }
    }

    // 2. Browser detected on the host (platform paths, then PATH).
    let detection = detect::detect_browser(None);
    match detection.path {
        Some(path) => {
            log_version(&path).await;
            match try_launch(&path, config).await {
                Ok(session) => {
                    info!(strategy = "host detection", path = %path.display(), "browser launched");
                    return Ok(session);
                },
                Err(e) => {
                    warn!(strategy = "host detection", error = %e, "launch strategy failed");
                    attempts.push(format!("host detection: {e}"));
                },
            }
        },
        None => {
            warn!("no host browser detected");
            attempts.push("host detection: no browser found".to_string());
        },
    }

    // 3. Managed Chromium download, the strategy of last resort.
    match fetch_browser(config).await {
        Ok(path) => match try_launch(&path, config).await {
            Ok(session) => {
                info!(strategy = "managed download", path = %path.display(), "browser launched");
                return Ok(session);
            },
            Err(e) => {
                warn!(strategy = "managed download", error = %e, "launch strategy failed");
                attempts.push(format!("managed download: {e}"));
            },
        },
        Err(e) => {
            warn!(error = %e, "managed browser download failed");
            attempts.push(format!("managed download: {e}"));
        },
    }

    Err(LoginError::BrowserInit { attempts })
}

/// Diagnostics only: probe and log the executable's version string.
async fn log_version(path: &Path) {
    if let Some(version) = detect::browser_version(path).await {
        info!(path = %path.display(), version, "probed browser binary");
    }
}

/// Download a managed Chromium revision into the configured fetch directory.
async fn fetch_browser(config: &BrowserRuntimeConfig) -> Result<PathBuf, LoginError> {
    let dir = config.fetch_dir.clone().unwrap_or_else(default_fetch_dir);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| LoginError::Fetch(format!("create {}: {e}", dir.display())))?;

    let options = BrowserFetcherOptions::builder()
        .with_path(&dir)
        .build()
        .map_err(|e| LoginError::Fetch(e.to_string()))?;
    let fetcher = BrowserFetcher::new(options);

    info!(dir = %dir.display(), "downloading managed Chromium");
    let revision = fetcher
        .fetch()
        .await
        .map_err(|e| LoginError::Fetch(e.to_string()))?;

    Ok(revision.executable_path)
}

fn default_fetch_dir() -> PathBuf {
    catalyst_config::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chromium")
}

/// Build the fixed browser profile and launch one instance with it.
async fn try_launch(
    executable: &Path,
    config: &BrowserRuntimeConfig,
) -> Result<BrowserSession, LoginError> {
    let mut builder = CdpBrowserConfig::builder()
        .chrome_executable(executable)
        .viewport(Viewport {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .request_timeout(PAGE_LOAD_TIMEOUT)
        .arg(format!("--user-agent={USER_AGENT}"));

    // chromiumoxide launches headless unless with_head() is requested, so the
    // fixed profile only needs the flag set.
    for arg in CHROME_ARGS {
        builder = builder.arg(*arg);
    }
    if config.container {
        for arg in CONTAINER_ARGS {
            builder = builder.arg(*arg);
        }
    }

    let browser_config = builder
        .build()
        .map_err(|e| LoginError::Cdp(format!("invalid browser config: {e}")))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| LoginError::Cdp(format!("launch: {e}")))?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            debug!(?event, "browser event");
        }
    });

    match init_page(&browser).await {
        Ok(page) => Ok(BrowserSession {
            browser,
            handler: handler_task,
            page,
        }),
        Err(e) => {
            // Initialization got partway: the process is up but unusable.
            // Tear it down before reporting the attempt as failed.
            warn!(error = %e, "tearing down partially initialized browser");
            let mut browser = browser;
            if let Err(close_err) = browser.close().await {
                warn!(error = %close_err, "partial-init browser close failed");
            }
            let _ = browser.wait().await;
            handler_task.abort();
            Err(e)
        },
    }
}

/// Create the session's page and re-assert the viewport on it.
async fn init_page(browser: &Browser) -> Result<Page, LoginError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| LoginError::Cdp(format!("new page: {e}")))?;

    // Viewport is already on the browser config, but browser-level emulation
    // is not always applied to new pages; re-assert it per page.
    let viewport_cmd = SetDeviceMetricsOverrideParams::builder()
        .width(VIEWPORT_WIDTH)
        .height(VIEWPORT_HEIGHT)
        .device_scale_factor(1.0)
        .mobile(false)
        .build()
        .map_err(|e| LoginError::Cdp(e.to_string()))?;
    page.execute(viewport_cmd)
        .await
        .map_err(|e| LoginError::Cdp(format!("set viewport: {e}")))?;

    debug!(
        viewport_width = VIEWPORT_WIDTH,
        viewport_height = VIEWPORT_HEIGHT,
        "created page with viewport"
    );

    Ok(page)
}
