//! Host browser detection and install guidance.

use std::path::{Path, PathBuf};

/// Known Chromium-based browser executable names to search for.
/// All of these speak CDP (Chrome DevTools Protocol).
const CHROMIUM_EXECUTABLES: &[&str] = &[
    // Chrome
    "chrome",
    "google-chrome",
    "google-chrome-stable",
    // Chromium
    "chromium",
    "chromium-browser",
    // Microsoft Edge
    "msedge",
    "microsoft-edge",
    "microsoft-edge-stable",
    // Brave
    "brave",
    "brave-browser",
];

/// macOS app bundle paths for Chromium-based browsers.
#[cfg(target_os = "macos")]
const MACOS_APP_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
];

/// Windows installation paths for Chromium-based browsers.
#[cfg(target_os = "windows")]
const WINDOWS_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
];

/// Result of browser detection.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Whether a browser was found.
    pub found: bool,
    /// Path to the browser executable (if found).
    pub path: Option<PathBuf>,
    /// Platform-specific install instructions.
    pub install_hint: String,
}

impl DetectionResult {
    fn found_at(path: PathBuf) -> Self {
        Self {
            found: true,
            path: Some(path),
            install_hint: String::new(),
        }
    }
}

/// Detect a Chromium-based browser on the host.
///
/// Checks (in order):
/// 1. Custom path (if provided)
/// 2. Platform-specific installation paths (macOS app bundles, Windows paths)
///    - checked before PATH because PATH can contain broken wrapper scripts
///      (e.g. Homebrew's deprecated chromium)
/// 3. Known executable names in PATH (fallback)
pub fn detect_browser(custom_path: Option<&str>) -> DetectionResult {
    if let Some(path) = custom_path {
        let p = PathBuf::from(path);
        if p.exists() {
            return DetectionResult::found_at(p);
        }
    }

    #[cfg(target_os = "macos")]
    for path in MACOS_APP_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return DetectionResult::found_at(p);
        }
    }

    #[cfg(target_os = "windows")]
    for path in WINDOWS_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return DetectionResult::found_at(p);
        }
    }

    for name in CHROMIUM_EXECUTABLES {
        if let Ok(path) = which::which(name) {
            return DetectionResult::found_at(path);
        }
    }

    DetectionResult {
        found: false,
        path: None,
        install_hint: install_instructions(),
    }
}

/// Get platform-specific install instructions.
pub fn install_instructions() -> String {
    let instructions = if cfg!(target_os = "macos") {
        "  brew install --cask google-chrome\n  \
         # Alternatives: chromium, brave-browser, microsoft-edge"
    } else if cfg!(target_os = "linux") {
        "  Debian/Ubuntu: sudo apt install chromium-browser\n  \
         Fedora:         sudo dnf install chromium\n  \
         Alpine:         apk add chromium\n  \
         # Alternatives: brave-browser, microsoft-edge-stable"
    } else if cfg!(target_os = "windows") {
        "  winget install Google.Chrome\n  \
         # Alternatives: Microsoft.Edge, Brave.Brave"
    } else {
        "  Download from https://www.google.com/chrome/"
    };

    format!(
        "No Chromium-based browser found. Install one:\n\n\
         {instructions}\n\n\
         Or set the path manually:\n  \
         [browser]\n  \
         chrome_path = \"/path/to/browser\"\n\n\
         Or set the GOOGLE_CHROME_BIN or CHROME environment variable.\n\
         Without one, every login attempt falls back to downloading a\n\
         managed Chromium build."
    )
}

/// Ask the browser binary for its version string. Diagnostics only; launch
/// does not depend on this succeeding.
pub async fn browser_version(path: &Path) -> Option<String> {
    let output = tokio::process::Command::new(path)
        .arg("--version")
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!version.is_empty()).then_some(version)
}

/// Check browser availability at startup and warn if nothing was found.
///
/// Prints a visible warning to stderr and logs via tracing for log capture.
/// When a browser is found, its version string is probed and logged.
pub async fn check_and_warn(custom_path: Option<&str>) -> bool {
    let result = detect_browser(custom_path);

    match result.path {
        Some(ref path) => {
            let version = browser_version(path).await;
            tracing::info!(
                path = %path.display(),
                version = version.as_deref().unwrap_or("unknown"),
                "host browser detected"
            );
        },
        None => {
            // stderr for immediate visibility to users
            eprintln!("\n⚠️  No Chrome/Chromium found on this host!");
            eprintln!("{}", result.install_hint);
            eprintln!();

            tracing::warn!(
                "no Chrome/Chromium found on this host.\n{}",
                result.install_hint
            );
        },
    }

    result.found
}
