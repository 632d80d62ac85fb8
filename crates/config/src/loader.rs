use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    error::{Context as _, Error, Result},
    schema::CatalystConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "catalyst.toml",
    "catalyst.yaml",
    "catalyst.yml",
    "catalyst.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<CatalystConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply environment
/// overrides.
///
/// Search order:
/// 1. `./catalyst.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/catalyst/catalyst.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `CatalystConfig::default()` if no config file is found.
pub fn discover_and_load() -> CatalystConfig {
    let mut config = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                CatalystConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        CatalystConfig::default()
    };

    apply_env_overrides(&mut config);
    config
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/catalyst/
    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/catalyst/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "catalyst").map(|d| d.config_dir().to_path_buf())
}

/// Apply environment overrides on top of a loaded config.
///
/// `PORT` follows the original deployment's convention. `GOOGLE_CHROME_BIN`
/// is the Heroku browser-binary slot; its presence also flags the container
/// platform. `CHROME` is the conventional local override, and
/// `CHROME_FETCH_DIR` / `CATALYST_CONTAINER` tune the launcher directly.
pub fn apply_env_overrides(config: &mut CatalystConfig) {
    if let Ok(port) = std::env::var("PORT") {
        match port.parse() {
            Ok(p) => config.server.port = p,
            Err(_) => warn!(port, "ignoring unparseable PORT"),
        }
    }

    if let Ok(path) = std::env::var("GOOGLE_CHROME_BIN") {
        config.browser.chrome_path = Some(path);
        config.browser.container = true;
    }

    if config.browser.chrome_path.is_none()
        && let Ok(path) = std::env::var("CHROME")
    {
        config.browser.chrome_path = Some(path);
    }

    if let Ok(dir) = std::env::var("CHROME_FETCH_DIR") {
        config.browser.fetch_dir = Some(dir.into());
    }

    if std::env::var("CATALYST_CONTAINER").is_ok_and(|v| v != "0") {
        config.browser.container = true;
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<CatalystConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).with_context(|| format!("invalid {}", path.display())),
        "yaml" | "yml" => {
            serde_yaml::from_str(raw).with_context(|| format!("invalid {}", path.display()))
        },
        "json" => serde_json::from_str(raw).with_context(|| format!("invalid {}", path.display())),
        _ => Err(Error::Message(format!("unsupported config format: .{ext}"))),
    }
}
