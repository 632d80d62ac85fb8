//! Configuration loading for the catalyst login gateway.
//!
//! Config files: `catalyst.toml`, `catalyst.yaml`, or `catalyst.json`,
//! searched in `./` then `~/.config/catalyst/`. Environment variables
//! override individual fields after the file is loaded; see
//! [`loader::apply_env_overrides`] for the recognized variables.

pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{BrowserConfig, CatalystConfig, LoginConfig, ServerConfig},
};
