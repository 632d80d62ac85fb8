//! Scripted Chrome/Chromium login against Biopharm Catalyst over CDP.
//!
//! The launcher produces one headless browser session with a fixed
//! anti-detection profile, trying several initialization strategies until one
//! yields a running browser. The login flow then drives the session through
//! the account login form, with fallback element-discovery strategies for
//! each step, and harvests the session and CSRF-token cookies.
//!
//! # Example
//!
//! ```ignore
//! use catalyst_browser::{run_login, BrowserRuntimeConfig, Credentials, LoginParams};
//!
//! let outcome = run_login(
//!     &BrowserRuntimeConfig::default(),
//!     &LoginParams::default(),
//!     &Credentials {
//!         email: "user@example.com".into(),
//!         password: "hunter2".into(),
//!     },
//! )
//! .await;
//! ```

pub mod detect;
pub mod error;
pub mod launcher;
pub mod login;
pub mod types;

pub use {
    error::LoginError,
    launcher::BrowserSession,
    login::run_login,
    types::{BrowserRuntimeConfig, Credentials, LoginOutcome, LoginParams},
};
