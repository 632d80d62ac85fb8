//! Login error types.

use thiserror::Error;

/// Errors raised while launching the browser or driving the login flow.
///
/// Cookie absence after a clean click-through is not an error here; it is
/// reported as an unsuccessful [`LoginOutcome`](crate::types::LoginOutcome)
/// with a fixed message.
#[derive(Debug, Error)]
pub enum LoginError {
    /// Every launch strategy failed. Carries one message per attempt.
    #[error("browser initialization failed: {}", .attempts.join("; "))]
    BrowserInit { attempts: Vec<String> },

    #[error("managed browser download failed: {0}")]
    Fetch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("no login form appeared within {0}ms")]
    FormNotFound(u64),

    #[error("could not locate email/password fields (tried: {})", .attempted.join(", "))]
    FieldsNotFound { attempted: Vec<&'static str> },

    #[error("could not locate a submit control (tried: {})", .attempted.join(", "))]
    SubmitNotFound { attempted: Vec<&'static str> },

    #[error("JavaScript evaluation failed: {0}")]
    JsEval(String),

    #[error("CDP error: {0}")]
    Cdp(String),
}

impl From<chromiumoxide::error::CdpError> for LoginError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        LoginError::Cdp(err.to_string())
    }
}
