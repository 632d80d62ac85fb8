//! The externally visible operations: service banner, synchronous and
//! asynchronous login, task polling, and health.

use std::sync::Arc;

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    },
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::{info, warn},
};

use catalyst_browser::{Credentials, LoginOutcome};

use crate::state::AppState;

/// Body of `POST /login`.
///
/// Credentials are optional at the serde level so that a missing field maps
/// to the service's own 400 payload instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// When true, run the login in the background and return a task id.
    #[serde(default, rename = "async")]
    pub run_async: bool,
}

async fn banner_handler() -> &'static str {
    "Biopharm Catalyst Login Service"
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": state.version,
        "pending_tasks": state.tasks.pending_count(),
    }))
}

/// Synchronous and asynchronous login entry point.
///
/// Validation happens before the login service is touched: a request without
/// both credentials is rejected with 400 and never launches a browser.
async fn login_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let Ok(request) = serde_json::from_slice::<LoginRequest>(&body) else {
        return missing_credentials();
    };
    let (Some(email), Some(password)) = (request.email, request.password) else {
        return missing_credentials();
    };
    let credentials = Credentials { email, password };

    if request.run_async {
        let task_id = state.tasks.next_task_id();
        info!(task_id, "starting background login");

        let login = Arc::clone(&state.login);
        let tasks = Arc::clone(&state.tasks);
        let id = task_id.clone();
        // Detached on purpose: a client that never polls must not hold
        // anything open, and shutdown does not wait for in-flight attempts.
        tokio::spawn(async move {
            let outcome = login.login(credentials).await;
            if !outcome.success {
                warn!(
                    task_id = id,
                    error = outcome.error.as_deref().unwrap_or(""),
                    "background login failed"
                );
            }
            tasks.put(id, outcome);
        });

        return (
            StatusCode::ACCEPTED,
            Json(json!({
                "task_id": task_id,
                "message": "Login process started in background",
            })),
        );
    }

    let outcome = state.login.login(credentials).await;
    outcome_response(&state, outcome)
}

/// Poll an asynchronous login. Consuming read: a terminal result is returned
/// exactly once, after which the id reports pending again.
async fn task_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.tasks.take(&task_id) {
        Some(outcome) => outcome_response(&state, outcome),
        // Never submitted, still in flight, consumed, or expired — the
        // registry cannot tell these apart, so everything is "pending".
        None => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "pending",
                "message": "Task is still processing or does not exist",
            })),
        ),
    }
}

/// Map a completed outcome onto the HTTP surface: both cookie values on
/// success, the error payload on failure.
fn outcome_response(state: &AppState, outcome: LoginOutcome) -> (StatusCode, Json<Value>) {
    if outcome.success {
        let login = &state.config.login;
        let mut body = serde_json::Map::new();
        body.insert(
            login.csrf_cookie.clone(),
            Value::from(outcome.csrf_token.unwrap_or_default()),
        );
        body.insert(
            login.session_cookie.clone(),
            Value::from(outcome.session_cookie.unwrap_or_default()),
        );
        (StatusCode::OK, Json(Value::Object(body)))
    } else {
        let message = outcome.error.unwrap_or_else(|| "login failed".into());
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": message })),
        )
    }
}

fn missing_credentials() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Email and password are required" })),
    )
}

/// Create the service router.
pub fn login_router() -> Router<AppState> {
    Router::new()
        .route("/", get(banner_handler))
        .route("/health", get(health_handler))
        .route("/login", post(login_handler))
        .route("/task/{task_id}", get(task_handler))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_accepts_partial_bodies() {
        let request: LoginRequest = serde_json::from_str(r#"{"email": "a@b.c"}"#).unwrap();
        assert_eq!(request.email.as_deref(), Some("a@b.c"));
        assert!(request.password.is_none());
        assert!(!request.run_async);
    }

    #[test]
    fn login_request_reads_async_keyword() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"email": "a@b.c", "password": "pw", "async": true}"#)
                .unwrap();
        assert!(request.run_async);
    }
}
