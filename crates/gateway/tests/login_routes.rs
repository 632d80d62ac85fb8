//! Integration tests for the login service HTTP surface, driven over a real
//! socket with a scripted login service in place of the browser.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    serde_json::{Value, json},
    tokio::{net::TcpListener, sync::Notify},
};

use {
    catalyst_browser::{Credentials, LoginOutcome},
    catalyst_config::CatalystConfig,
    catalyst_gateway::{AppState, LoginService, build_app},
};

/// Scripted login service: counts calls, optionally parks until released,
/// then returns a canned outcome.
struct MockLoginService {
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    outcome: LoginOutcome,
}

impl MockLoginService {
    fn returning(outcome: LoginOutcome) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: None,
            outcome,
        })
    }

    fn gated(outcome: LoginOutcome) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Some(Arc::clone(&gate)),
            outcome,
        });
        (service, gate)
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LoginService for MockLoginService {
    async fn login(&self, _credentials: Credentials) -> LoginOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        self.outcome.clone()
    }
}

async fn start_server(service: Arc<MockLoginService>) -> SocketAddr {
    let state = AppState::new(CatalystConfig::default(), service);
    let app = build_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn post_login(addr: SocketAddr, body: &Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/login"))
        .json(body)
        .send()
        .await
        .unwrap()
}

async fn poll_task(addr: SocketAddr, task_id: &str) -> reqwest::Response {
    reqwest::get(format!("http://{addr}/task/{task_id}"))
        .await
        .unwrap()
}

#[tokio::test]
async fn banner_is_served_at_root() {
    let addr = start_server(MockLoginService::returning(LoginOutcome::failure("x"))).await;

    let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        "Biopharm Catalyst Login Service"
    );
}

#[tokio::test]
async fn missing_credentials_rejected_before_any_login() {
    let service = MockLoginService::returning(LoginOutcome::failure("x"));
    let addr = start_server(Arc::clone(&service)).await;

    for body in [
        json!({}),
        json!({ "email": "user@example.com" }),
        json!({ "password": "hunter2" }),
    ] {
        let response = post_login(addr, &body).await;
        assert_eq!(response.status(), 400);
        let payload: Value = response.json().await.unwrap();
        assert_eq!(payload["error"], "Email and password are required");
    }

    // Nothing reached the login service, so no browser would have launched.
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn empty_string_credentials_pass_validation() {
    let service = MockLoginService::returning(LoginOutcome::failure("bad credentials"));
    let addr = start_server(Arc::clone(&service)).await;

    let response = post_login(addr, &json!({ "email": "", "password": "" })).await;
    assert_eq!(response.status(), 500);
    assert_eq!(service.call_count(), 1);
}

#[tokio::test]
async fn sync_login_success_returns_both_cookies() {
    let service = MockLoginService::returning(LoginOutcome::success(
        "session-value".into(),
        "csrf-value".into(),
    ));
    let addr = start_server(service).await;

    let response = post_login(
        addr,
        &json!({ "email": "user@example.com", "password": "hunter2" }),
    )
    .await;
    assert_eq!(response.status(), 200);
    let payload: Value = response.json().await.unwrap();
    assert_eq!(payload["XSRF-TOKEN"], "csrf-value");
    assert_eq!(payload["biopharm_user_session"], "session-value");
}

#[tokio::test]
async fn sync_login_failure_maps_to_500() {
    let service = MockLoginService::returning(LoginOutcome::failure(
        "browser initialization failed: configured path: boom",
    ));
    let addr = start_server(service).await;

    let response = post_login(
        addr,
        &json!({ "email": "user@example.com", "password": "hunter2" }),
    )
    .await;
    assert_eq!(response.status(), 500);
    let payload: Value = response.json().await.unwrap();
    assert_eq!(
        payload["error"],
        "browser initialization failed: configured path: boom"
    );
}

#[tokio::test]
async fn async_login_lifecycle_delivers_result_exactly_once() {
    let (service, gate) = MockLoginService::gated(LoginOutcome::success(
        "session-value".into(),
        "csrf-value".into(),
    ));
    let addr = start_server(service).await;

    let response = post_login(
        addr,
        &json!({ "email": "user@example.com", "password": "hunter2", "async": true }),
    )
    .await;
    assert_eq!(response.status(), 202);
    let payload: Value = response.json().await.unwrap();
    let task_id = payload["task_id"].as_str().unwrap().to_string();
    assert_eq!(payload["message"], "Login process started in background");

    // Still in flight: polling reports pending.
    let response = poll_task(addr, &task_id).await;
    assert_eq!(response.status(), 202);
    let payload: Value = response.json().await.unwrap();
    assert_eq!(payload["status"], "pending");

    // Release the background login and poll until the result lands.
    gate.notify_one();
    let mut terminal = None;
    for _ in 0..50 {
        let response = poll_task(addr, &task_id).await;
        if response.status() != 202 {
            terminal = Some(response);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let terminal = terminal.expect("background task never completed");
    assert_eq!(terminal.status(), 200);
    let payload: Value = terminal.json().await.unwrap();
    assert_eq!(payload["biopharm_user_session"], "session-value");

    // Consumed: the same id reports pending again, never the result.
    let response = poll_task(addr, &task_id).await;
    assert_eq!(response.status(), 202);
}

#[tokio::test]
async fn async_failure_surfaces_on_poll() {
    let (service, gate) = MockLoginService::gated(LoginOutcome::failure("no form"));
    let addr = start_server(service).await;

    let response = post_login(
        addr,
        &json!({ "email": "user@example.com", "password": "hunter2", "async": true }),
    )
    .await;
    let payload: Value = response.json().await.unwrap();
    let task_id = payload["task_id"].as_str().unwrap().to_string();

    gate.notify_one();
    let mut terminal = None;
    for _ in 0..50 {
        let response = poll_task(addr, &task_id).await;
        if response.status() != 202 {
            terminal = Some(response);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let terminal = terminal.expect("background task never completed");
    assert_eq!(terminal.status(), 500);
    let payload: Value = terminal.json().await.unwrap();
    assert_eq!(payload["error"], "no form");
}

#[tokio::test]
async fn concurrent_async_submissions_get_distinct_ids() {
    let (service, gate) = MockLoginService::gated(LoginOutcome::failure("x"));
    let addr = start_server(Arc::clone(&service)).await;

    let body = json!({ "email": "user@example.com", "password": "hunter2", "async": true });
    let (first, second) = tokio::join!(post_login(addr, &body), post_login(addr, &body));

    let first: Value = first.json().await.unwrap();
    let second: Value = second.json().await.unwrap();
    assert_ne!(first["task_id"], second["task_id"]);

    // Unpark both background attempts so the server task pool drains.
    gate.notify_one();
    gate.notify_one();
}

#[tokio::test]
async fn health_reports_ok() {
    let addr = start_server(MockLoginService::returning(LoginOutcome::failure("x"))).await;

    let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    let payload: Value = response.json().await.unwrap();
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["pending_tasks"], 0);
}
