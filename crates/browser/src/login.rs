//! The login flow: navigate, locate the form, enter credentials, submit, and
//! harvest the session cookies.
//!
//! Field and submit discovery run through ordered strategy chains. Each
//! strategy is a JS probe over the document that, on a match, tags the chosen
//! element(s) with a `data-catalyst-*` attribute so later steps can address
//! them without holding element handles. The chain runner is generic over the
//! probe evaluator, so fallback ordering is testable without a browser.

use std::{
    future::Future,
    time::{Duration, Instant},
};

use {
    chromiumoxide::{
        Page,
        cdp::browser_protocol::input::{
            DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
            DispatchMouseEventType, MouseButton,
        },
    },
    serde_json::Value,
    tracing::{debug, error, info, warn},
};

use crate::{
    error::LoginError,
    launcher,
    types::{BrowserRuntimeConfig, COOKIES_MISSING, Credentials, LoginOutcome, LoginParams},
};

/// How often the form wait re-probes the DOM.
const FORM_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How often the post-submit cookie wait re-reads the jar.
const COOKIE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One element-discovery strategy: a named JS probe that, on success, tags
/// the matched element(s) with a data attribute and reports `true`.
#[derive(Debug)]
pub(crate) struct Strategy {
    pub(crate) name: &'static str,
    pub(crate) js: &'static str,
}

/// Field-discovery strategies, most specific first.
pub(crate) const FIELD_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "input-type",
        js: r#"(() => {
            const email = document.querySelector("input[type='email']");
            const password = document.querySelector("input[type='password']");
            if (!email || !password) return false;
            email.setAttribute('data-catalyst-field', 'email');
            password.setAttribute('data-catalyst-field', 'password');
            return true;
        })()"#,
    },
    Strategy {
        name: "form-position",
        js: r#"(() => {
            const form = document.querySelector('form');
            if (!form) return false;
            const inputs = form.querySelectorAll('input');
            if (inputs.length < 2) return false;
            inputs[0].setAttribute('data-catalyst-field', 'email');
            inputs[1].setAttribute('data-catalyst-field', 'password');
            return true;
        })()"#,
    },
    Strategy {
        name: "label-text",
        js: r#"(() => {
            const inputAfterLabel = (text) => {
                for (const label of document.querySelectorAll('label')) {
                    if (!label.textContent.includes(text)) continue;
                    let el = label.nextElementSibling;
                    while (el && el.tagName !== 'INPUT') el = el.nextElementSibling;
                    if (el) return el;
                }
                return null;
            };
            const email = inputAfterLabel('Email');
            const password = inputAfterLabel('Password');
            if (!email || !password) return false;
            email.setAttribute('data-catalyst-field', 'email');
            password.setAttribute('data-catalyst-field', 'password');
            return true;
        })()"#,
    },
];

/// Submit-control strategies, most specific first.
pub(crate) const SUBMIT_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "submit-type",
        js: r#"(() => {
            const el = document.querySelector("button[type='submit'], input[type='submit']");
            if (!el) return false;
            el.setAttribute('data-catalyst-submit', '1');
            return true;
        })()"#,
    },
    Strategy {
        name: "button-text",
        js: r#"(() => {
            for (const button of document.querySelectorAll('button')) {
                if (button.textContent.trim() === 'Login') {
                    button.setAttribute('data-catalyst-submit', '1');
                    return true;
                }
            }
            return false;
        })()"#,
    },
    Strategy {
        name: "form-button",
        js: r#"(() => {
            const form = document.querySelector('form');
            if (!form) return false;
            const button = form.querySelector('button');
            if (!button) return false;
            button.setAttribute('data-catalyst-submit', '1');
            return true;
        })()"#,
    },
];

/// Run one complete login attempt: launch, drive, harvest, tear down.
///
/// Never returns an error. Every failure mode (launch, flow, missing
/// cookies) is converted into an unsuccessful [`LoginOutcome`] after the
/// browser session has been released.
pub async fn run_login(
    browser: &BrowserRuntimeConfig,
    params: &LoginParams,
    credentials: &Credentials,
) -> LoginOutcome {
    let session = match launcher::launch(browser).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "browser initialization failed");
            return LoginOutcome::failure(e.to_string());
        },
    };

    let outcome = drive(session.page(), params, credentials).await;

    // Single release point: runs whether the flow returned or unwound into
    // an error.
    session.close().await;

    match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "login attempt failed");
            LoginOutcome::failure(e.to_string())
        },
    }
}

/// Drive the page through the login sequence. Errors unwind to
/// [`run_login`], which owns session teardown.
async fn drive(
    page: &Page,
    params: &LoginParams,
    credentials: &Credentials,
) -> Result<LoginOutcome, LoginError> {
    page.goto(params.url.as_str())
        .await
        .map_err(|e| LoginError::Navigation(e.to_string()))?;
    debug!(url = params.url, "navigated to login page");

    // Give client-side rendering and anti-bot interstitials a moment before
    // probing for the form.
    tokio::time::sleep(params.settle_delay).await;
    wait_for_form(page, params.form_timeout).await?;

    let strategy = run_chain(FIELD_STRATEGIES, |js| eval_bool(page, js))
        .await
        .map_err(|attempted| LoginError::FieldsNotFound { attempted })?;
    debug!(strategy = strategy.name, "located credential fields");

    type_into(page, "email", &credentials.email).await?;
    type_into(page, "password", &credentials.password).await?;

    let strategy = run_chain(SUBMIT_STRATEGIES, |js| eval_bool(page, js))
        .await
        .map_err(|attempted| LoginError::SubmitNotFound { attempted })?;
    debug!(strategy = strategy.name, "located submit control");

    click_submit(page).await?;

    let (session_cookie, csrf_token) = await_cookies(page, params).await?;
    Ok(compose_outcome(session_cookie, csrf_token))
}

/// Run a strategy chain: evaluate each probe in order and return the first
/// strategy that reports a match, or the list of attempted names. A probe
/// that errors counts as a non-match; the chain moves on.
pub(crate) async fn run_chain<'a, E, Fut>(
    strategies: &'a [Strategy],
    mut probe: E,
) -> Result<&'a Strategy, Vec<&'static str>>
where
    E: FnMut(&'static str) -> Fut,
    Fut: Future<Output = Result<bool, LoginError>>,
{
    let mut attempted = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        attempted.push(strategy.name);
        match probe(strategy.js).await {
            Ok(true) => return Ok(strategy),
            Ok(false) => debug!(strategy = strategy.name, "strategy found no match"),
            Err(e) => warn!(strategy = strategy.name, error = %e, "strategy probe failed"),
        }
    }
    Err(attempted)
}

/// Evaluate a JS expression expected to yield a boolean.
async fn eval_bool(page: &Page, js: &str) -> Result<bool, LoginError> {
    let matched: bool = page
        .evaluate(js)
        .await
        .map_err(|e| LoginError::JsEval(e.to_string()))?
        .into_value()
        .unwrap_or(false);
    Ok(matched)
}

/// Wait for any `<form>` element to appear.
async fn wait_for_form(page: &Page, timeout: Duration) -> Result<(), LoginError> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if eval_bool(page, "document.querySelector('form') !== null").await? {
            debug!("login form present");
            return Ok(());
        }
        tokio::time::sleep(FORM_POLL_INTERVAL).await;
    }
    Err(LoginError::FormNotFound(timeout.as_millis() as u64))
}

/// Focus a marked field and type the value verbatim, one key event pair per
/// character.
async fn type_into(page: &Page, field: &str, text: &str) -> Result<(), LoginError> {
    let focus_js = format!(
        r#"(() => {{
            const el = document.querySelector(`[data-catalyst-field="{field}"]`);
            if (!el) return false;
            el.focus();
            return true;
        }})()"#
    );
    if !eval_bool(page, &focus_js).await? {
        return Err(LoginError::JsEval(format!(
            "marked {field} field disappeared"
        )));
    }

    for c in text.chars() {
        let key_down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .text(c.to_string())
            .build()
            .map_err(|e| LoginError::Cdp(e.to_string()))?;
        page.execute(key_down)
            .await
            .map_err(|e| LoginError::Cdp(e.to_string()))?;

        let key_up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .text(c.to_string())
            .build()
            .map_err(|e| LoginError::Cdp(e.to_string()))?;
        page.execute(key_up)
            .await
            .map_err(|e| LoginError::Cdp(e.to_string()))?;
    }

    debug!(field, chars = text.len(), "typed field value");
    Ok(())
}

/// Click the marked submit control with trusted mouse events at its center.
async fn click_submit(page: &Page) -> Result<(), LoginError> {
    let center_js = r#"(() => {
        const el = document.querySelector('[data-catalyst-submit]');
        if (!el) return null;
        el.scrollIntoView({ behavior: 'instant', block: 'center' });
        const rect = el.getBoundingClientRect();
        return { x: rect.x + rect.width / 2, y: rect.y + rect.height / 2 };
    })()"#;

    let center: Value = page
        .evaluate(center_js)
        .await
        .map_err(|e| LoginError::JsEval(e.to_string()))?
        .into_value()
        .map_err(|e| LoginError::JsEval(format!("{e:?}")))?;
    let (Some(x), Some(y)) = (center["x"].as_f64(), center["y"].as_f64()) else {
        return Err(LoginError::JsEval("marked submit control disappeared".into()));
    };

    // Small delay for the scroll to land before dispatching the click.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let press = DispatchMouseEventParams::builder()
        .r#type(DispatchMouseEventType::MousePressed)
        .x(x)
        .y(y)
        .button(MouseButton::Left)
        .click_count(1)
        .build()
        .map_err(|e| LoginError::Cdp(e.to_string()))?;
    page.execute(press)
        .await
        .map_err(|e| LoginError::Cdp(e.to_string()))?;

    let release = DispatchMouseEventParams::builder()
        .r#type(DispatchMouseEventType::MouseReleased)
        .x(x)
        .y(y)
        .button(MouseButton::Left)
        .click_count(1)
        .build()
        .map_err(|e| LoginError::Cdp(e.to_string()))?;
    page.execute(release)
        .await
        .map_err(|e| LoginError::Cdp(e.to_string()))?;

    debug!(x, y, "clicked submit control");
    Ok(())
}

/// Poll the session's cookie jar until both target cookies are present or
/// the bounded wait elapses. Timing out is not an error: the caller turns an
/// incomplete pair into an unsuccessful outcome.
async fn await_cookies(
    page: &Page,
    params: &LoginParams,
) -> Result<(Option<String>, Option<String>), LoginError> {
    let deadline = Instant::now() + params.cookie_timeout;
    loop {
        let cookies = page
            .get_cookies()
            .await
            .map_err(|e| LoginError::Cdp(format!("read cookies: {e}")))?;
        let pair = extract_cookies(
            cookies.iter().map(|c| (c.name.as_str(), c.value.as_str())),
            &params.session_cookie,
            &params.csrf_cookie,
        );
        if pair.0.is_some() && pair.1.is_some() {
            return Ok(pair);
        }
        if Instant::now() >= deadline {
            return Ok(pair);
        }
        tokio::time::sleep(COOKIE_POLL_INTERVAL).await;
    }
}

/// Pull the session and CSRF cookies out of the full cookie list; everything
/// else is discarded.
fn extract_cookies<'a>(
    cookies: impl IntoIterator<Item = (&'a str, &'a str)>,
    session_name: &str,
    csrf_name: &str,
) -> (Option<String>, Option<String>) {
    let mut session = None;
    let mut csrf = None;
    for (name, value) in cookies {
        if name == session_name {
            session = Some(value.to_string());
        } else if name == csrf_name {
            csrf = Some(value.to_string());
        }
    }
    (session, csrf)
}

/// Success requires both cookies. Anything less is an unsuccessful outcome
/// with a fixed message, even though nothing errored along the way.
fn compose_outcome(session_cookie: Option<String>, csrf_token: Option<String>) -> LoginOutcome {
    match (session_cookie, csrf_token) {
        (Some(session), Some(csrf)) => {
            info!("login cookies captured");
            LoginOutcome::success(session, csrf)
        },
        (session, csrf) => {
            warn!(
                have_session = session.is_some(),
                have_csrf = csrf.is_some(),
                "login completed without the required cookies"
            );
            LoginOutcome::failure(COOKIES_MISSING)
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_strategies_ordered_most_specific_first() {
        let names: Vec<_> = FIELD_STRATEGIES.iter().map(|s| s.name).collect();
        assert_eq!(names, ["input-type", "form-position", "label-text"]);

        let names: Vec<_> = SUBMIT_STRATEGIES.iter().map(|s| s.name).collect();
        assert_eq!(names, ["submit-type", "button-text", "form-button"]);
    }

    #[test]
    fn every_field_strategy_marks_both_fields() {
        for strategy in FIELD_STRATEGIES {
            assert!(strategy.js.contains("data-catalyst-field"), "{}", strategy.name);
        }
        for strategy in SUBMIT_STRATEGIES {
            assert!(strategy.js.contains("data-catalyst-submit"), "{}", strategy.name);
        }
    }

    #[tokio::test]
    async fn chain_falls_back_when_primary_fails() {
        // Primary strategy reports no match; the positional fallback matches.
        let matched = run_chain(FIELD_STRATEGIES, |js| {
            let result = js == FIELD_STRATEGIES[1].js;
            async move { Ok(result) }
        })
        .await
        .unwrap();
        assert_eq!(matched.name, "form-position");
    }

    #[tokio::test]
    async fn chain_treats_probe_errors_as_non_matches() {
        let matched = run_chain(FIELD_STRATEGIES, |js| {
            let outcome = if js == FIELD_STRATEGIES[0].js {
                Err(LoginError::JsEval("stubbed failure".into()))
            } else if js == FIELD_STRATEGIES[2].js {
                Ok(true)
            } else {
                Ok(false)
            };
            async move { outcome }
        })
        .await
        .unwrap();
        assert_eq!(matched.name, "label-text");
    }

    #[tokio::test]
    async fn chain_reports_every_attempt_when_nothing_matches() {
        let attempted = run_chain(SUBMIT_STRATEGIES, |_| async { Ok(false) })
            .await
            .unwrap_err();
        assert_eq!(attempted, ["submit-type", "button-text", "form-button"]);
    }

    #[test]
    fn extract_cookies_picks_targets_and_discards_rest() {
        let cookies = [
            ("_ga", "tracker"),
            ("XSRF-TOKEN", "csrf-value"),
            ("biopharm_user_session", "session-value"),
            ("other", "noise"),
        ];
        let (session, csrf) =
            extract_cookies(cookies, "biopharm_user_session", "XSRF-TOKEN");
        assert_eq!(session.as_deref(), Some("session-value"));
        assert_eq!(csrf.as_deref(), Some("csrf-value"));
    }

    #[test]
    fn compose_requires_both_cookies() {
        let outcome = compose_outcome(Some("sess".into()), Some("csrf".into()));
        assert!(outcome.success);

        let outcome = compose_outcome(Some("sess".into()), None);
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some(COOKIES_MISSING));

        let outcome = compose_outcome(None, None);
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some(COOKIES_MISSING));
    }

    #[test]
    fn repeated_cookie_misses_compose_identically() {
        let first = compose_outcome(None, Some("csrf".into()));
        let second = compose_outcome(None, Some("csrf".into()));
        assert_eq!(first, second);
    }
}
