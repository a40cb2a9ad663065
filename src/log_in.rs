//! This file defines the route handlers and view for the log-in page.
//!
//! The log-in form never checks credentials. Clicking "Login" shows a
//! spinner and sends the browser to the account overview page after a delay.

use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, PreEscaped, html};
use time::OffsetDateTime;

use crate::{
    AppState,
    app_state::LogInPageConfig,
    balances::Balances,
    html::{BUTTON_PRIMARY_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement, base, loading_spinner},
    session::{get_session_id, set_session_cookie},
    transfer::{TransferForm, TransferRecord, record_transfer},
};

const LOG_IN_STYLE: &str = r#"
.header {
    text-align: center;
    padding: 10px 0;
    border-radius: 5px 5px 0 0;
}

.header h1 {
    font-size: 24px;
    font-weight: bold;
    margin-bottom: 20px;
}

.content {
    padding: 20px;
    text-align: center;
    margin-top: 50px;
}

.container {
    max-width: 420px;
    margin: 0 auto;
}

.field {
    margin-bottom: 1rem;
}

.form-control {
    box-sizing: border-box;
    border: 1px solid #6c757d;
    border-radius: 5px;
    padding: 10px;
    width: 100%;
}

.button {
    background-color: #28a745;
    color: #fff;
    font-weight: bold;
    border: none;
    border-radius: 5px;
    padding: 12px 24px;
    cursor: pointer;
    transition: background-color 0.3s;
    width: 100%;
}

.button:hover {
    background-color: #218838;
}

.loading {
    width: 50px;
    height: 50px;
    border: 3px solid #fff;
    border-top-color: #28a745;
    border-radius: 50%;
    animation: spin 1s linear infinite;
    margin: 20px auto 0;
}

@keyframes spin {
    to {
        transform: rotate(360deg);
    }
}

.footer {
    position: fixed;
    bottom: 0;
    left: 0;
    width: 100%;
    background-color: #343a40;
    display: flex;
    justify-content: space-around;
    align-items: center;
    padding: 10px 0;
}

.footer a {
    color: #fff;
    padding: 5px;
    text-decoration: none;
}
"#;

// The redirect target and delay are read from the button's data attributes.
const LOG_IN_SCRIPT: &str = r#"
function logIn() {
    var button = document.getElementById('log-in-button');

    document.getElementById('loading').style.display = 'block';
    button.textContent = 'Verifying...';

    setTimeout(function () {
        window.location.href = button.dataset.redirectUrl;
    }, Number(button.dataset.redirectDelayMs));
}
"#;

fn log_in_form(config: &LogInPageConfig) -> Markup {
    html! {
        form id="log-in-form"
        {
            div class="field"
            {
                input
                    type="text"
                    id="username"
                    name="username"
                    class=(FORM_TEXT_INPUT_STYLE)
                    placeholder="Username"
                    autocomplete="off"
                    required;
            }

            div class="field"
            {
                input
                    type="password"
                    id="password"
                    name="password"
                    class=(FORM_TEXT_INPUT_STYLE)
                    placeholder="Password"
                    autocomplete="off"
                    required;
            }

            div class="actions"
            {
                button
                    type="button"
                    id="log-in-button"
                    class=(BUTTON_PRIMARY_STYLE)
                    onclick="logIn()"
                    data-redirect-url=(config.account_overview_url)
                    data-redirect-delay-ms=(config.redirect_delay.as_millis())
                {
                    "Login"
                }

                (loading_spinner("loading"))
            }
        }
    }
}

fn footer(config: &LogInPageConfig, year: i32) -> Markup {
    html! {
        footer class="footer"
        {
            nav
            {
                a href=(config.contact_url) { "Contact Us" }
                a href=(config.about_url) { "About Us" }
                a href=(config.transfer_funds_url) { "Transfer Funds" }
            }

            div { "© " (year) " " (config.bank_name) }
        }
    }
}

/// The account balances, present in the page but never displayed.
fn hidden_balances(balances: &Balances) -> Markup {
    html! {
        div id="balances" style="display: none;"
        {
            @for (account, balance) in balances.entries()
            {
                span data-account=(account) { (balance) }
            }
        }
    }
}

fn log_in_view(config: &LogInPageConfig, balances: &Balances, now: OffsetDateTime) -> Markup {
    let content = html! {
        header class="header"
        {
            h1 { (config.bank_name) }
        }

        main class="content"
        {
            div class="container"
            {
                (log_in_form(config))
            }
        }

        (footer(config, now.year()))
        (hidden_balances(balances))
    };

    base(
        "Log In",
        &[
            HeadElement::Style(PreEscaped(LOG_IN_STYLE)),
            HeadElement::ScriptSource(PreEscaped(LOG_IN_SCRIPT)),
        ],
        &content,
    )
}

/// Display the log-in page.
///
/// Starts a session for new visitors and seeds its balances.
pub async fn get_log_in_page(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    render_log_in_page(&state, jar, None)
}

/// Display the log-in page after a form has been posted to it.
///
/// A transfer record is built from the posted `recipient` and `amount` and
/// then dropped. The body is not validated: a missing or malformed body is
/// treated as a form with empty fields, and the page is the same as for a
/// GET request.
pub async fn post_log_in_page(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    form: Result<Form<TransferForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!("Treating unreadable transfer form as empty: {rejection}");
            TransferForm::default()
        }
    };

    render_log_in_page(&state, jar, Some(form))
}

fn render_log_in_page(
    state: &AppState,
    jar: PrivateCookieJar,
    transfer_form: Option<TransferForm>,
) -> Response {
    let now = OffsetDateTime::now_utc();

    let session_id = get_session_id(&jar);
    let session = match state
        .session_store
        .load_or_create(session_id, now, &mut rand::thread_rng())
    {
        Ok(session) => session,
        Err(error) => return error.into_response(),
    };

    if let Some(form) = transfer_form {
        let record = TransferRecord::new(now, session.username.as_deref(), form);
        let transfer_history = record_transfer(Vec::new(), record);
        tracing::debug!(
            "Built {} transfer record(s) for session {}, not applied",
            transfer_history.len(),
            session.id
        );
    }

    let jar = set_session_cookie(jar, session.id, state.session_ttl, state.secure_cookies);

    (jar, log_in_view(&state.page_config, &session.balances, now)).into_response()
}


#[cfg(test)]
mod log_in_page_tests {
    use axum::{
        Form,
        extract::State,
        http::{StatusCode, header::SET_COOKIE},
        response::Response,
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
    use axum_test::{TestResponse, TestServer};
    use scraper::{Html, Selector};
    use time::{Duration, OffsetDateTime};

    use super::{get_log_in_page, post_log_in_page};
    use crate::{
        AppState, BALANCE_RANGE, LogInPageConfig, build_router, endpoints,
        session::{COOKIE_SESSION_ID, set_session_cookie},
        test_utils::{
            assert_content_type, assert_status_ok, assert_valid_html, parse_html_document,
        },
        transfer::TransferForm,
    };

    fn get_test_state() -> AppState {
        AppState::new("foobar", false, LogInPageConfig::default())
    }

    fn get_test_server(state: AppState) -> TestServer {
        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    fn session_cookie(response: &TestResponse) -> Cookie<'static> {
        response.cookie(COOKIE_SESSION_ID)
    }

    fn rendered_balances(response: &TestResponse) -> Vec<u32> {
        Html::parse_document(&response.text())
            .select(&Selector::parse("#balances span").unwrap())
            .map(|span| {
                span.text()
                    .collect::<String>()
                    .parse()
                    .expect("balance should be an integer")
            })
            .collect()
    }

    /// The form, footer links and balances of the page as HTML. Leaves out
    /// the footer year so pages rendered either side of New Year compare equal.
    fn page_structure(response: &TestResponse) -> Vec<String> {
        Html::parse_document(&response.text())
            .select(&Selector::parse("form, footer a, #balances").unwrap())
            .map(|element| element.html())
            .collect()
    }

    #[track_caller]
    fn assert_sets_session_cookie(response: &Response) {
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .expect("Set-Cookie header missing")
            .to_str()
            .unwrap();
        let cookie = Cookie::parse(set_cookie).unwrap();

        assert_eq!(cookie.name(), COOKIE_SESSION_ID);
        assert_eq!(cookie.http_only(), Some(true));
    }

    #[tokio::test]
    async fn get_displays_page_and_sets_session_cookie() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = get_log_in_page(State(state.clone()), jar).await;

        assert_status_ok(&response);
        assert_content_type(&response, "text/html; charset=utf-8");
        assert_sets_session_cookie(&response);
        assert_eq!(state.session_store.len(), Ok(1));

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let balances = document
            .select(&Selector::parse("#balances span").unwrap())
            .map(|span| span.text().collect::<String>().parse::<u32>().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(balances.len(), 4);
        for balance in balances {
            assert!(BALANCE_RANGE.contains(&balance), "got balance {balance}");
        }
    }

    #[tokio::test]
    async fn session_cookie_follows_app_state() {
        let state = AppState::new("foobar", true, LogInPageConfig::default())
            .with_session_ttl(Duration::hours(1));
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = get_log_in_page(State(state), jar).await;

        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .expect("Set-Cookie header missing")
            .to_str()
            .unwrap();
        let cookie = Cookie::parse(set_cookie).unwrap();
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(Duration::hours(1)));
        assert_eq!(cookie.path(), Some("/"));
        assert!(set_cookie.contains("Max-Age=3600"), "got {set_cookie}");
    }

    #[tokio::test]
    async fn session_cookie_is_not_secure_without_tls() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = get_log_in_page(State(state), jar).await;

        let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        let cookie = Cookie::parse(set_cookie).unwrap();
        assert_ne!(cookie.secure(), Some(true));
    }

    #[tokio::test]
    async fn repeated_gets_show_same_balances() {
        let server = get_test_server(get_test_state());

        let first = server.get(endpoints::ROOT).await;
        first.assert_status_ok();
        let second = server
            .get(endpoints::ROOT)
            .add_cookie(session_cookie(&first))
            .await;
        second.assert_status_ok();

        assert_eq!(rendered_balances(&first), rendered_balances(&second));
    }

    #[tokio::test]
    async fn requests_without_cookie_start_new_sessions() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        server.get(endpoints::ROOT).await.assert_status_ok();
        server.get(endpoints::ROOT).await.assert_status_ok();

        assert_eq!(state.session_store.len(), Ok(2));
    }

    #[tokio::test]
    async fn post_renders_same_page_as_get() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        let get_response = server.get(endpoints::ROOT).await;
        get_response.assert_status_ok();
        let post_response = server
            .post(endpoints::ROOT)
            .add_cookie(session_cookie(&get_response))
            .form(&[("recipient", "bob"), ("amount", "100")])
            .await;
        post_response.assert_status_ok();

        assert_valid_html(&Html::parse_document(&post_response.text()));
        assert_eq!(page_structure(&get_response), page_structure(&post_response));
        assert_eq!(state.session_store.len(), Ok(1));
    }

    #[tokio::test]
    async fn post_does_not_change_balances() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        let before = server.get(endpoints::ROOT).await;
        let cookie = session_cookie(&before);

        for _ in 0..3 {
            server
                .post(endpoints::ROOT)
                .add_cookie(cookie.clone())
                .form(&[("recipient", "bob"), ("amount", "100")])
                .await
                .assert_status_ok();
        }

        let after = server.get(endpoints::ROOT).add_cookie(cookie).await;
        assert_eq!(rendered_balances(&before), rendered_balances(&after));
    }

    #[tokio::test]
    async fn post_with_empty_amount_succeeds() {
        let server = get_test_server(get_test_state());

        let get_response = server.get(endpoints::ROOT).await;
        let post_response = server
            .post(endpoints::ROOT)
            .add_cookie(session_cookie(&get_response))
            .form(&[("recipient", "bob"), ("amount", "")])
            .await;

        post_response.assert_status(StatusCode::OK);
        assert_eq!(page_structure(&get_response), page_structure(&post_response));
    }

    #[tokio::test]
    async fn post_without_form_body_succeeds() {
        let server = get_test_server(get_test_state());

        let response = server.post(endpoints::ROOT).text("not a form").await;

        response.assert_status(StatusCode::OK);
        assert_eq!(rendered_balances(&response).len(), 4);
    }

    #[tokio::test]
    async fn post_with_username_in_session_succeeds() {
        let state = get_test_state();
        let session = state
            .session_store
            .load_or_create(None, OffsetDateTime::now_utc(), &mut rand::thread_rng())
            .unwrap();
        state.session_store.set_username(session.id, "alice");
        let jar = set_session_cookie(
            PrivateCookieJar::new(state.cookie_key.clone()),
            session.id,
            Duration::hours(1),
            false,
        );

        let response = post_log_in_page(
            State(state.clone()),
            jar,
            Ok(Form(TransferForm {
                recipient: "bob".to_owned(),
                amount: "100".to_owned(),
            })),
        )
        .await;

        assert_status_ok(&response);
        let stored = state.session_store.get(session.id).unwrap().unwrap();
        assert_eq!(stored.balances, Some(session.balances));
        assert_eq!(stored.username.as_deref(), Some("alice"));
        assert_eq!(state.session_store.len(), Ok(1));
    }

    #[tokio::test]
    async fn malformed_session_cookie_starts_new_session() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone())
            .add(Cookie::new(COOKIE_SESSION_ID, "not-a-session-id"));

        let response = get_log_in_page(State(state.clone()), jar).await;

        assert_status_ok(&response);
        assert_sets_session_cookie(&response);
        assert_eq!(state.session_store.len(), Ok(1));
    }
}
