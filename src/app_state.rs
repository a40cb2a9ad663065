//! Implements a struct that holds the state of the REST server.

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::session::{DEFAULT_SESSION_TTL, SessionStore};

/// The default page the browser is sent to after logging in.
pub const DEFAULT_ACCOUNT_OVERVIEW_URL: &str = "/account_overview";
/// The default target of the "Transfer Funds" footer link.
pub const DEFAULT_TRANSFER_FUNDS_URL: &str = "/transfer_funds";
/// The default target of the "Contact Us" footer link.
pub const DEFAULT_CONTACT_URL: &str = "https://example.com/contact";
/// The default target of the "About Us" footer link.
pub const DEFAULT_ABOUT_URL: &str = "https://example.com/about";
/// How long the log-in page waits before redirecting, by default.
pub const DEFAULT_REDIRECT_DELAY: std::time::Duration = std::time::Duration::from_secs(10);

/// What the log-in page shows and where its links lead.
#[derive(Debug, Clone, PartialEq)]
pub struct LogInPageConfig {
    /// The bank name shown in the page header and footer.
    pub bank_name: String,
    /// How long the page shows the spinner before redirecting.
    pub redirect_delay: std::time::Duration,
    /// Where the browser goes once the redirect delay has elapsed.
    pub account_overview_url: String,
    /// The target of the "Transfer Funds" footer link.
    pub transfer_funds_url: String,
    /// The target of the "Contact Us" footer link.
    pub contact_url: String,
    /// The target of the "About Us" footer link.
    pub about_url: String,
}

impl Default for LogInPageConfig {
    fn default() -> Self {
        Self {
            bank_name: "Example Bank".to_owned(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            account_overview_url: DEFAULT_ACCOUNT_OVERVIEW_URL.to_owned(),
            transfer_funds_url: DEFAULT_TRANSFER_FUNDS_URL.to_owned(),
            contact_url: DEFAULT_CONTACT_URL.to_owned(),
            about_url: DEFAULT_ABOUT_URL.to_owned(),
        }
    }
}

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// How long a session lives without being seen before it is discarded.
    pub session_ttl: Duration,

    /// Whether session cookies should only be sent over HTTPS.
    pub secure_cookies: bool,

    /// The sessions of all visitors.
    pub session_store: SessionStore,

    /// The content and links of the log-in page.
    pub page_config: LogInPageConfig,
}

impl AppState {
    /// Create a new [AppState] with an empty session store.
    ///
    /// Sessions expire after [DEFAULT_SESSION_TTL], use [AppState::with_session_ttl]
    /// to change this.
    pub fn new(cookie_secret: &str, secure_cookies: bool, page_config: LogInPageConfig) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            session_ttl: DEFAULT_SESSION_TTL,
            secure_cookies,
            session_store: SessionStore::new(),
            page_config,
        }
    }

    /// Set how long an idle session is kept.
    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
