//! Per-visitor sessions, kept in memory and identified by a private cookie.

use std::{
    collections::HashMap,
    fmt::{self, Display},
    sync::{Arc, Mutex, MutexGuard},
};

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use rand::Rng;
use time::{Duration, OffsetDateTime};

use crate::{Error, balances::Balances};

pub(crate) const COOKIE_SESSION_ID: &str = "session_id";
/// How long a session lives without being seen, by default.
pub const DEFAULT_SESSION_TTL: Duration = Duration::hours(24);

/// Identifies a visitor's session.
///
/// Session IDs are 128 random bits, formatted as 32 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u128);

impl SessionId {
    /// Create a new random session ID.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self(rng.r#gen())
    }

    /// Parse a session ID from its hex form, returning `None` if `text` is
    /// not exactly 32 hex digits.
    pub fn parse(text: &str) -> Option<Self> {
        if text.len() != 32 || !text.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return None;
        }

        u128::from_str_radix(text, 16).ok().map(Self)
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// The data kept for a single session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionData {
    /// The account balances, set on the first page load.
    pub balances: Option<Balances>,
    /// The name of the signed-in user, if another page has set one.
    pub username: Option<String>,
    /// When the session was last used.
    pub last_seen: OffsetDateTime,
}

impl SessionData {
    fn new(now: OffsetDateTime) -> Self {
        Self {
            balances: None,
            username: None,
            last_seen: now,
        }
    }
}

/// A session that has been loaded for the current request.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    /// The session's ID, to be sent back in the session cookie.
    pub id: SessionId,
    /// The session's balances.
    pub balances: Balances,
    /// The name of the signed-in user, if another page has set one.
    pub username: Option<String>,
}

/// Seed the session's balances if it does not have any yet.
///
/// Returns the session's balances, which are never replaced once set.
pub fn initialize_balances(session: &mut SessionData, rng: &mut impl Rng) -> Balances {
    *session
        .balances
        .get_or_insert_with(|| Balances::random(rng))
}

/// The sessions of every visitor, shared between request handlers.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, SessionData>>>,
}

impl SessionStore {
    /// Create an empty session store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionId, SessionData>>, Error> {
        self.sessions.lock().map_err(|_| Error::SessionLockError)
    }

    /// Load the session for `session_id`, or start a new one if there is no
    /// ID or the ID is unknown, and make sure it has balances.
    ///
    /// Looking up the session and seeding its balances happen under a single
    /// lock, so concurrent first requests for a session agree on its balances.
    ///
    /// # Errors
    ///
    /// Returns [Error::SessionLockError] if the store lock is poisoned.
    pub fn load_or_create(
        &self,
        session_id: Option<SessionId>,
        now: OffsetDateTime,
        rng: &mut impl Rng,
    ) -> Result<ActiveSession, Error> {
        let mut sessions = self.lock()?;

        let id = match session_id {
            Some(id) if sessions.contains_key(&id) => id,
            _ => new_unused_id(&sessions, rng),
        };

        let session = sessions.entry(id).or_insert_with(|| {
            tracing::debug!("Started session {id}");
            SessionData::new(now)
        });
        session.last_seen = now;

        let had_balances = session.balances.is_some();
        let balances = initialize_balances(session, rng);

        if !had_balances {
            tracing::debug!("Seeded balances for session {id}: {balances:?}");
        }

        Ok(ActiveSession {
            id,
            balances,
            username: session.username.clone(),
        })
    }

    /// Get a copy of the data for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [Error::SessionLockError] if the store lock is poisoned.
    pub fn get(&self, session_id: SessionId) -> Result<Option<SessionData>, Error> {
        Ok(self.lock()?.get(&session_id).cloned())
    }

    /// The number of live sessions.
    ///
    /// # Errors
    ///
    /// Returns [Error::SessionLockError] if the store lock is poisoned.
    pub fn len(&self) -> Result<usize, Error> {
        Ok(self.lock()?.len())
    }

    /// Whether the store holds no sessions.
    ///
    /// # Errors
    ///
    /// Returns [Error::SessionLockError] if the store lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.lock()?.is_empty())
    }

    /// Remove sessions that have not been seen within `ttl` of `now`.
    ///
    /// Returns the number of sessions removed.
    ///
    /// # Errors
    ///
    /// Returns [Error::SessionLockError] if the store lock is poisoned.
    pub fn prune_expired(&self, now: OffsetDateTime, ttl: Duration) -> Result<usize, Error> {
        let mut sessions = self.lock()?;
        let before = sessions.len();

        sessions.retain(|_, session| now - session.last_seen <= ttl);

        Ok(before - sessions.len())
    }

    #[cfg(test)]
    pub(crate) fn set_username(&self, session_id: SessionId, username: &str) {
        if let Some(session) = self.lock().unwrap().get_mut(&session_id) {
            session.username = Some(username.to_owned());
        }
    }
}

fn new_unused_id(sessions: &HashMap<SessionId, SessionData>, rng: &mut impl Rng) -> SessionId {
    loop {
        let id = SessionId::random(rng);

        if !sessions.contains_key(&id) {
            return id;
        }
    }
}

/// Periodically remove sessions that have been idle for longer than `ttl`.
///
/// Runs until the task is dropped.
pub async fn prune_sessions_periodically(
    store: SessionStore,
    interval: std::time::Duration,
    ttl: Duration,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        match store.prune_expired(OffsetDateTime::now_utc(), ttl) {
            Ok(0) => {}
            Ok(count) => {
                let remaining = store.len().unwrap_or_default();
                tracing::debug!("Pruned {count} expired session(s), {remaining} remaining");
            }
            Err(error) => tracing::error!("Could not prune expired sessions: {error}"),
        }
    }
}

/// Read the session ID from the private session cookie, if there is one.
pub(crate) fn get_session_id(jar: &PrivateCookieJar) -> Option<SessionId> {
    let cookie = jar.get(COOKIE_SESSION_ID)?;
    let session_id = SessionId::parse(cookie.value_trimmed());

    if session_id.is_none() {
        tracing::warn!("Ignoring malformed session cookie");
    }

    session_id
}

/// Add the session cookie for `session_id` to `jar`, valid for `ttl`.
pub(crate) fn set_session_cookie(
    jar: PrivateCookieJar,
    session_id: SessionId,
    ttl: Duration,
    secure: bool,
) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION_ID, session_id.to_string()))
            .max_age(ttl)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(secure),
    )
}
