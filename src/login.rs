#[cfg(feature = "web")]
use crate::app::{AppState, UserSession};
#[cfg(feature = "web")]
use axum::{
    Form,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
#[cfg(feature = "web")]
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::{info, warn};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
#[cfg(feature = "web")]
use std::sync::Arc;
#[cfg(feature = "web")]
use std::time::{Duration, SystemTime};
use thiserror::Error;
#[cfg(feature = "web")]
use uuid::Uuid;

/// Login rejection. Deliberately says nothing about which field was wrong.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
}

/// Something that can check a username/password pair
pub trait CredentialStore {
    /// Returns true when the password belongs to the username.
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Fixed username → password hash table
///
/// Hashes are unsalted lowercase hex SHA-256 digests. The default table holds
/// the two built-in dashboard accounts.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    /// Build a store from `(username, password_hash)` pairs
    ///
    /// # Arguments
    /// * `entries` - Username and hex SHA-256 hash pairs
    ///
    /// # Returns
    /// * `StaticCredentials` - The store
    pub fn new<I, U, H>(entries: I) -> Self
    where
        I: IntoIterator<Item = (U, H)>,
        U: Into<String>,
        H: Into<String>,
    {
        StaticCredentials {
            users: entries
                .into_iter()
                .map(|(u, h)| (u.into(), h.into()))
                .collect(),
        }
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        StaticCredentials::new([
            ("admin", hash_password("admin123")),
            ("analyst", hash_password("analyst123")),
        ])
    }
}

impl CredentialStore for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|stored| *stored == hash_password(password))
    }
}

/// Hash a password the way stored credentials are hashed
///
/// # Arguments
/// * `password` - The plaintext password
///
/// # Returns
/// * `String` - Lowercase hex SHA-256 digest
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a username/password pair against a credential store
///
/// # Arguments
/// * `store` - The credential store to consult
/// * `username` - Username to verify
/// * `password` - Password to verify
///
/// # Returns
/// * `bool` - True if the password hash matches the stored hash for that user
///
/// # Examples
/// ```
/// use risk_dashboard::login::{StaticCredentials, authenticate};
///
/// let store = StaticCredentials::default();
/// assert!(authenticate(&store, "admin", "admin123"));
/// assert!(!authenticate(&store, "admin", "wrong"));
/// ```
pub fn authenticate(store: &dyn CredentialStore, username: &str, password: &str) -> bool {
    store.verify(username, password)
}

/// Per-user login state, passed explicitly through the call chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub username: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    /// Attempt to log this session in
    ///
    /// On success the session becomes authenticated and remembers the
    /// username. On failure it is left unchanged.
    ///
    /// # Arguments
    /// * `store` - Credential store to verify against
    /// * `username` - Submitted username
    /// * `password` - Submitted password
    ///
    /// # Returns
    /// * `Result<(), AuthError>` - Ok on success, a generic rejection otherwise
    pub fn login(
        &mut self,
        store: &dyn CredentialStore,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        if authenticate(store, username, password) {
            self.authenticated = true;
            self.username = Some(username.to_string());
            info!("user {} logged in", username);
            Ok(())
        } else {
            warn!("rejected login attempt for {:?}", username);
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Credential data for login
///
/// Used to receive the login form from the client.
#[derive(Debug, Deserialize)]
pub struct UserCredentials {
    /// Username for login
    pub username: String,

    /// Password in plaintext (only transmitted, never stored)
    pub password: String,
}

/// Name of the cookie holding the session id
#[cfg(feature = "web")]
pub const SESSION_COOKIE: &str = "session";

/// Session id a request was authenticated with, set by [`require_auth`]
#[cfg(feature = "web")]
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

/// Active browser sessions keyed by cookie value
///
/// Owned by the application state; entries expire after a fixed lifetime.
#[cfg(feature = "web")]
pub struct SessionRegistry<T> {
    ttl: Duration,
    entries: HashMap<String, (SystemTime, T)>,
}

#[cfg(feature = "web")]
impl<T> SessionRegistry<T> {
    pub fn new(ttl: Duration) -> Self {
        SessionRegistry {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Store `data` under a fresh random id and return the id.
    ///
    /// Expired sessions are pruned first, so abandoned logins do not pile up.
    pub fn create(&mut self, data: T) -> String {
        let now = SystemTime::now();
        self.entries.retain(|_, (expires_at, _)| *expires_at > now);

        let id = Uuid::new_v4().to_string();
        self.entries.insert(id.clone(), (now + self.ttl, data));
        id
    }

    /// Look up a live session, dropping it if it has expired.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        let expired = match self.entries.get(id) {
            Some((expires_at, _)) => *expires_at <= SystemTime::now(),
            None => return None,
        };
        if expired {
            self.entries.remove(id);
            return None;
        }
        self.entries.get_mut(id).map(|(_, data)| data)
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.entries.remove(id).map(|(_, data)| data)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serve the login page
#[cfg(feature = "web")]
pub async fn serve_login_page(State(state): State<Arc<AppState>>) -> Response {
    state.render_login(None).into_response()
}

/// Handle login form submissions
///
/// Validates credentials and, if valid, creates a session and sets its cookie.
///
/// # Arguments
/// * `state` - Shared application state
/// * `jar` - Cookie jar for storing the session cookie
/// * `credentials` - Form data containing the username and password
///
/// # Returns
/// * `Response` - Redirect to the dashboard, or the login page with a generic error
#[cfg(feature = "web")]
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(credentials): Form<UserCredentials>,
) -> Response {
    let mut session = Session::new();
    match session.login(
        state.credentials.as_ref(),
        &credentials.username,
        &credentials.password,
    ) {
        Ok(()) => {
            let id = {
                let mut sessions = state.sessions();
                let id = sessions.create(UserSession::new(session));
                log::debug!("{} active sessions", sessions.len());
                id
            };
            let cookie = Cookie::build((SESSION_COOKIE, id))
                .path("/")
                .http_only(true);
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Err(e) => {
            let page: Html<String> = state.render_login(Some(&e));
            (StatusCode::UNAUTHORIZED, page).into_response()
        }
    }
}

/// Handle logout
///
/// Forgets the session and clears the cookie.
#[cfg(feature = "web")]
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions().remove(cookie.value());
    }
    let cleared = Cookie::build((SESSION_COOKIE, "")).path("/");
    (jar.remove(cleared), Redirect::to("/login"))
}

/// Authentication middleware
///
/// Lets requests with a live, authenticated session through and records the
/// session id on the request. Everything else is redirected to the login page.
#[cfg(feature = "web")]
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let id = cookie.value().to_string();
        let authenticated = state
            .sessions()
            .get_mut(&id)
            .is_some_and(|s| s.session.authenticated);
        if authenticated {
            request.extensions_mut().insert(SessionId(id));
            return next.run(request).await;
        }
    }

    Redirect::to("/login").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_accounts_verify() {
        let store = StaticCredentials::default();
        assert!(authenticate(&store, "admin", "admin123"));
        assert!(authenticate(&store, "analyst", "analyst123"));
        assert!(!authenticate(&store, "admin", "analyst123"));
        assert!(!authenticate(&store, "nobody", "admin123"));
    }

    #[test]
    fn hash_is_plain_sha256_hex() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn failed_login_leaves_session_untouched() {
        let store = StaticCredentials::default();
        let mut session = Session::new();
        assert_eq!(
            session.login(&store, "admin", "nope"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(session, Session::new());

        session.login(&store, "analyst", "analyst123").unwrap();
        assert!(session.authenticated);
        assert_eq!(session.username.as_deref(), Some("analyst"));
    }

    #[cfg(feature = "web")]
    #[test]
    fn expired_sessions_are_dropped() {
        let mut registry = SessionRegistry::new(Duration::from_secs(0));
        let id = registry.create(1u8);
        assert!(registry.get_mut(&id).is_none());
        assert!(registry.is_empty());

        let mut registry = SessionRegistry::new(Duration::from_secs(60));
        let id = registry.create(2u8);
        assert_eq!(registry.get_mut(&id).copied(), Some(2));
        assert_eq!(registry.remove(&id), Some(2));
    }

    #[cfg(feature = "web")]
    #[test]
    fn create_prunes_abandoned_sessions() {
        let mut registry = SessionRegistry::new(Duration::from_secs(0));
        let stale = registry.create(1u8);
        let fresh = registry.create(2u8);
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&stale).is_none());
        assert_eq!(registry.remove(&fresh), Some(2));

        let mut registry = SessionRegistry::new(Duration::from_secs(60));
        registry.create(1u8);
        registry.create(2u8);
        assert_eq!(registry.len(), 2);
    }
}
