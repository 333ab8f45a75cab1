//! Implements a struct that holds the state of the web server.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    auth::SessionManager,
    ledger::Ledger,
    profile::ProfileBinder,
    provider::{AuthProvider, DataStore},
};

/// The state of the web server.
#[derive(Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// Signs users up, in and out.
    pub sessions: SessionManager,

    /// Reads and writes transactions.
    pub ledger: Ledger,

    /// Reads and writes display names.
    pub profiles: ProfileBinder,

    /// Whether the session cookie is restricted to HTTPS. On by default.
    pub secure_cookies: bool,
}

impl AppState {
    /// Create a new [AppState] that talks to the given provider.
    ///
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    pub fn new(
        cookie_secret: &str,
        local_timezone: &str,
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn DataStore>,
    ) -> Self {
        let profiles = ProfileBinder::new(store.clone());

        Self {
            cookie_key: create_cookie_key(cookie_secret),
            local_timezone: local_timezone.to_owned(),
            sessions: SessionManager::new(auth, profiles.clone()),
            ledger: Ledger::new(store),
            profiles,
            secure_cookies: true,
        }
    }

    /// Set whether the session cookie is restricted to HTTPS.
    ///
    /// Turn this off only when the server is reached over plain HTTP, since
    /// browsers will not send a secure cookie back over it.
    pub fn with_secure_cookies(mut self, secure_cookies: bool) -> Self {
        self.secure_cookies = secure_cookies;
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
