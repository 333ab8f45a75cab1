//! Identifiers and session types issued by the identity provider.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// An opaque account identifier issued by the identity provider at sign-up.
///
/// This system only ever references identities, it never creates them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(Uuid);

impl Identity {
    /// Wrap an identifier returned by the provider.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The opaque token the provider hands out when a user signs in.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a token string returned by the provider.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, e.g. for an `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are credentials, keep them out of the logs.
impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(********)")
    }
}

/// Proof of authentication bound to an [Identity].
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The token used to look the session up again.
    pub token: SessionToken,
    /// Who the session belongs to.
    pub identity: Identity,
    /// When the provider stops honouring the token.
    pub expires_at: OffsetDateTime,
}

/// The email and password pair used for signing up and signing in.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    /// The account's email address.
    pub email: String,
    /// The plain text password, only ever passed on to the provider.
    pub password: String,
}

impl Credentials {
    /// Bundle an email and password.
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_owned(),
            password: password.to_owned(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"********")
            .finish()
    }
}
