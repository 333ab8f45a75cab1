//! The boundary to the external identity and data provider.
//!
//! Everything the app persists goes through these two traits. [SqliteProvider]
//! keeps the data in a local SQLite database and [SupabaseProvider] talks to a
//! hosted Supabase project over HTTP.

mod password;
mod sqlite;
mod supabase;

use async_trait::async_trait;

pub use password::{PasswordHash, ValidatedPassword};
pub use sqlite::{DEFAULT_SESSION_DURATION, SqliteProvider};
pub use supabase::{SupabaseConfig, SupabaseProvider};

use crate::{
    error::{AuthError, ProviderError},
    identity::{Credentials, Identity, Session, SessionToken},
    ledger::{NewTransaction, Transaction},
    profile::Profile,
};

/// Account creation and session lookup.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create a new account and return its identity.
    ///
    /// # Errors
    ///
    /// Returns [AuthError::DuplicateAccount] if the email is taken, or another
    /// [AuthError] if the provider refuses the credentials or fails.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Identity, AuthError>;

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns [AuthError::InvalidCredentials] for an unknown email or a wrong
    /// password.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// Look up who a session token belongs to.
    ///
    /// Unknown, revoked and expired tokens all give `Ok(None)`.
    async fn get_current_user(&self, token: &SessionToken)
    -> Result<Option<Identity>, ProviderError>;

    /// Revoke a session token.
    async fn sign_out(&self, token: &SessionToken) -> Result<(), ProviderError>;
}

/// Which way to sort transactions by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    Descending,
}

/// A select on the transactions table: one user's rows, optionally ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQuery {
    /// Only rows belonging to this identity are returned.
    pub user_id: Identity,
    /// Sort by `created_at`, or leave the order to the provider.
    pub order: Option<SortOrder>,
}

impl TransactionQuery {
    /// All of `user_id`'s rows in whatever order the provider returns them.
    pub fn for_user(user_id: Identity) -> Self {
        Self {
            user_id,
            order: None,
        }
    }

    /// Sort the rows by creation time.
    pub fn order_by_created_at(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }
}

/// Row storage for the `profiles` and `transactions` tables.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Insert a profile row.
    async fn insert_profile(&self, profile: &Profile) -> Result<(), ProviderError>;

    /// Fetch the profile row for `id`, if there is one.
    async fn select_profile(&self, id: &Identity) -> Result<Option<Profile>, ProviderError>;

    /// Append a row to the transaction log and return it as stored.
    async fn insert_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<Transaction, ProviderError>;

    /// Fetch the rows matching `query`.
    async fn select_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, ProviderError>;
}
