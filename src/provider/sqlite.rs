//! A local SQLite implementation of the provider traits.
//!
//! This stands in for a hosted identity and data service: it owns the account,
//! session, profile and transaction tables and answers the same requests a
//! hosted service would.

use std::{
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row, ffi::SQLITE_CONSTRAINT_UNIQUE};
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    error::{AuthError, ProviderError},
    identity::{Credentials, Identity, Session, SessionToken},
    ledger::{NewTransaction, Transaction, TransactionKind},
    profile::Profile,
    provider::{
        AuthProvider, DataStore, SortOrder, TransactionQuery,
        password::{PasswordHash, ValidatedPassword},
    },
};

/// How long a session stays valid after signing in, unless configured otherwise.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::hours(1);

/// Provider backed by a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteProvider {
    connection: Arc<Mutex<Connection>>,
    password_cost: u32,
    session_duration: Duration,
}

impl SqliteProvider {
    /// Create a provider that stores its data in `connection`.
    ///
    /// The tables are created if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(connection: Connection) -> Result<Self, ProviderError> {
        initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            password_cost: PasswordHash::DEFAULT_COST,
            session_duration: DEFAULT_SESSION_DURATION,
        })
    }

    /// Set the bcrypt cost used when hashing new passwords.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    /// Set how long new sessions stay valid.
    pub fn with_session_duration(mut self, duration: Duration) -> Self {
        self.session_duration = duration;
        self
    }

    /// How long new sessions stay valid.
    pub fn session_duration(&self) -> Duration {
        self.session_duration
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ProviderError> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            ProviderError::Database("could not acquire the database lock".to_owned())
        })
    }
}

/// Create the provider's tables.
///
/// # Errors
/// Returns an error if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS auth_user (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS auth_session (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES auth_user(id) ON DELETE CASCADE,
            expires_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY REFERENCES auth_user(id) ON DELETE CASCADE,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES auth_user(id) ON DELETE CASCADE,
            amount TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('deposit', 'withdraw')),
            created_at TEXT NOT NULL,
            CHECK (
                (type = 'deposit' AND CAST(amount AS REAL) > 0)
                OR (type = 'withdraw' AND CAST(amount AS REAL) < 0)
            )
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_user_created
            ON transactions(user_id, created_at);",
    )
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

fn get_identity(row: &Row, index: usize) -> Result<Identity, rusqlite::Error> {
    let raw: String = row.get(index)?;

    Uuid::parse_str(&raw).map(Identity::new).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(error))
    })
}

fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = get_identity(row, 1)?;
    let raw_amount: String = row.get(2)?;
    let raw_kind: String = row.get(3)?;
    let created_at = row.get(4)?;

    let amount = Decimal::from_str(&raw_amount).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(error))
    })?;
    let kind = TransactionKind::from_str(&raw_kind).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, error.into())
    })?;

    Ok(Transaction {
        id,
        user_id,
        amount,
        kind,
        created_at,
    })
}

fn create_user(
    email: &str,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<Identity, AuthError> {
    let identity = Identity::new(Uuid::new_v4());

    connection
        .execute(
            "INSERT INTO auth_user (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            (
                identity.to_string(),
                email,
                password_hash.as_ref(),
                OffsetDateTime::now_utc(),
            ),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => AuthError::DuplicateAccount,
            error => ProviderError::from(error).into(),
        })?;

    Ok(identity)
}

fn get_user_by_email(
    email: &str,
    connection: &Connection,
) -> Result<Option<(Identity, PasswordHash)>, rusqlite::Error> {
    connection
        .prepare("SELECT id, password_hash FROM auth_user WHERE email = :email")?
        .query_row(&[(":email", email)], |row| {
            let identity = get_identity(row, 0)?;
            let raw_password_hash: String = row.get(1)?;

            Ok((identity, PasswordHash::new_unchecked(&raw_password_hash)))
        })
        .optional()
}

fn create_session(
    identity: Identity,
    duration: Duration,
    connection: &Connection,
) -> Result<Session, rusqlite::Error> {
    let now = OffsetDateTime::now_utc();

    connection.execute(
        "DELETE FROM auth_session WHERE user_id = ?1 AND expires_at <= ?2",
        (identity.to_string(), now),
    )?;

    let session = Session {
        token: SessionToken::new(Uuid::new_v4().simple().to_string()),
        identity,
        expires_at: now + duration,
    };

    connection.execute(
        "INSERT INTO auth_session (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
        (
            session.token.as_str(),
            identity.to_string(),
            session.expires_at,
        ),
    )?;

    Ok(session)
}

#[async_trait]
impl AuthProvider for SqliteProvider {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let email = credentials.email.trim();

        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }

        let password = ValidatedPassword::new(&credentials.password)?;
        let password_hash = PasswordHash::new(password, self.password_cost)?;

        let connection = self.lock()?;
        let identity = create_user(email, &password_hash, &connection)?;
        tracing::info!("created account {identity}");

        Ok(identity)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let connection = self.lock()?;

        let Some((identity, password_hash)) =
            get_user_by_email(credentials.email.trim(), &connection).map_err(ProviderError::from)?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        let is_password_valid = password_hash
            .verify(&credentials.password)
            .map_err(|error| {
                tracing::error!("Unhandled error while verifying credentials: {error}");
                AuthError::Provider("An internal error occurred. Please try again later.".to_owned())
            })?;

        if !is_password_valid {
            return Err(AuthError::InvalidCredentials);
        }

        create_session(identity, self.session_duration, &connection)
            .map_err(|error| ProviderError::from(error).into())
    }

    async fn get_current_user(
        &self,
        token: &SessionToken,
    ) -> Result<Option<Identity>, ProviderError> {
        let connection = self.lock()?;

        let session = connection
            .prepare("SELECT user_id, expires_at FROM auth_session WHERE token = :token")?
            .query_row(&[(":token", token.as_str())], |row| {
                let identity = get_identity(row, 0)?;
                let expires_at: OffsetDateTime = row.get(1)?;

                Ok((identity, expires_at))
            })
            .optional()?;

        Ok(session
            .filter(|(_, expires_at)| *expires_at > OffsetDateTime::now_utc())
            .map(|(identity, _)| identity))
    }

    async fn sign_out(&self, token: &SessionToken) -> Result<(), ProviderError> {
        let connection = self.lock()?;

        connection.execute(
            "DELETE FROM auth_session WHERE token = ?1",
            (token.as_str(),),
        )?;

        Ok(())
    }
}

#[async_trait]
impl DataStore for SqliteProvider {
    async fn insert_profile(&self, profile: &Profile) -> Result<(), ProviderError> {
        let connection = self.lock()?;

        connection.execute(
            "INSERT INTO profiles (id, name) VALUES (?1, ?2)",
            (profile.id.to_string(), &profile.name),
        )?;

        Ok(())
    }

    async fn select_profile(&self, id: &Identity) -> Result<Option<Profile>, ProviderError> {
        let connection = self.lock()?;

        let profile = connection
            .prepare("SELECT id, name FROM profiles WHERE id = :id")?
            .query_row(&[(":id", &id.to_string())], |row| {
                Ok(Profile {
                    id: get_identity(row, 0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;

        Ok(profile)
    }

    async fn insert_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<Transaction, ProviderError> {
        let connection = self.lock()?;

        let transaction = connection
            .prepare(
                "INSERT INTO transactions (user_id, amount, type, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id, user_id, amount, type, created_at",
            )?
            .query_row(
                (
                    transaction.user_id().to_string(),
                    transaction.amount().to_string(),
                    transaction.kind().as_str(),
                    OffsetDateTime::now_utc(),
                ),
                map_transaction_row,
            )?;

        Ok(transaction)
    }

    async fn select_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, ProviderError> {
        let order_clause = match query.order {
            Some(SortOrder::Ascending) => " ORDER BY created_at ASC, id ASC",
            Some(SortOrder::Descending) => " ORDER BY created_at DESC, id DESC",
            None => "",
        };
        let sql = format!(
            "SELECT id, user_id, amount, type, created_at FROM transactions
             WHERE user_id = :user_id{order_clause}"
        );

        let connection = self.lock()?;

        let transactions = connection
            .prepare(&sql)?
            .query_map(&[(":user_id", &query.user_id.to_string())], map_transaction_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(transactions)
    }
}

#[cfg(test)]
mod auth_tests {
    use rusqlite::Connection;
    use time::Duration;

    use crate::{
        error::AuthError,
        identity::{Credentials, SessionToken},
        provider::AuthProvider,
    };

    use super::{SqliteProvider, is_valid_email};

    fn get_test_provider() -> SqliteProvider {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");

        SqliteProvider::new(connection)
            .expect("Could not initialize provider")
            .with_password_cost(4)
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let provider = get_test_provider();
        let credentials = Credentials::new("a@x.com", "secret");

        let identity = provider.sign_up(&credentials).await.unwrap();
        let session = provider.sign_in(&credentials).await.unwrap();

        assert_eq!(session.identity, identity);
        assert_eq!(
            provider.get_current_user(&session.token).await,
            Ok(Some(identity))
        );
    }

    #[tokio::test]
    async fn sign_up_rejects_duplicate_email() {
        let provider = get_test_provider();
        provider
            .sign_up(&Credentials::new("a@x.com", "secret"))
            .await
            .unwrap();

        let result = provider
            .sign_up(&Credentials::new("A@X.com", "another-secret"))
            .await;

        assert_eq!(result, Err(AuthError::DuplicateAccount));
    }

    #[tokio::test]
    async fn sign_up_rejects_short_password() {
        let provider = get_test_provider();

        let result = provider.sign_up(&Credentials::new("a@x.com", "abc")).await;

        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
    }

    #[tokio::test]
    async fn sign_up_rejects_invalid_email() {
        let provider = get_test_provider();

        let result = provider
            .sign_up(&Credentials::new("not-an-email", "secret"))
            .await;

        assert_eq!(result, Err(AuthError::InvalidEmail));
    }

    #[tokio::test]
    async fn sign_in_fails_with_wrong_password() {
        let provider = get_test_provider();
        provider
            .sign_up(&Credentials::new("a@x.com", "secret"))
            .await
            .unwrap();

        let result = provider
            .sign_in(&Credentials::new("a@x.com", "wrong-password"))
            .await;

        assert_eq!(result, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn sign_in_fails_for_unknown_account() {
        let provider = get_test_provider();

        let result = provider
            .sign_in(&Credentials::new("nobody@x.com", "secret"))
            .await;

        assert_eq!(result, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn signed_out_token_is_unknown() {
        let provider = get_test_provider();
        let credentials = Credentials::new("a@x.com", "secret");
        provider.sign_up(&credentials).await.unwrap();
        let session = provider.sign_in(&credentials).await.unwrap();

        provider.sign_out(&session.token).await.unwrap();

        assert_eq!(provider.get_current_user(&session.token).await, Ok(None));
    }

    #[tokio::test]
    async fn expired_session_is_unknown() {
        let provider = get_test_provider().with_session_duration(Duration::seconds(-1));
        let credentials = Credentials::new("a@x.com", "secret");
        provider.sign_up(&credentials).await.unwrap();

        let session = provider.sign_in(&credentials).await.unwrap();

        assert_eq!(provider.get_current_user(&session.token).await, Ok(None));
    }

    #[tokio::test]
    async fn made_up_token_is_unknown() {
        let provider = get_test_provider();

        let result = provider
            .get_current_user(&SessionToken::new("not-a-real-token"))
            .await;

        assert_eq!(result, Ok(None));
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@example.co.nz"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("a@"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@b@x.com"));
        assert!(!is_valid_email("a b@x.com"));
    }
}
