use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::{
    error::ProviderError,
    identity::{Credentials, Identity},
    ledger::{NewTransaction, Transaction},
    profile::Profile,
    provider::{AuthProvider, DataStore, SqliteProvider, TransactionQuery},
};

/// An in-memory provider with a cheap password hash.
pub(crate) fn get_test_provider() -> SqliteProvider {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    SqliteProvider::new(connection)
        .expect("Could not initialize provider")
        .with_password_cost(4)
}

/// Create an account with the password "secret".
pub(crate) async fn sign_up_test_user(provider: &SqliteProvider, email: &str) -> Identity {
    provider
        .sign_up(&Credentials::new(email, "secret"))
        .await
        .expect("Could not create test user")
}

/// Wraps a store and counts the calls made to it.
pub(crate) struct CountingStore {
    inner: Arc<dyn DataStore>,
    insert_profile_calls: AtomicUsize,
    select_profile_calls: AtomicUsize,
    insert_transaction_calls: AtomicUsize,
    select_transactions_calls: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn new(inner: Arc<dyn DataStore>) -> Self {
        Self {
            inner,
            insert_profile_calls: AtomicUsize::new(0),
            select_profile_calls: AtomicUsize::new(0),
            insert_transaction_calls: AtomicUsize::new(0),
            select_transactions_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn insert_transaction_calls(&self) -> usize {
        self.insert_transaction_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn select_transactions_calls(&self) -> usize {
        self.select_transactions_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.insert_profile_calls.load(Ordering::SeqCst)
            + self.select_profile_calls.load(Ordering::SeqCst)
            + self.insert_transaction_calls()
            + self.select_transactions_calls()
    }
}

#[async_trait]
impl DataStore for CountingStore {
    async fn insert_profile(&self, profile: &Profile) -> Result<(), ProviderError> {
        self.insert_profile_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_profile(profile).await
    }

    async fn select_profile(&self, id: &Identity) -> Result<Option<Profile>, ProviderError> {
        self.select_profile_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.select_profile(id).await
    }

    async fn insert_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<Transaction, ProviderError> {
        self.insert_transaction_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_transaction(transaction).await
    }

    async fn select_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, ProviderError> {
        self.select_transactions_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.select_transactions(query).await
    }
}
