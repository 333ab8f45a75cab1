//! The ledger view-model: a user's transaction log, the balance derived from
//! it, and validated deposits and withdrawals.
//!
//! The balance is never stored. Every call to [Ledger::compute_balance] sums
//! the rows again, so whatever the provider holds is the source of truth.

mod dashboard_page;
mod history_page;
mod models;
mod transaction_endpoint;

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    AppState,
    error::{FetchError, SubmitError, SubmitTransactionError, ValidationError},
    identity::Identity,
    provider::{DataStore, SortOrder, TransactionQuery},
};

pub use dashboard_page::get_dashboard_page;
pub use history_page::get_history_page;
pub use models::{
    Amount, Balance, NewTransaction, Transaction, TransactionId, TransactionKind,
};
pub use transaction_endpoint::post_transaction;

/// Reads and appends to the transaction log of the provider.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn DataStore>,
}

impl Ledger {
    /// Create a ledger backed by `store`.
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Get all of `identity`'s transactions, newest first.
    ///
    /// Rows created at the same instant are ordered by ID, highest first.
    ///
    /// # Errors
    ///
    /// Returns [FetchError::InconsistentTransaction] if a row's sign does not
    /// match its type, or [FetchError::Provider] if the provider fails.
    pub async fn fetch_transactions(
        &self,
        identity: Identity,
    ) -> Result<Vec<Transaction>, FetchError> {
        let query =
            TransactionQuery::for_user(identity).order_by_created_at(SortOrder::Descending);

        self.select_consistent(&query).await
    }

    /// Derive `identity`'s current balance by summing every row.
    ///
    /// # Errors
    ///
    /// Fails in the same cases as [Ledger::fetch_transactions], and with
    /// [FetchError::BalanceOverflow] if the rows sum past the decimal range.
    pub async fn compute_balance(&self, identity: Identity) -> Result<Balance, FetchError> {
        let transactions = self
            .select_consistent(&TransactionQuery::for_user(identity))
            .await?;

        Balance::from_transactions(&transactions).ok_or_else(|| {
            tracing::error!("balance for {identity} overflowed");
            FetchError::BalanceOverflow
        })
    }

    /// Validate a deposit or withdrawal without writing it.
    ///
    /// `raw_amount` is the text the user typed. Withdrawals are checked
    /// against the balance derived at the time of this call, and nothing stops
    /// the balance from changing before [PendingTransaction::submit] runs.
    ///
    /// # Errors
    ///
    /// Returns a [ValidationError] for unparseable, non-positive or
    /// over-balance amounts, or for a deposit the balance could not hold, and
    /// a [FetchError] if the balance cannot be derived.
    pub async fn prepare_transaction(
        &self,
        identity: Identity,
        kind: TransactionKind,
        raw_amount: &str,
    ) -> Result<PendingTransaction, SubmitTransactionError> {
        let amount = Amount::parse(raw_amount)?;
        let balance = self.compute_balance(identity).await?;

        match kind {
            TransactionKind::Deposit => {
                if balance.checked_add(amount.value()).is_none() {
                    return Err(ValidationError::TooLarge.into());
                }
            }
            TransactionKind::Withdraw => {
                if amount.value() > balance.value() {
                    return Err(ValidationError::InsufficientFunds {
                        requested: amount.value(),
                        available: balance.value(),
                    }
                    .into());
                }
            }
        }

        Ok(PendingTransaction {
            store: self.store.clone(),
            transaction: NewTransaction::new(identity, kind, amount),
        })
    }

    /// Validate and write a deposit or withdrawal, returning the stored row.
    ///
    /// Exactly one row is written on success and none on failure.
    ///
    /// # Errors
    ///
    /// Fails in the same cases as [Ledger::prepare_transaction], and with a
    /// [SubmitError] if the provider refuses the row.
    pub async fn submit_transaction(
        &self,
        identity: Identity,
        kind: TransactionKind,
        raw_amount: &str,
    ) -> Result<Transaction, SubmitTransactionError> {
        let pending = self.prepare_transaction(identity, kind, raw_amount).await?;

        Ok(pending.submit().await?)
    }

    async fn select_consistent(
        &self,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, FetchError> {
        let transactions = self.store.select_transactions(query).await?;

        if let Some(transaction) = transactions
            .iter()
            .find(|transaction| !transaction.is_consistent())
        {
            tracing::error!(
                "transaction {} has type {} but amount {}",
                transaction.id,
                transaction.kind,
                transaction.amount
            );
            return Err(FetchError::InconsistentTransaction(transaction.id));
        }

        Ok(transactions)
    }
}

impl FromRef<AppState> for Ledger {
    fn from_ref(state: &AppState) -> Self {
        state.ledger.clone()
    }
}

/// A validated transaction waiting to be written.
pub struct PendingTransaction {
    store: Arc<dyn DataStore>,
    transaction: NewTransaction,
}

impl PendingTransaction {
    /// The row that will be written.
    pub fn transaction(&self) -> &NewTransaction {
        &self.transaction
    }

    /// Write the row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns a [SubmitError] if the provider refuses the row.
    pub async fn submit(self) -> Result<Transaction, SubmitError> {
        let transaction = self.store.insert_transaction(&self.transaction).await?;
        tracing::debug!(
            "stored {} of {} for {}",
            transaction.kind,
            transaction.magnitude(),
            transaction.user_id
        );

        Ok(transaction)
    }
}

#[cfg(test)]
mod ledger_tests {
    use std::{str::FromStr, sync::Arc};

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use time::macros::datetime;

    use crate::{
        error::{FetchError, ProviderError, SubmitTransactionError, ValidationError},
        identity::Identity,
        ledger::{NewTransaction, Transaction, TransactionKind},
        profile::Profile,
        provider::{DataStore, TransactionQuery},
        test_utils::{CountingStore, get_test_provider, sign_up_test_user},
    };

    use super::Ledger;

    async fn get_ledger() -> (Ledger, Arc<CountingStore>, Identity) {
        let provider = get_test_provider();
        let identity = sign_up_test_user(&provider, "a@x.com").await;
        let store = Arc::new(CountingStore::new(Arc::new(provider)));

        (Ledger::new(store.clone()), store, identity)
    }

    fn decimal(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[tokio::test]
    async fn new_account_has_zero_balance() {
        let (ledger, _, identity) = get_ledger().await;

        let balance = ledger.compute_balance(identity).await.unwrap();

        assert_eq!(balance.value(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn deposit_increases_balance_by_amount() {
        let (ledger, _, identity) = get_ledger().await;

        for (amount, want_balance) in [("0.01", "0.01"), ("12.5", "12.51"), ("1e2", "112.51")] {
            let before = ledger.compute_balance(identity).await.unwrap();

            ledger
                .submit_transaction(identity, TransactionKind::Deposit, amount)
                .await
                .unwrap();

            let after = ledger.compute_balance(identity).await.unwrap();
            assert_eq!(after.value(), decimal(want_balance));
            assert!(after > before);
        }
    }

    #[tokio::test]
    async fn deposit_past_decimal_range_is_rejected_without_writing() {
        let (ledger, store, identity) = get_ledger().await;
        let max = Decimal::MAX.to_string();
        ledger
            .submit_transaction(identity, TransactionKind::Deposit, &max)
            .await
            .unwrap();

        let result = ledger
            .submit_transaction(identity, TransactionKind::Deposit, &max)
            .await;

        assert_eq!(
            result,
            Err(SubmitTransactionError::Validation(ValidationError::TooLarge))
        );
        assert_eq!(store.insert_transaction_calls(), 1);
        assert_eq!(
            ledger.compute_balance(identity).await.unwrap().value(),
            Decimal::MAX
        );
    }

    #[tokio::test]
    async fn overflowing_rows_fail_balance_instead_of_panicking() {
        let (ledger, _, identity) = get_ledger().await;
        let max = Decimal::MAX.to_string();

        let first = ledger
            .prepare_transaction(identity, TransactionKind::Deposit, &max)
            .await
            .unwrap();
        let second = ledger
            .prepare_transaction(identity, TransactionKind::Deposit, &max)
            .await
            .unwrap();
        first.submit().await.unwrap();
        second.submit().await.unwrap();

        assert_eq!(
            ledger.compute_balance(identity).await,
            Err(FetchError::BalanceOverflow)
        );
        assert_eq!(
            ledger
                .submit_transaction(identity, TransactionKind::Withdraw, "1")
                .await,
            Err(SubmitTransactionError::Fetch(FetchError::BalanceOverflow))
        );
        assert_eq!(ledger.fetch_transactions(identity).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn deposit_then_withdraw_leaves_difference() {
        let (ledger, _, identity) = get_ledger().await;

        let deposit = ledger
            .submit_transaction(identity, TransactionKind::Deposit, "50.00")
            .await
            .unwrap();
        let withdrawal = ledger
            .submit_transaction(identity, TransactionKind::Withdraw, "20.00")
            .await
            .unwrap();

        let balance = ledger.compute_balance(identity).await.unwrap();
        let history = ledger.fetch_transactions(identity).await.unwrap();
        assert_eq!(balance.value(), decimal("30.00"));
        assert_eq!(history, vec![withdrawal, deposit]);
        assert_eq!(history[0].amount, decimal("-20.00"));
        assert_eq!(history[0].kind, TransactionKind::Withdraw);
    }

    #[tokio::test]
    async fn withdrawal_over_balance_is_rejected_without_writing() {
        let (ledger, store, identity) = get_ledger().await;
        ledger
            .submit_transaction(identity, TransactionKind::Deposit, "10")
            .await
            .unwrap();

        let result = ledger
            .submit_transaction(identity, TransactionKind::Withdraw, "10.01")
            .await;

        assert_eq!(
            result,
            Err(SubmitTransactionError::Validation(
                ValidationError::InsufficientFunds {
                    requested: decimal("10.01"),
                    available: decimal("10"),
                }
            ))
        );
        assert_eq!(store.insert_transaction_calls(), 1);
        assert_eq!(ledger.fetch_transactions(identity).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn withdrawing_whole_balance_is_allowed() {
        let (ledger, _, identity) = get_ledger().await;
        ledger
            .submit_transaction(identity, TransactionKind::Deposit, "10")
            .await
            .unwrap();

        ledger
            .submit_transaction(identity, TransactionKind::Withdraw, "10")
            .await
            .unwrap();

        let balance = ledger.compute_balance(identity).await.unwrap();
        assert_eq!(balance.value(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn invalid_amounts_fail_before_any_provider_call() {
        let (ledger, store, identity) = get_ledger().await;

        for kind in [TransactionKind::Deposit, TransactionKind::Withdraw] {
            for (input, want) in [
                ("", ValidationError::NotANumber),
                ("abc", ValidationError::NotANumber),
                ("0", ValidationError::NonPositive),
                ("-5", ValidationError::NonPositive),
            ] {
                let result = ledger.submit_transaction(identity, kind, input).await;

                assert_eq!(
                    result,
                    Err(SubmitTransactionError::Validation(want)),
                    "input {input:?} for {kind}"
                );
            }
        }

        assert_eq!(store.total_calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_withdrawals_can_overdraw() {
        let (ledger, _, identity) = get_ledger().await;
        ledger
            .submit_transaction(identity, TransactionKind::Deposit, "100")
            .await
            .unwrap();

        let first = ledger
            .prepare_transaction(identity, TransactionKind::Withdraw, "60")
            .await
            .unwrap();
        let second = ledger
            .prepare_transaction(identity, TransactionKind::Withdraw, "60")
            .await
            .unwrap();
        assert_eq!(first.transaction().amount(), decimal("-60"));
        assert_eq!(second.transaction().kind(), TransactionKind::Withdraw);
        first.submit().await.unwrap();
        second.submit().await.unwrap();

        let balance = ledger.compute_balance(identity).await.unwrap();
        assert_eq!(balance.value(), decimal("-20"));
    }

    #[tokio::test]
    async fn locally_applied_delta_matches_rederived_balance() {
        let (ledger, _, identity) = get_ledger().await;
        ledger
            .submit_transaction(identity, TransactionKind::Deposit, "42.42")
            .await
            .unwrap();
        let before = ledger.compute_balance(identity).await.unwrap();

        let transaction = ledger
            .submit_transaction(identity, TransactionKind::Withdraw, "2.42")
            .await
            .unwrap();

        assert_eq!(
            before.apply(&transaction),
            Some(ledger.compute_balance(identity).await.unwrap())
        );
    }

    #[tokio::test]
    async fn ledgers_are_per_user() {
        let provider = get_test_provider();
        let alice = sign_up_test_user(&provider, "alice@x.com").await;
        let bob = sign_up_test_user(&provider, "bob@x.com").await;
        let ledger = Ledger::new(Arc::new(provider));

        ledger
            .submit_transaction(alice, TransactionKind::Deposit, "5")
            .await
            .unwrap();

        assert_eq!(
            ledger.compute_balance(bob).await.unwrap().value(),
            Decimal::ZERO
        );
        assert!(ledger.fetch_transactions(bob).await.unwrap().is_empty());
    }

    /// Returns a fixed set of rows regardless of the query.
    struct FixedRows(Vec<Transaction>);

    #[async_trait]
    impl DataStore for FixedRows {
        async fn insert_profile(&self, _: &Profile) -> Result<(), ProviderError> {
            unimplemented!()
        }

        async fn select_profile(&self, _: &Identity) -> Result<Option<Profile>, ProviderError> {
            unimplemented!()
        }

        async fn insert_transaction(
            &self,
            _: &NewTransaction,
        ) -> Result<Transaction, ProviderError> {
            unimplemented!()
        }

        async fn select_transactions(
            &self,
            _: &TransactionQuery,
        ) -> Result<Vec<Transaction>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn rows_with_mismatched_sign_are_rejected() {
        let identity = Identity::new(uuid::Uuid::new_v4());
        let row = |id, amount: &str, kind| Transaction {
            id,
            user_id: identity,
            amount: decimal(amount),
            kind,
            created_at: datetime!(2025-01-01 12:00 UTC),
        };
        let ledger = Ledger::new(Arc::new(FixedRows(vec![
            row(1, "10", TransactionKind::Deposit),
            row(2, "5", TransactionKind::Withdraw),
        ])));

        assert_eq!(
            ledger.fetch_transactions(identity).await,
            Err(FetchError::InconsistentTransaction(2))
        );
        assert_eq!(
            ledger.compute_balance(identity).await,
            Err(FetchError::InconsistentTransaction(2))
        );
    }
}
