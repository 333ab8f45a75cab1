//! Error types for the session, ledger and profile components.
//!
//! Provider failures arrive as [ProviderError] and are converted into the
//! component error of whichever operation was running.

use rust_decimal::Decimal;

use crate::{identity::Identity, ledger::TransactionId};

/// A failure reported by, or while talking to, the identity and data provider.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ProviderError {
    /// The request never produced a response, e.g. a connection error or timeout.
    #[error("could not reach the provider: {0}")]
    Unreachable(String),

    /// The provider answered with an error. The message is the provider's own.
    #[error("{message}")]
    Rejected {
        /// The HTTP status code, if the provider speaks HTTP.
        status: Option<u16>,
        /// The provider's error message.
        message: String,
    },

    /// The provider's response could not be decoded.
    #[error("unexpected response from the provider: {0}")]
    InvalidResponse(String),

    /// The local database failed.
    #[error("database error: {0}")]
    Database(String),
}

impl ProviderError {
    /// The message to show a user, passed through unchanged from the provider
    /// when it gave one.
    pub fn message(&self) -> String {
        match self {
            ProviderError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<rusqlite::Error> for ProviderError {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred: {value}");
        ProviderError::Database(value.to_string())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            ProviderError::InvalidResponse(value.to_string())
        } else {
            ProviderError::Unreachable(value.to_string())
        }
    }
}

/// Errors from signing up or signing in.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum AuthError {
    /// The email and password do not match a known account.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// An account with the email address already exists.
    #[error("User already registered")]
    DuplicateAccount,

    /// The email address is not in a usable format.
    #[error("Unable to validate email address: invalid format")]
    InvalidEmail,

    /// The password does not meet the provider's requirements.
    #[error("{0}")]
    WeakPassword(String),

    /// Any other provider failure.
    #[error("{0}")]
    Provider(String),
}

impl From<ProviderError> for AuthError {
    fn from(value: ProviderError) -> Self {
        AuthError::Provider(value.message())
    }
}

/// Errors from the two-step sign-up.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SignUpError {
    /// The display name was empty or only whitespace. Nothing was created.
    #[error("Enter your name.")]
    EmptyName,

    /// Creating the identity failed, no profile was attempted.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The identity exists but its profile row could not be created.
    ///
    /// Nothing rolls the identity back, so the account has no display name.
    #[error("account {identity} was created but its profile was not: {error}")]
    ProfileNotCreated {
        /// The identity that now exists without a profile.
        identity: Identity,
        /// Why the profile insert failed.
        error: SubmitError,
    },
}

/// User input that was rejected before anything was sent to the provider.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ValidationError {
    /// The amount could not be parsed as a decimal number.
    #[error("Enter a valid amount.")]
    NotANumber,

    /// The amount was zero or negative.
    #[error("Enter an amount greater than zero.")]
    NonPositive,

    /// The amount has more than two decimal places.
    #[error("Enter an amount in whole cents.")]
    SubCent,

    /// A deposit would take the balance past the largest representable amount.
    #[error("Amount is too large.")]
    TooLarge,

    /// A withdrawal asked for more than the current balance.
    #[error("Insufficient balance.")]
    InsufficientFunds {
        /// The amount the user asked to withdraw.
        requested: Decimal,
        /// The balance derived just before the check.
        available: Decimal,
    },
}

/// Errors from reading profiles or transactions.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum FetchError {
    /// The requested row does not exist.
    #[error("the requested record could not be found")]
    NotFound,

    /// A stored transaction's sign disagrees with its type.
    #[error("transaction {0} has an amount whose sign does not match its type")]
    InconsistentTransaction(TransactionId),

    /// The stored amounts sum to more than a decimal can hold.
    #[error("the balance is too large to compute")]
    BalanceOverflow,

    /// The provider failed.
    #[error("{0}")]
    Provider(String),
}

impl From<ProviderError> for FetchError {
    fn from(value: ProviderError) -> Self {
        FetchError::Provider(value.message())
    }
}

/// Errors from writing rows.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SubmitError {
    /// The provider failed or refused the row.
    #[error("{0}")]
    Provider(String),
}

impl From<ProviderError> for SubmitError {
    fn from(value: ProviderError) -> Self {
        SubmitError::Provider(value.message())
    }
}

/// Everything that can stop a deposit or withdrawal.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SubmitTransactionError {
    /// The input was rejected locally.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The balance needed for a withdrawal could not be derived.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The row could not be written.
    #[error(transparent)]
    Submit(#[from] SubmitError),
}
