//! The transaction row, its direction, and the amount and balance types built on top.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{error::ValidationError, identity::Identity};

/// The provider-assigned ID of a transaction row.
pub type TransactionId = i64;

/// Which way money moved.
///
/// The kind is the authoritative direction of a transaction. The sign of
/// [Transaction::amount] is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money paid into the account.
    Deposit,
    /// Money taken out of the account.
    Withdraw,
}

impl TransactionKind {
    /// The name stored in the `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
        }
    }

    /// Apply this kind's sign to a positive amount.
    pub fn signed(&self, amount: Amount) -> Decimal {
        match self {
            TransactionKind::Deposit => amount.value(),
            TransactionKind::Withdraw => -amount.value(),
        }
    }

    /// Whether `amount` carries the sign this kind requires.
    pub fn is_consistent_with(&self, amount: Decimal) -> bool {
        match self {
            TransactionKind::Deposit => amount > Decimal::ZERO,
            TransactionKind::Withdraw => amount < Decimal::ZERO,
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdraw" => Ok(TransactionKind::Withdraw),
            other => Err(format!("unknown transaction type \"{other}\"")),
        }
    }
}

/// The number of decimal places in a cent.
const CENT_SCALE: u32 = 2;

/// A strictly positive amount of money entered by a user.
///
/// The only way to get one is [Amount::parse], so holding an `Amount` means
/// the input has already been validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    /// Parse raw form input into an amount.
    ///
    /// Surrounding whitespace is ignored and both plain (`50.00`) and
    /// scientific (`5e1`) notation are accepted. Trailing zeros do not count
    /// towards the precision, so `12.500` is the same as `12.5`.
    ///
    /// # Errors
    ///
    /// Returns [ValidationError::NotANumber] if the input is not a decimal
    /// number, [ValidationError::NonPositive] if it is zero or negative and
    /// [ValidationError::SubCent] if it has more than two decimal places.
    pub fn parse(raw_input: &str) -> Result<Self, ValidationError> {
        let trimmed = raw_input.trim();

        let value = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| ValidationError::NotANumber)?;

        if value <= Decimal::ZERO {
            return Err(ValidationError::NonPositive);
        }

        let value = value.normalize();
        if value.scale() > CENT_SCALE {
            return Err(ValidationError::SubCent);
        }

        Ok(Self(value))
    }

    /// The amount as a decimal.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

/// A row from the append-only transaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The row ID.
    pub id: TransactionId,
    /// Whose ledger the row belongs to.
    pub user_id: Identity,
    /// The signed amount: positive for deposits, negative for withdrawals.
    pub amount: Decimal,
    /// The direction of the transaction.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// When the provider stored the row.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Whether the sign of the amount matches the transaction kind.
    pub fn is_consistent(&self) -> bool {
        self.kind.is_consistent_with(self.amount)
    }

    /// The amount without its sign, for display next to the kind.
    pub fn magnitude(&self) -> Decimal {
        self.amount.abs()
    }
}

/// A transaction that has not been written yet.
///
/// Construct with [NewTransaction::new] so the sign always follows the kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTransaction {
    user_id: Identity,
    amount: Decimal,
    #[serde(rename = "type")]
    kind: TransactionKind,
}

impl NewTransaction {
    /// Create a row for `user_id` whose signed amount is derived from `kind`.
    pub fn new(user_id: Identity, kind: TransactionKind, amount: Amount) -> Self {
        Self {
            user_id,
            amount: kind.signed(amount),
            kind,
        }
    }

    /// The owner of the row.
    pub fn user_id(&self) -> Identity {
        self.user_id
    }

    /// The signed amount.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// The direction.
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }
}

/// A balance derived by summing a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Balance(Decimal);

impl Balance {
    /// Sum the signed amounts of `transactions`.
    ///
    /// Returns `None` if the sum does not fit in a [Decimal].
    pub fn from_transactions<'a>(
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> Option<Self> {
        transactions
            .into_iter()
            .try_fold(Self::default(), |balance, transaction| {
                balance.apply(transaction)
            })
    }

    /// The balance after applying a transaction that was just written, or
    /// `None` on overflow.
    pub fn apply(self, transaction: &Transaction) -> Option<Self> {
        self.checked_add(transaction.amount)
    }

    /// Add a signed amount, or `None` on overflow.
    pub fn checked_add(self, amount: Decimal) -> Option<Self> {
        self.0.checked_add(amount).map(Self)
    }

    /// The balance as a decimal.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for Balance {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod amount_tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use crate::error::ValidationError;

    use super::Amount;

    #[test]
    fn parses_plain_decimal() {
        let amount = Amount::parse("50.00").unwrap();

        assert_eq!(amount.value(), Decimal::from_str("50.00").unwrap());
    }

    #[test]
    fn ignores_surrounding_whitespace() {
        let amount = Amount::parse("  12.5\n").unwrap();

        assert_eq!(amount.value(), Decimal::from_str("12.5").unwrap());
    }

    #[test]
    fn parses_scientific_notation() {
        let amount = Amount::parse("5e1").unwrap();

        assert_eq!(amount.value(), Decimal::from(50));
    }

    #[test]
    fn rejects_non_numbers() {
        for input in ["", "   ", "abc", "12abc", "NaN", "inf", "1.2.3"] {
            assert_eq!(
                Amount::parse(input),
                Err(ValidationError::NotANumber),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn rejects_sub_cent_amounts() {
        for input in ["0.001", "12.345", "1e-3"] {
            assert_eq!(
                Amount::parse(input),
                Err(ValidationError::SubCent),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn trailing_zeros_are_not_sub_cent() {
        let amount = Amount::parse("12.500").unwrap();

        assert_eq!(amount.value(), Decimal::from_str("12.5").unwrap());
    }

    #[test]
    fn rejects_zero_and_negative() {
        for input in ["0", "0.00", "-1", "-0.01"] {
            assert_eq!(
                Amount::parse(input),
                Err(ValidationError::NonPositive),
                "input {input:?}"
            );
        }
    }
}
