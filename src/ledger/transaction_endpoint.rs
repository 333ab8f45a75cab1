//! Handles deposits and withdrawals submitted from the dashboard.

use axum::{
    Extension, Form,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    identity::Identity,
    ledger::{
        Ledger, TransactionKind,
        dashboard_page::{PanelMessage, transaction_panel},
    },
    html::format_currency,
};

/// The data entered in the dashboard form.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// The amount exactly as typed.
    pub amount: String,
    /// The value of the button that was pressed, "deposit" or "withdraw".
    pub kind: String,
}

/// Validate and store a deposit or withdrawal, then return the dashboard
/// panel with the balance derived again from the provider.
///
/// On failure the panel shows the error and keeps the typed amount. The
/// response is always the panel so HTMX can swap it in place.
pub async fn post_transaction(
    State(ledger): State<Ledger>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let kind = match form.kind.parse::<TransactionKind>() {
        Ok(kind) => kind,
        Err(error) => {
            tracing::warn!("rejected transaction form from {identity}: {error}");
            let balance = ledger.compute_balance(identity).await;
            let message = PanelMessage::Error("Choose deposit or withdraw.".to_owned());
            return transaction_panel(balance.as_ref().copied(), &form.amount, Some(&message))
                .into_response();
        }
    };

    let before = ledger.compute_balance(identity).await;

    let transaction = match ledger
        .submit_transaction(identity, kind, &form.amount)
        .await
    {
        Ok(transaction) => transaction,
        Err(error) => {
            tracing::info!("{kind} by {identity} was not stored: {error}");
            let message = PanelMessage::Error(error.to_string());
            return transaction_panel(before.as_ref().copied(), &form.amount, Some(&message))
                .into_response();
        }
    };

    let after = ledger.compute_balance(identity).await;

    if let (Ok(before), Ok(after)) = (&before, &after) {
        match before.apply(&transaction) {
            Some(expected) if expected != *after => tracing::warn!(
                "balance for {identity} is {} but {} was expected, another session may have written",
                after.value(),
                expected.value()
            ),
            Some(_) => {}
            None => tracing::warn!(
                "balance for {identity} overflowed applying transaction {}",
                transaction.id
            ),
        }
    }

    let verb = match kind {
        TransactionKind::Deposit => "Deposited",
        TransactionKind::Withdraw => "Withdrew",
    };
    let message = PanelMessage::Success(format!(
        "{verb} {}.",
        format_currency(transaction.magnitude())
    ));

    transaction_panel(after.as_ref().copied(), "", Some(&message)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{Extension, Form, extract::State, http::StatusCode, response::Response};
    use scraper::Html;

    use crate::{
        html::{ERROR_MESSAGE_STYLE, SUCCESS_MESSAGE_STYLE},
        identity::Identity,
        ledger::{Ledger, TransactionKind},
        test_utils::{
            CountingStore, assert_form_input_with_value, get_test_provider, must_get_form,
            parse_html_fragment, select_text, sign_up_test_user,
        },
    };

    use super::{TransactionForm, post_transaction};

    async fn get_ledger() -> (Ledger, Arc<CountingStore>, Identity) {
        let provider = Arc::new(get_test_provider());
        let identity = sign_up_test_user(&provider, "a@x.com").await;
        let store = Arc::new(CountingStore::new(provider));

        (Ledger::new(store.clone()), store, identity)
    }

    async fn submit(ledger: &Ledger, identity: Identity, kind: &str, amount: &str) -> Html {
        let response: Response = post_transaction(
            State(ledger.clone()),
            Extension(identity),
            Form(TransactionForm {
                amount: amount.to_owned(),
                kind: kind.to_owned(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        parse_html_fragment(response).await
    }

    fn message(html: &Html, class: &str) -> Option<String> {
        select_text(html, &format!("p[class=\"{class}\"]"))
    }

    #[tokio::test]
    async fn deposit_updates_balance() {
        let (ledger, store, identity) = get_ledger().await;

        let html = submit(&ledger, identity, "deposit", "50.00").await;

        assert_eq!(
            select_text(&html, "#balance").as_deref(),
            Some("Current Balance: $50.00")
        );
        assert_eq!(
            message(&html, SUCCESS_MESSAGE_STYLE).as_deref(),
            Some("Deposited $50.00.")
        );
        assert_eq!(store.insert_transaction_calls(), 1);
        let form = must_get_form(&html);
        assert_form_input_with_value(&form, "amount", "text", "");
    }

    #[tokio::test]
    async fn deposit_then_withdraw_leaves_difference() {
        let (ledger, _, identity) = get_ledger().await;
        submit(&ledger, identity, "deposit", "50.00").await;

        let html = submit(&ledger, identity, "withdraw", "20.00").await;

        assert_eq!(
            select_text(&html, "#balance").as_deref(),
            Some("Current Balance: $30.00")
        );
        let history = ledger.fetch_transactions(identity).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, TransactionKind::Withdraw);
    }

    #[tokio::test]
    async fn overdraw_is_rejected_and_amount_kept() {
        let (ledger, store, identity) = get_ledger().await;
        submit(&ledger, identity, "deposit", "10").await;

        let html = submit(&ledger, identity, "withdraw", "10.01").await;

        assert_eq!(
            message(&html, ERROR_MESSAGE_STYLE).as_deref(),
            Some("Insufficient balance.")
        );
        assert_eq!(
            select_text(&html, "#balance").as_deref(),
            Some("Current Balance: $10.00")
        );
        assert_eq!(store.insert_transaction_calls(), 1);
        let form = must_get_form(&html);
        assert_form_input_with_value(&form, "amount", "text", "10.01");
    }

    #[tokio::test]
    async fn invalid_amount_is_rejected_without_writing() {
        let (ledger, store, identity) = get_ledger().await;

        for (amount, want_error) in [
            ("abc", "Enter a valid amount."),
            ("0", "Enter an amount greater than zero."),
            ("-5", "Enter an amount greater than zero."),
            ("0.001", "Enter an amount in whole cents."),
        ] {
            let html = submit(&ledger, identity, "deposit", amount).await;

            assert_eq!(
                message(&html, ERROR_MESSAGE_STYLE).as_deref(),
                Some(want_error),
                "amount {amount:?}"
            );
        }
        assert_eq!(store.insert_transaction_calls(), 0);
    }

    #[tokio::test]
    async fn deposit_that_would_overflow_balance_is_rejected() {
        let (ledger, store, identity) = get_ledger().await;
        let max = rust_decimal::Decimal::MAX.to_string();
        submit(&ledger, identity, "deposit", &max).await;

        let html = submit(&ledger, identity, "deposit", &max).await;

        assert_eq!(
            message(&html, ERROR_MESSAGE_STYLE).as_deref(),
            Some("Amount is too large.")
        );
        assert_eq!(store.insert_transaction_calls(), 1);
    }

    #[tokio::test]
    async fn unknown_kind_is_rejected() {
        let (ledger, store, identity) = get_ledger().await;

        let html = submit(&ledger, identity, "transfer", "5").await;

        assert_eq!(
            message(&html, ERROR_MESSAGE_STYLE).as_deref(),
            Some("Choose deposit or withdraw.")
        );
        assert_eq!(store.insert_transaction_calls(), 0);
    }
}
