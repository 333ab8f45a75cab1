//! The dashboard: the current balance and the deposit and withdraw form.

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    endpoints,
    error::FetchError,
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, CARD_STYLE, ERROR_MESSAGE_STYLE,
        PAGE_CONTAINER_STYLE, SUCCESS_MESSAGE_STYLE, base, format_currency, loading_spinner,
        text_input,
    },
    identity::Identity,
    ledger::{Balance, Ledger, TransactionKind},
    navigation::NavBar,
};

/// The ID of the element replaced after each deposit or withdrawal.
pub(super) const PANEL_ID: &str = "transaction-panel";

/// Feedback shown under the form after a submission.
pub(super) enum PanelMessage {
    Success(String),
    Error(String),
}

/// The balance and the form, which HTMX swaps out after each submission.
///
/// `amount` is put back into the amount field so a rejected input is not lost.
pub(super) fn transaction_panel(
    balance: Result<Balance, &FetchError>,
    amount: &str,
    message: Option<&PanelMessage>,
) -> Markup {
    html! {
        section id=(PANEL_ID) class=(CARD_STYLE)
        {
            @match balance {
                Ok(balance) => {
                    h2 id="balance" class="text-2xl font-bold"
                    {
                        "Current Balance: " (format_currency(balance.value()))
                    }
                }
                Err(error) => {
                    h2 id="balance" class="text-2xl font-bold" { "Current Balance: unavailable" }
                    p class=(ERROR_MESSAGE_STYLE) { "Failed to fetch balance: " (error) }
                }
            }

            form
                hx-post=(endpoints::TRANSACTIONS_API)
                hx-target={"#" (PANEL_ID)}
                hx-swap="outerHTML"
                hx-indicator="#indicator"
                hx-disabled-elt="#amount, button"
                class="space-y-4"
            {
                (text_input("amount", "Amount", "text", amount, None))

                @if let Some(message) = message {
                    @match message {
                        PanelMessage::Success(text) => {
                            p class=(SUCCESS_MESSAGE_STYLE) { (text) }
                        }
                        PanelMessage::Error(text) => {
                            p class=(ERROR_MESSAGE_STYLE) { (text) }
                        }
                    }
                }

                div class="flex gap-4"
                {
                    button
                        type="submit"
                        name="kind"
                        value=(TransactionKind::Deposit.as_str())
                        class=(BUTTON_PRIMARY_STYLE)
                    {
                        span class="inline htmx-indicator" id="indicator"
                        {
                            (loading_spinner())
                        }
                        "Deposit"
                    }

                    button
                        type="submit"
                        name="kind"
                        value=(TransactionKind::Withdraw.as_str())
                        class=(BUTTON_SECONDARY_STYLE)
                    {
                        "Withdraw"
                    }
                }
            }
        }
    }
}

fn dashboard_view(balance: Result<Balance, &FetchError>) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Dashboard" }

            (transaction_panel(balance, "", None))
        }
    );

    base("Dashboard", &content)
}

/// Renders the dashboard with the balance derived from every transaction.
pub async fn get_dashboard_page(
    State(ledger): State<Ledger>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let balance = ledger.compute_balance(identity).await;

    if let Err(error) = &balance {
        tracing::error!("could not derive balance for {identity}: {error}");
    }

    dashboard_view(balance.as_ref().copied()).into_response()
}
