//! The transaction history, newest first.

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::UtcOffset;

use crate::{
    AppState, Error, endpoints,
    error::FetchError,
    html::{
        ERROR_MESSAGE_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base, format_currency,
    },
    identity::Identity,
    ledger::{Ledger, Transaction, TransactionKind},
    navigation::NavBar,
    timezone::{format_local, get_local_offset},
};

/// The state needed for [get_history_page].
#[derive(Clone)]
pub struct HistoryState {
    /// Where the transactions come from.
    pub ledger: Ledger,
    /// The canonical timezone to show timestamps in, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for HistoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            ledger: state.ledger.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// One line of the history, e.g. "Deposited $50.00 on 05 Jan 2025 14:03".
fn describe(transaction: &Transaction, local_offset: UtcOffset) -> String {
    let verb = match transaction.kind {
        TransactionKind::Deposit => "Deposited",
        TransactionKind::Withdraw => "Withdrew",
    };

    format!(
        "{verb} {} on {}",
        format_currency(transaction.magnitude()),
        format_local(transaction.created_at, local_offset)
    )
}

fn history_view(transactions: Result<&[Transaction], &FetchError>, local_offset: UtcOffset) -> Markup {
    let nav_bar = NavBar::new(endpoints::HISTORY_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4 w-full max-w-3xl"
            {
                h1 class="text-xl font-bold" { "Transaction History" }

                @match transactions {
                    Err(error) => {
                        p class=(ERROR_MESSAGE_STYLE) { "Failed to fetch transactions." }
                        p class="text-sm text-gray-500 dark:text-gray-400" { (error) }
                    }
                    Ok([]) => {
                        p { "No transactions found." }
                    }
                    Ok(transactions) => {
                        table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                        {
                            thead class=(TABLE_HEADER_STYLE)
                            {
                                tr
                                {
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Transaction" }
                                    th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Amount" }
                                }
                            }

                            tbody
                            {
                                @for transaction in transactions {
                                    tr class=(TABLE_ROW_STYLE)
                                    {
                                        td class=(TABLE_CELL_STYLE)
                                        {
                                            (describe(transaction, local_offset))
                                        }
                                        td class={(TABLE_CELL_STYLE) " text-right"}
                                        {
                                            (format_currency(transaction.amount))
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("History", &content)
}

/// Renders the signed-in user's transactions, newest first, with times in
/// the server's configured timezone.
///
/// # Errors
///
/// Returns [Error::InvalidTimezone] if the configured timezone is not known.
/// A failure to fetch transactions is shown on the page instead.
pub async fn get_history_page(
    State(state): State<HistoryState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezone(state.local_timezone.clone()))?;

    let transactions = state.ledger.fetch_transactions(identity).await;

    if let Err(error) = &transactions {
        tracing::error!("could not fetch transactions for {identity}: {error}");
    }

    Ok(history_view(transactions.as_deref(), local_offset).into_response())
}
