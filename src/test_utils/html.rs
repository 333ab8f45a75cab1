//! Reading rendered pages and panels back out of handler responses.

use axum::{body::Body, response::Response};
use scraper::{Html, Selector};

async fn read_body(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not get response body");

    String::from_utf8_lossy(&body).into_owned()
}

/// Parse a full page, e.g. the dashboard or the history.
pub(crate) async fn parse_html_document(response: Response<Body>) -> Html {
    Html::parse_document(&read_body(response).await)
}

/// Parse a partial response that HTMX swaps in, e.g. a re-rendered form or
/// the transaction panel.
pub(crate) async fn parse_html_fragment(response: Response<Body>) -> Html {
    Html::parse_fragment(&read_body(response).await)
}

/// The trimmed text of the first element matching `selector`.
pub(crate) fn select_text(html: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector)
        .unwrap_or_else(|error| panic!("bad selector {selector:?}: {error}"));

    html.select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_owned())
}

#[track_caller]
pub(crate) fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "page did not parse cleanly: {:?}",
        html.errors
    );
}
