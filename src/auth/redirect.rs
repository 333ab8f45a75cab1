//! Where to send a client after it logs in.
//!
//! The log-in page carries the page the client originally asked for in its
//! `redirect_url` query parameter. Only protected pages of this app are
//! accepted as targets; anything else falls back to the home page.

use axum::{extract::Request, http::Uri};

use crate::{auth::session::Route, endpoints};

/// The query parameter on the log-in page that holds the post log-in target.
pub(crate) const REDIRECT_URL_PARAM: &str = "redirect_url";

/// Accept `raw_url` as a post log-in target if it is a relative URL for a
/// protected page. The query string is kept.
pub(crate) fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }

    path_and_query_of_protected_page(&uri)
}

/// The post log-in target, defaulting to the home page.
pub(crate) fn redirect_target_or_home(raw_url: Option<&str>) -> String {
    raw_url
        .and_then(normalize_redirect_url)
        .unwrap_or_else(|| endpoints::HOME_VIEW.to_owned())
}

fn path_and_query_of_protected_page(uri: &Uri) -> Option<String> {
    let route = Route::from_path(uri.path())?;
    if !route.is_protected() {
        return None;
    }

    uri.path_and_query().map(|pq| pq.as_str().to_owned())
}

/// Build the log-in URL for a request that was refused by the auth guard.
///
/// Page requests remember their own URL. Requests to `/api` come from HTMX
/// and remember the page they were sent from, taken from `HX-Current-URL`.
/// If no usable target exists, the log-in URL has no redirect parameter.
pub(crate) fn build_log_in_redirect_url(request: &Request) -> String {
    let target = if request.uri().path().starts_with("/api") {
        redirect_target_from_hx_request(request)
    } else {
        path_and_query_of_protected_page(request.uri())
    };

    match target {
        Some(target) => build_log_in_redirect_url_from_target(&target),
        None => endpoints::LOG_IN_VIEW.to_owned(),
    }
}

fn build_log_in_redirect_url_from_target(redirect_target: &str) -> String {
    match serde_urlencoded::to_string([(REDIRECT_URL_PARAM, redirect_target)]) {
        Ok(param) => format!("{}?{}", endpoints::LOG_IN_VIEW, param),
        Err(error) => {
            tracing::error!("could not encode redirect URL {redirect_target}: {error}");
            endpoints::LOG_IN_VIEW.to_owned()
        }
    }
}

fn redirect_target_from_hx_request(request: &Request) -> Option<String> {
    let headers = request.headers();
    let is_hx_request = headers
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"));

    if !is_hx_request {
        tracing::warn!("missing HX-Request header for {}", request.uri().path());
        return None;
    }

    let current_url = headers
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())?;

    // HTMX sends an absolute URL, so only the path and query are checked.
    let uri = current_url.parse::<Uri>().ok()?;
    path_and_query_of_protected_page(&uri)
}
