//! Log-out route handler that revokes the session and clears the cookie.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    auth::{
        cookie::{get_token_from_cookies, invalidate_session_cookie},
        middleware::AuthState,
    },
    endpoints,
};

/// Revoke the session at the provider, clear the session cookie and redirect
/// the client to the welcome page.
///
/// The cookie is cleared even if the provider could not revoke the session.
pub async fn get_log_out(State(state): State<AuthState>, jar: PrivateCookieJar) -> Response {
    if let Some(token) = get_token_from_cookies(&jar)
        && let Err(error) = state.sessions.sign_out(&token).await
    {
        tracing::warn!("could not revoke session at provider: {error}");
    }

    (
        invalidate_session_cookie(jar, state.secure_cookies),
        Redirect::to(endpoints::ROOT),
    )
        .into_response()
}
