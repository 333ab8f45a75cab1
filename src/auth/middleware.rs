//! Authentication middleware that resolves the session cookie to an identity
//! before any protected handler runs.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;

use crate::{
    AppState,
    auth::{
        cookie::{get_token_from_cookies, invalidate_session_cookie},
        redirect::build_log_in_redirect_url,
        session::{Access, Route, SessionManager},
    },
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// Resolves session tokens to identities.
    pub sessions: SessionManager,
    /// Whether the session cookie is restricted to HTTPS.
    pub secure_cookies: bool,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            sessions: state.sessions.clone(),
            secure_cookies: state.secure_cookies,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    // API routes are not pages, so they are guarded as the page they serve.
    let requested = Route::from_path(request.uri().path()).unwrap_or(Route::Dashboard);
    let log_in_redirect_url = build_log_in_redirect_url(&request);

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Error getting cookie jar: {error:?}. Redirecting to log in page.");
            return get_redirect(&log_in_redirect_url);
        }
    };
    let token = get_token_from_cookies(&jar);

    match state.sessions.guard(token.as_ref(), requested).await {
        Access::Granted(identity) => {
            parts.extensions.insert(identity);
            if let Some(token) = token {
                parts.extensions.insert(token);
            }

            next.run(Request::from_parts(parts, body)).await
        }
        Access::Redirect(route) => {
            let url = if route == Route::LogIn {
                log_in_redirect_url
            } else {
                route.path().to_owned()
            };

            (
                invalidate_session_cookie(jar, state.secure_cookies),
                get_redirect(&url),
            )
                .into_response()
        }
    }
}

/// Middleware function that checks for a valid session cookie.
/// The identity is placed into the request and then the request executed
/// normally if the session is valid, otherwise a redirect to the log-in page is
/// returned.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(identity): Extension<Identity>` to receive the identity.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware function that checks for a valid session cookie.
/// Same as [auth_guard], except the redirect is an HTMX redirect for requests
/// sent by HTMX.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}
