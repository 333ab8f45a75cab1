//! This file defines the routes for displaying the log-in page and handling log-in requests.

use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    auth::{
        cookie::{invalidate_session_cookie, set_session_cookie},
        middleware::AuthState,
        redirect::{normalize_redirect_url, redirect_target_or_home},
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, SUCCESS_MESSAGE_STYLE, base, link, loading_spinner,
        log_in_register, password_input, text_input,
    },
    identity::Credentials,
    internal_server_error::get_internal_server_error_redirect,
};

/// Shown on the log-in page after a successful sign-up.
pub const SIGN_UP_SUCCESS_MSG: &str = "Signup successful! Please login.";

fn log_in_form(email: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (text_input("email", "Email", "email", email, None))
            (password_input("", 0, error_message))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Don't have an account? "
                (link(endpoints::SIGN_UP_VIEW, "Sign up here"))
            }
        }
    }
}

/// The query parameters accepted by the log-in page.
#[derive(Deserialize)]
pub struct LogInQuery {
    /// The protected page to go to after logging in.
    pub redirect_url: Option<String>,
    /// Set by the sign-up page to show a confirmation message.
    #[serde(default)]
    pub registered: bool,
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<LogInQuery>) -> Response {
    let redirect_url = query.redirect_url.as_deref().and_then(normalize_redirect_url);
    let content = html! {
        @if query.registered {
            p class={"text-center pt-8 " (SUCCESS_MESSAGE_STYLE)} { (SIGN_UP_SUCCESS_MSG) }
        }

        (log_in_register(
            "Log in to your account",
            &log_in_form("", None, redirect_url.as_deref()),
        ))
    };

    base("Log In", &content).into_response()
}

/// The data entered by the user in the log-in form.
///
/// The password is checked by the provider, so it is not validated here.
#[derive(Deserialize)]
pub struct LogInData {
    /// Email entered during log-in.
    pub email: String,

    /// Password entered during log-in.
    pub password: String,

    /// Optional URL to redirect to after logging in.
    pub redirect_url: Option<String>,
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in the session cookie is set and the client is
/// redirected to the page it originally asked for, or the home page.
/// Otherwise, the form is returned with the provider's error message and the
/// email preserved.
pub async fn post_log_in(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Form(form): Form<LogInData>,
) -> Response {
    let redirect_url = form.redirect_url.as_deref().and_then(normalize_redirect_url);
    let credentials = Credentials::new(&form.email, &form.password);

    let session = match state.sessions.sign_in(&credentials).await {
        Ok(session) => session,
        Err(error) => {
            tracing::info!("log-in failed for {}: {error}", form.email.trim());
            return log_in_form(
                &form.email,
                Some(&error.to_string()),
                redirect_url.as_deref(),
            )
            .into_response();
        }
    };

    let target = redirect_target_or_home(redirect_url.as_deref());

    match set_session_cookie(jar.clone(), &session, state.secure_cookies) {
        Ok(jar) => (StatusCode::SEE_OTHER, HxRedirect(target), jar).into_response(),
        Err(error) => {
            tracing::error!("Error setting session cookie: {error}");
            (
                invalidate_session_cookie(jar, state.secure_cookies),
                get_internal_server_error_redirect(),
            )
                .into_response()
        }
    }
}
