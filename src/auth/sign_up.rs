//! The sign-up page and the handler that creates an identity and its profile.

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    auth::middleware::AuthState,
    endpoints,
    error::{AuthError, SignUpError},
    html::{
        BUTTON_PRIMARY_STYLE, ERROR_MESSAGE_STYLE, base, link, loading_spinner, log_in_register,
        password_input, text_input,
    },
    identity::Credentials,
    provider::ValidatedPassword,
};

/// Where each kind of sign-up error is shown.
#[derive(Default)]
struct SignUpFormErrors {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    other: Option<String>,
}

impl From<&SignUpError> for SignUpFormErrors {
    fn from(error: &SignUpError) -> Self {
        match error {
            SignUpError::EmptyName => Self {
                name: Some(error.to_string()),
                ..Default::default()
            },
            SignUpError::Auth(AuthError::InvalidEmail | AuthError::DuplicateAccount) => Self {
                email: Some(error.to_string()),
                ..Default::default()
            },
            SignUpError::Auth(AuthError::WeakPassword(_)) => Self {
                password: Some(error.to_string()),
                ..Default::default()
            },
            SignUpError::Auth(_) => Self {
                other: Some(error.to_string()),
                ..Default::default()
            },
            SignUpError::ProfileNotCreated { error, .. } => Self {
                other: Some(format!(
                    "Your account was created but your name could not be saved: {error}"
                )),
                ..Default::default()
            },
        }
    }
}

fn sign_up_form(name: &str, email: &str, errors: &SignUpFormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::SIGN_UP_API)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#name, #email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("name", "Name", "text", name, errors.name.as_deref()))
            (text_input("email", "Email", "email", email, errors.email.as_deref()))
            (password_input("", ValidatedPassword::MIN_LENGTH, errors.password.as_deref()))

            @if let Some(error_message) = &errors.other {
                p class=(ERROR_MESSAGE_STYLE) { (error_message) }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Sign up"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Already have an account? "
                (link(endpoints::LOG_IN_VIEW, "Log in here"))
            }
        }
    }
}

/// Display the sign-up page.
pub async fn get_sign_up_page() -> Response {
    let form = sign_up_form("", "", &SignUpFormErrors::default());
    let content = log_in_register("Create an account", &form);

    base("Sign Up", &content).into_response()
}

/// The data entered by the user in the sign-up form.
#[derive(Deserialize)]
pub struct SignUpData {
    /// The display name to greet the user with.
    pub name: String,
    /// The email to log in with.
    pub email: String,
    /// The password to log in with.
    pub password: String,
}

/// Handler for sign-up requests via the POST method.
///
/// On success the client is redirected to the log-in page, which shows a
/// confirmation. Otherwise the form is returned with the name and email
/// preserved and the error shown next to the field it concerns.
pub async fn post_sign_up(State(state): State<AuthState>, Form(form): Form<SignUpData>) -> Response {
    let credentials = Credentials::new(&form.email, &form.password);

    match state.sessions.sign_up(&credentials, &form.name).await {
        Ok(_) => {
            let url = format!("{}?registered=true", endpoints::LOG_IN_VIEW);
            (HxRedirect(url), StatusCode::SEE_OTHER).into_response()
        }
        Err(error) => {
            tracing::info!("sign-up failed for {}: {error}", form.email.trim());
            sign_up_form(&form.name, &form.email, &SignUpFormErrors::from(&error)).into_response()
        }
    }
}
