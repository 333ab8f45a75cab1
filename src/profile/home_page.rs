//! The page shown after logging in, greeting the user by name.

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    endpoints,
    error::FetchError,
    html::{BUTTON_SECONDARY_STYLE, CARD_STYLE, ERROR_MESSAGE_STYLE, PAGE_CONTAINER_STYLE, base},
    identity::Identity,
    navigation::NavBar,
    profile::ProfileBinder,
};

fn home_view(display_name: Result<&str, &FetchError>) -> Markup {
    let nav_bar = NavBar::new(endpoints::HOME_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class=(CARD_STYLE)
            {
                @match display_name {
                    Ok(name) => {
                        h1 class="text-2xl font-bold" { "Welcome, " (name) "!" }
                    }
                    Err(error) => {
                        h1 class="text-2xl font-bold" { "Welcome!" }
                        p class=(ERROR_MESSAGE_STYLE) { "Could not load your name: " (error) }
                    }
                }

                a href=(endpoints::DASHBOARD_VIEW) class=(BUTTON_SECONDARY_STYLE)
                {
                    "Go to Dashboard"
                }

                a href=(endpoints::HISTORY_VIEW) class=(BUTTON_SECONDARY_STYLE)
                {
                    "View Transaction History"
                }
            }
        }
    );

    base("Home", &content)
}

/// Renders the home page for the signed-in user.
///
/// A missing profile does not stop the page from rendering.
pub async fn get_home_page(
    State(profiles): State<ProfileBinder>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let display_name = profiles.get_display_name(identity).await;

    if let Err(error) = &display_name {
        tracing::warn!("could not get display name for {identity}: {error}");
    }

    home_view(display_name.as_deref()).into_response()
}
