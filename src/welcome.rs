//! The landing page for visitors who are not logged in.

use axum::response::{IntoResponse, Response};
use maud::html;

use crate::{
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, CARD_STYLE, PAGE_CONTAINER_STYLE, base},
};

/// Display the welcome page with links to sign up and log in.
pub async fn get_welcome_page() -> Response {
    let content = html!(
        main class=(PAGE_CONTAINER_STYLE)
        {
            section class={(CARD_STYLE) " text-center"}
            {
                h1 class="text-2xl font-bold" { "Welcome to the Online ATM" }

                p class="text-gray-500 dark:text-gray-400"
                {
                    "Deposit, withdraw and check your balance from anywhere."
                }

                a href=(endpoints::SIGN_UP_VIEW) class={"block " (BUTTON_PRIMARY_STYLE)}
                {
                    "Sign Up"
                }

                a href=(endpoints::LOG_IN_VIEW) class={"block " (BUTTON_SECONDARY_STYLE)}
                {
                    "Login"
                }
            }
        }
    );

    base("Welcome", &content).into_response()
}
