//! The page and API endpoint URIs.

/// The welcome page with links to sign up and log in.
pub const ROOT: &str = "/";
/// The page for creating an account.
pub const SIGN_UP_VIEW: &str = "/signup";
/// The page for logging in.
pub const LOG_IN_VIEW: &str = "/login";
/// The landing page for logged in users.
pub const HOME_VIEW: &str = "/home";
/// The page showing the balance with the deposit and withdraw form.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page listing a user's transactions.
pub const HISTORY_VIEW: &str = "/history";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";

/// The route for creating an account and its profile.
pub const SIGN_UP_API: &str = "/api/signup";
/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route for depositing and withdrawing.
pub const TRANSACTIONS_API: &str = "/api/transactions";
