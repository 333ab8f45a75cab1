//! Sessions, the cookie that carries them, the middleware that enforces them
//! and the pages that create and end them.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod redirect;
mod session;
mod sign_up;

pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AuthState, auth_guard, auth_guard_hx};
pub use session::{Access, Route, SessionManager};
pub use sign_up::{get_sign_up_page, post_sign_up};

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
