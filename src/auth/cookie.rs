//! The encrypted cookie that holds a browser's session token.
//!
//! A browser has exactly one session slot: the [COOKIE_TOKEN] cookie. Logging
//! in fills it and logging out clears it.
//!
//! Browsers drop `Secure` cookies sent over plain HTTP, so the flag is only set
//! when the server is behind TLS.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::identity::{Session, SessionToken};

pub(crate) const COOKIE_TOKEN: &str = "token";

mod datetime_format {
    //! Serializes a [time::OffsetDateTime] with a fixed width format.
    //!
    //! The default format writes midnight as "0:00:00.0", which then fails to
    //! parse because the hour must be two digits.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// Date time format for the cookie expiry, e.g. "2021-01-01 00:00:00.000000 +00:00:00".
    const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(dt: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = dt
            .format(DATE_TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// The contents of the session cookie.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub(crate) struct CookieToken {
    pub token: SessionToken,

    #[serde(with = "datetime_format")]
    pub expires_at: OffsetDateTime,
}

/// Put `session` in the browser's session slot.
///
/// The cookie expires when the provider stops honouring the session. `secure`
/// restricts the cookie to HTTPS.
///
/// # Errors
///
/// Returns an error if the token cannot be serialized.
pub(crate) fn set_session_cookie(
    jar: PrivateCookieJar,
    session: &Session,
    secure: bool,
) -> Result<PrivateCookieJar, serde_json::Error> {
    let cookie_token = CookieToken {
        token: session.token.clone(),
        expires_at: session.expires_at,
    };
    let value = serde_json::to_string(&cookie_token)?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, value))
            .path("/")
            .expires(session.expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(secure),
    ))
}

/// Set the session cookie to an invalid value and set its max age to zero,
/// which should delete the cookie on the client side.
pub(crate) fn invalidate_session_cookie(jar: PrivateCookieJar, secure: bool) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(secure),
    )
}

/// Read the session token out of the jar.
///
/// Returns `None` if the cookie is missing, cannot be decrypted or parsed, or
/// has passed its expiry.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Option<SessionToken> {
    let cookie = jar.get(COOKIE_TOKEN)?;

    let cookie_token: CookieToken = match serde_json::from_str(cookie.value_trimmed()) {
        Ok(cookie_token) => cookie_token,
        Err(error) => {
            tracing::debug!("could not parse session cookie: {error}");
            return None;
        }
    };

    (cookie_token.expires_at > OffsetDateTime::now_utc()).then_some(cookie_token.token)
}
