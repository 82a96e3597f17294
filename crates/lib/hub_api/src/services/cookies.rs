//! Cookie service: set and clear httpOnly session cookies.

use axum_extra::extract::cookie::{Cookie, SameSite};
use hub_core::auth::jwt::ACCESS_TOKEN_EXPIRY_SECS;
use time::Duration;

use super::auth::REFRESH_TOKEN_EXPIRY_DAYS;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "hub_access";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "hub_refresh";

fn session_cookie(name: &str, value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(max_age)
        .build()
}

/// Build a httpOnly cookie for the access token.
pub fn access_cookie(token: &str, secure: bool) -> Cookie<'static> {
    session_cookie(
        ACCESS_COOKIE,
        token.to_string(),
        Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS),
        secure,
    )
}

/// Build a httpOnly cookie for the refresh token.
pub fn refresh_cookie(token: &str, secure: bool) -> Cookie<'static> {
    session_cookie(
        REFRESH_COOKIE,
        token.to_string(),
        Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
        secure,
    )
}

/// Build an expired access cookie to clear auth state.
pub fn clear_access_cookie(secure: bool) -> Cookie<'static> {
    session_cookie(ACCESS_COOKIE, String::new(), Duration::ZERO, secure)
}

/// Build an expired refresh cookie.
pub fn clear_refresh_cookie(secure: bool) -> Cookie<'static> {
    session_cookie(REFRESH_COOKIE, String::new(), Duration::ZERO, secure)
}
