//! Account and session request handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;

use super::parse_json_body;
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{LogoutResponse, RefreshRequest, SessionResponse};
use crate::services::auth;
use crate::services::cookies::{
    REFRESH_COOKIE, access_cookie, clear_access_cookie, clear_refresh_cookie, refresh_cookie,
};

fn with_session_cookies(jar: CookieJar, session: &SessionResponse, secure: bool) -> CookieJar {
    jar.add(access_cookie(&session.access_token, secure))
        .add(refresh_cookie(&session.refresh_token, secure))
}

/// Body token first, then the refresh cookie.
fn presented_refresh_token(jar: &CookieJar, body: Option<RefreshRequest>) -> Option<String> {
    body.and_then(|b| b.refresh_token)
        .filter(|t| !t.is_empty())
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()))
        .filter(|t| !t.is_empty())
}

/// `POST /signup/`: create an account and sign in.
pub async fn signup_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let body = auth::read_signup(&parse_json_body(&body)?).map_err(AppError::InvalidFields)?;
    let session = auth::signup(
        &state.pool,
        state.credentials.as_ref(),
        &body,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    let jar = with_session_cookies(jar, &session, state.config.secure_cookies);
    Ok((jar, Json(session)))
}

/// `POST /login/`: authenticate with username + password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let body = auth::read_login(&parse_json_body(&body)?).map_err(AppError::InvalidFields)?;
    let session = auth::login(
        &state.pool,
        state.credentials.as_ref(),
        &body,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    let jar = with_session_cookies(jar, &session, state.config.secure_cookies);
    Ok((jar, Json(session)))
}

/// `POST /refresh/`: exchange a refresh token for a new session.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let token = presented_refresh_token(&jar, body.map(|Json(b)| b))
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".into()))?;
    let session = auth::refresh(
        &state.pool,
        state.credentials.as_ref(),
        &token,
        state.config.jwt_secret.as_bytes(),
    )
    .await?;
    let jar = with_session_cookies(jar, &session, state.config.secure_cookies);
    Ok((jar, Json(session)))
}

/// `POST /logout/`: revoke the refresh token and clear session cookies.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    let token = presented_refresh_token(&jar, body.map(|Json(b)| b));
    auth::logout(&state.pool, token.as_deref()).await?;
    let secure = state.config.secure_cookies;
    let jar = jar
        .add(clear_access_cookie(secure))
        .add(clear_refresh_cookie(secure));
    Ok((jar, Json(LogoutResponse { success: true })))
}
