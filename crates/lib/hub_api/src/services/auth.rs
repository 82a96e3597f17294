//! Account and session flows delegating to `hub_core::auth`.

use chrono::{Duration, Utc};
use hub_core::auth::AuthError;
use hub_core::auth::jwt::{ACCESS_TOKEN_EXPIRY_SECS, generate_access_token};
use hub_core::auth::password::{check_new_password, hash_password, verify_password};
use hub_core::auth::queries;
use hub_core::credentials::CredentialStore;
use hub_core::models::auth::User;
use hub_core::models::credentials::Credential;
use hub_core::tasks::FieldErrors;
use hub_core::tasks::schema::{FieldKind, FieldSpec, TaskInput, validate};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{AccountInfo, ApiKeyInfo, LoginRequest, SessionResponse, SignupRequest};

/// Refresh token lifetime: 30 days.
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

/// Shown when a session view could not read or create the API key.
pub const API_KEY_WARNING: &str =
    "There was an issue with your API key. Please contact support.";

/// Generate a cryptographically random refresh token (64 alphanumeric chars).
fn generate_refresh_token() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// SHA-256 hash a refresh token for storage.
fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Return the account's API key, creating it if needed.
///
/// A failed attempt is retried once. If that also fails the caller gets no
/// key and a warning to show instead.
pub async fn ensure_api_key(
    store: &dyn CredentialStore,
    user_id: &str,
) -> (Option<Credential>, Option<String>) {
    match store.get_or_create(user_id).await {
        Ok((credential, created)) => {
            if created {
                info!(user_id, "created API key");
            }
            return (Some(credential), None);
        }
        Err(e) => warn!(user_id, error = %e, "API key get-or-create failed, retrying once"),
    }
    match store.get_or_create(user_id).await {
        Ok((credential, _)) => (Some(credential), None),
        Err(e) => {
            error!(user_id, error = %e, "API key fallback get-or-create failed");
            (None, Some(API_KEY_WARNING.to_string()))
        }
    }
}

/// Issue an access token and a stored refresh token for `user`.
async fn start_session(
    pool: &PgPool,
    user: User,
    api_key: Option<Credential>,
    warning: Option<String>,
    jwt_secret: &[u8],
) -> AppResult<SessionResponse> {
    let access_token = generate_access_token(&user.id, &user.username, jwt_secret)?;
    let refresh_token = generate_refresh_token();
    let token_hash = hash_refresh_token(&refresh_token);

    let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);
    queries::store_refresh_token(pool, &token_hash, &user.id, expires_at).await?;

    Ok(SessionResponse {
        access_token,
        refresh_token,
        expires_in: ACCESS_TOKEN_EXPIRY_SECS,
        token_type: "Bearer".to_string(),
        user: AccountInfo {
            id: user.id,
            username: user.username,
            email: user.email,
        },
        api_key: api_key.map(ApiKeyInfo::from),
        warning,
    })
}

fn push_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

/// Blank values are left to [`check_signup`] and the credential check.
const ACCOUNT_TEXT: FieldKind = FieldKind::Text { allow_blank: true };

const SIGNUP_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("username", ACCOUNT_TEXT),
    FieldSpec::required("email", ACCOUNT_TEXT),
    FieldSpec::required("password", ACCOUNT_TEXT),
    FieldSpec::required("confirm_password", ACCOUNT_TEXT),
];

const LOGIN_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("username", ACCOUNT_TEXT),
    FieldSpec::required("password", ACCOUNT_TEXT),
];

/// The value as sent. The schema trims text, but passwords keep their
/// surrounding whitespace.
fn sent_text(payload: &Value, input: &TaskInput, name: &str) -> String {
    payload
        .get(name)
        .and_then(Value::as_str)
        .or_else(|| input.text(name))
        .unwrap_or_default()
        .to_string()
}

/// Read a signup body. Missing, null, or non-text fields are field errors.
pub fn read_signup(payload: &Value) -> Result<SignupRequest, FieldErrors> {
    let input = validate(SIGNUP_FIELDS, payload)?;
    Ok(SignupRequest {
        username: sent_text(payload, &input, "username"),
        email: sent_text(payload, &input, "email"),
        password: sent_text(payload, &input, "password"),
        confirm_password: sent_text(payload, &input, "confirm_password"),
    })
}

/// Read a login body. Missing, null, or non-text fields are field errors.
pub fn read_login(payload: &Value) -> Result<LoginRequest, FieldErrors> {
    let input = validate(LOGIN_FIELDS, payload)?;
    Ok(LoginRequest {
        username: sent_text(payload, &input, "username"),
        password: sent_text(payload, &input, "password"),
    })
}

/// Field checks that need no database.
pub fn check_signup(body: &SignupRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if body.username.trim().is_empty() {
        push_error(&mut errors, "username", "This field may not be blank.");
    }
    let email = body.email.trim();
    if email.is_empty() {
        push_error(&mut errors, "email", "This field may not be blank.");
    } else if !email.contains('@') {
        push_error(&mut errors, "email", "Enter a valid email address.");
    }
    if let Err(AuthError::ValidationError(msg)) =
        check_new_password(&body.password, &body.confirm_password)
    {
        push_error(&mut errors, "password", msg);
    }
    errors
}

/// Create an account, issue its API key, and start a session.
pub async fn signup(
    pool: &PgPool,
    store: &dyn CredentialStore,
    body: &SignupRequest,
    jwt_secret: &[u8],
) -> AppResult<SessionResponse> {
    let mut errors = check_signup(body);
    if !errors.is_empty() {
        return Err(AppError::InvalidFields(errors));
    }

    let username = body.username.trim();
    let email = body.email.trim();
    if queries::username_exists(pool, username).await? {
        push_error(&mut errors, "username", "Username already exists.");
    }
    if queries::email_exists(pool, email).await? {
        push_error(&mut errors, "email", "Email already registered.");
    }
    if !errors.is_empty() {
        return Err(AppError::InvalidFields(errors));
    }

    let pw_hash = hash_password(&body.password)?;
    let user = match queries::create_user(pool, username, email, &pw_hash).await {
        Ok(user) => user,
        // Lost a race with a concurrent signup for the same name or email.
        Err(AuthError::DbError(sqlx::Error::Database(db))) if db.is_unique_violation() => {
            let field = match db.constraint() {
                Some("users_email_unique") => ("email", "Email already registered."),
                _ => ("username", "Username already exists."),
            };
            push_error(&mut errors, field.0, field.1);
            return Err(AppError::InvalidFields(errors));
        }
        Err(e) => return Err(e.into()),
    };
    info!(user_id = %user.id, username, "account created");

    let (api_key, warning) = ensure_api_key(store, &user.id).await;
    start_session(pool, user, api_key, warning, jwt_secret).await
}

/// Authenticate with username + password.
pub async fn login(
    pool: &PgPool,
    store: &dyn CredentialStore,
    body: &LoginRequest,
    jwt_secret: &[u8],
) -> AppResult<SessionResponse> {
    let Some(account) = queries::find_user_by_username(pool, &body.username).await? else {
        return Err(AuthError::CredentialError.into());
    };
    if !verify_password(&body.password, &account.password_hash)? {
        return Err(AuthError::CredentialError.into());
    }
    info!(user_id = %account.user.id, "login succeeded");

    let (api_key, warning) = ensure_api_key(store, &account.user.id).await;
    start_session(pool, account.user, api_key, warning, jwt_secret).await
}

/// Exchange a refresh token for a new session (single-use rotation).
pub async fn refresh(
    pool: &PgPool,
    store: &dyn CredentialStore,
    refresh_token: &str,
    jwt_secret: &[u8],
) -> AppResult<SessionResponse> {
    let token_hash = hash_refresh_token(refresh_token);
    let Some((token_id, user_id)) = queries::find_valid_refresh_token(pool, &token_hash).await?
    else {
        return Err(AppError::Unauthorized("Invalid refresh token".into()));
    };

    queries::revoke_refresh_token(pool, &token_id).await?;

    let user = queries::get_user_by_id(pool, &user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let api_key = store.find(&user.id).await.unwrap_or_else(|e| {
        warn!(user_id = %user.id, error = %e, "could not read API key during refresh");
        None
    });
    start_session(pool, user, api_key, None, jwt_secret).await
}

/// Revoke a refresh token, if one was presented.
pub async fn logout(pool: &PgPool, refresh_token: Option<&str>) -> AppResult<()> {
    if let Some(token) = refresh_token {
        let token_hash = hash_refresh_token(token);
        queries::revoke_refresh_token_by_hash(pool, &token_hash).await?;
    }
    Ok(())
}
