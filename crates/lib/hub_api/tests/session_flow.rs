//! Signup, login, dashboard, refresh and logout against Postgres.
//!
//! Runs only when `TEST_DATABASE_URL` points at a scratch database.

mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use common::{Script, ScriptedGenerator, post_json, send, test_config};
use hub_api::AppState;
use hub_api::startup::Readiness;
use hub_core::credentials::PgCredentialStore;
use serde_json::json;

async fn pg_app() -> Option<Router> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = sqlx::PgPool::connect(&url).await.unwrap();
    hub_api::migrate(&pool).await.unwrap();
    Some(hub_api::router(AppState {
        pool: pool.clone(),
        config: test_config(),
        credentials: Arc::new(PgCredentialStore::new(pool)),
        generator: Arc::new(ScriptedGenerator::new(Script::Reply("neutral"))),
        readiness: Readiness {
            migrations: true,
            model: true,
        },
    }))
}

fn unique_name() -> String {
    format!("user{}", uuid::Uuid::new_v4().simple())
}

fn signup_body(username: &str, password: &str, confirm: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": password,
        "confirm_password": confirm,
    })
}

#[tokio::test]
async fn signup_issues_a_working_key() {
    let Some(router) = pg_app().await else {
        return;
    };
    let username = unique_name();

    let (status, body) = send(
        router.clone(),
        post_json("/signup/", None, signup_body(&username, "hunter2hunter2", "hunter2hunter2")),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["username"], username.as_str());
    let key = body["api_key"]["key"].as_str().unwrap().to_string();
    assert!(key.starts_with("sk_"));

    let (status, body) = send(
        router.clone(),
        post_json("/sentiment/", Some(&key), json!({"text": "fine"})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["sentiment"], "neutral");

    let (status, body) = send(
        router,
        post_json("/signup/", None, signup_body(&username, "hunter2hunter2", "hunter2hunter2")),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["username"], json!(["Username already exists."]));
}

#[tokio::test]
async fn signup_rejects_mismatched_passwords() {
    let Some(router) = pg_app().await else {
        return;
    };
    let (status, body) = send(
        router,
        post_json("/signup/", None, signup_body(&unique_name(), "hunter2hunter2", "other")),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["password"], json!(["Passwords do not match."]));
}

#[tokio::test]
async fn login_dashboard_refresh_logout() {
    let Some(router) = pg_app().await else {
        return;
    };
    let username = unique_name();
    let (status, signup) = send(
        router.clone(),
        post_json("/signup/", None, signup_body(&username, "hunter2hunter2", "hunter2hunter2")),
    )
    .await;
    assert_eq!(status, 200);

    let (status, body) = send(
        router.clone(),
        post_json("/login/", None, json!({"username": username, "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, 401);
    assert_eq!(body["message"], "Invalid username or password.");

    let (status, login) = send(
        router.clone(),
        post_json("/login/", None, json!({"username": username, "password": "hunter2hunter2"})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(login["api_key"]["key"], signup["api_key"]["key"]);

    let access = login["access_token"].as_str().unwrap();
    let req = Request::builder()
        .uri("/dashboard/")
        .header("authorization", format!("Bearer {access}"))
        .body(Body::empty())
        .unwrap();
    let (status, dashboard) = send(router.clone(), req).await;
    assert_eq!(status, 200);
    assert_eq!(dashboard["api_key"]["key"], signup["api_key"]["key"]);

    let refresh = login["refresh_token"].as_str().unwrap();
    let (status, refreshed) = send(
        router.clone(),
        post_json("/refresh/", None, json!({"refresh_token": refresh})),
    )
    .await;
    assert_eq!(status, 200);
    let (status, _) = send(
        router.clone(),
        post_json("/refresh/", None, json!({"refresh_token": refresh})),
    )
    .await;
    assert_eq!(status, 401, "refresh tokens are single use");

    let new_refresh = refreshed["refresh_token"].as_str().unwrap();
    let (status, body) = send(
        router.clone(),
        post_json("/logout/", None, json!({"refresh_token": new_refresh})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    let (status, _) = send(
        router,
        post_json("/refresh/", None, json!({"refresh_token": new_refresh})),
    )
    .await;
    assert_eq!(status, 401);
}
