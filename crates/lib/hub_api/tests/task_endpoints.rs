//! Task endpoints end to end with a scripted model.

mod common;

use std::sync::Arc;

use common::{Script, ScriptedGenerator, app, post_json, send, store_with_key};
use hub_api::startup::Readiness;
use serde_json::json;

async fn run(
    script: Script,
    path: &str,
    body: serde_json::Value,
) -> (u16, serde_json::Value, Arc<ScriptedGenerator>) {
    let (store, key) = store_with_key().await;
    let generator = Arc::new(ScriptedGenerator::new(script));
    let router = app(store, generator.clone(), Readiness::default());
    let (status, json) = send(router, post_json(path, Some(&key), body)).await;
    (status, json, generator)
}

#[tokio::test]
async fn sentiment_returns_model_label() {
    let (status, body, generator) = run(
        Script::Reply("positive\n"),
        "/sentiment/",
        json!({"text": "I love this"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"sentiment": "positive"}));
    let (prompt, temperature) = generator.last_prompt().unwrap();
    assert!(prompt.ends_with("Text: I love this"));
    assert_eq!(temperature, 0.0);
}

#[tokio::test]
async fn summarize_without_key_is_rejected() {
    let (store, _) = store_with_key().await;
    let generator = Arc::new(ScriptedGenerator::new(Script::Reply("unused")));
    let router = app(store, generator.clone(), Readiness::default());
    let (status, body) = send(
        router,
        post_json("/summarize/", None, json!({"text": "long text"})),
    )
    .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "API key required");
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn keywords_with_unknown_model_is_unavailable() {
    let (status, body, generator) = run(
        Script::ModelNotFound,
        "/keywords/",
        json!({"text": "Rust, Tokio and axum", "count": 3}),
    )
    .await;
    assert_eq!(status, 503);
    assert_eq!(
        body,
        json!({"error": "The AI model is currently unavailable. Please try again later."})
    );
    assert!(generator.last_prompt().unwrap().0.starts_with("Extract the 3 most"));
}

#[tokio::test]
async fn generate_rejects_oversized_max_length() {
    let (status, body, generator) = run(
        Script::Reply("unused"),
        "/generate/",
        json!({"prompt_text": "a poem", "max_length": 5000}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(
        body,
        json!({"max_length": ["Ensure this value is less than or equal to 2000."]})
    );
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn other_upstream_failures_are_generic() {
    let (status, body, _) = run(
        Script::Quota,
        "/api/services/classify/",
        json!({"text": "The match ended 2-1"}),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(
        body,
        json!({"error": "An unexpected error occurred during text classification"})
    );
    assert!(!body.to_string().contains("quota"));

    let (status, _, _) = run(Script::ModelNotFound, "/summarize/", json!({"text": "x"})).await;
    assert_eq!(status, 500);
}

#[tokio::test]
async fn keywords_are_split_into_a_list() {
    let (status, body, _) = run(
        Script::Reply("rust, memory safety , tokio"),
        "/keywords/",
        json!({"text": "Rust gives memory safety; Tokio gives async."}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"keywords": ["rust", "memory safety", "tokio"]}));
}

#[tokio::test]
async fn classify_matches_default_categories() {
    let (status, body, _) = run(
        Script::Reply("sports"),
        "/classify/",
        json!({"text": "The match ended 2-1"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["category"], "Sports");
    assert_eq!(body["confidence"], "high");
    assert_eq!(body["available_categories"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn detect_language_parses_name_and_code() {
    let (status, body, _) = run(
        Script::Reply("French (fr)"),
        "/detect-language/",
        json!({"text": "Bonjour tout le monde"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({
            "language": "French",
            "language_code": "fr",
            "raw_response": "French (fr)",
            "confidence": "high",
        })
    );
}

#[tokio::test]
async fn translate_reports_auto_detected_source() {
    let (status, body, _) = run(
        Script::Reply("Hello"),
        "/translate/",
        json!({"text": "Hola", "target_language": "English"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({
            "translated_text": "Hello",
            "source_language": "auto-detected",
            "target_language": "English",
            "original_text": "Hola",
        })
    );
}

#[tokio::test]
async fn answer_uses_context_temperature() {
    let (status, body, generator) = run(
        Script::Reply("Blue."),
        "/answer/",
        json!({"question": "What colour is the sky?", "context": "The sky is blue."}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["has_context"], true);
    assert_eq!(body["context_provided"], true);
    assert_eq!(generator.last_prompt().unwrap().1, 0.2);
}

#[tokio::test]
async fn generate_counts_words() {
    let (status, body, _) = run(
        Script::Reply("Dear team,\nthe release is ready."),
        "/generate/",
        json!({"prompt_text": "announce the release", "content_type": "email"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["content_type"], "email");
    assert_eq!(body["max_length"], 500);
    assert_eq!(body["word_count"], 6);
}

#[tokio::test]
async fn user_text_braces_are_not_substituted() {
    let (status, _, generator) = run(
        Script::Reply("ok"),
        "/summarize/",
        json!({"text": "literal {text} and {count}"}),
    )
    .await;
    assert_eq!(status, 200);
    assert!(generator.last_prompt().unwrap().0.contains("literal {text} and {count}"));
}

#[tokio::test]
async fn malformed_json_with_header_key_is_a_400() {
    let (store, key) = store_with_key().await;
    let generator = Arc::new(ScriptedGenerator::new(Script::Reply("unused")));
    let router = app(store, generator.clone(), Readiness::default());
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/sentiment/")
        .header("x-api-key", key)
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, body) = send(router, req).await;
    assert_eq!(status, 400);
    assert!(body.get("non_field_errors").is_some());
    assert_eq!(generator.calls(), 0);
}
