//! Shared fixtures: an in-memory credential store wrapped to count calls,
//! a scripted text generator, and a router over a lazily-connected pool
//! that these tests never reach.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use hub_api::AppState;
use hub_api::config::ApiConfig;
use hub_api::startup::Readiness;
use hub_core::credentials::{CredentialError, CredentialStore, MemoryCredentialStore};
use hub_core::llm::{GenerationParams, LlmConfig, LlmError, TextGenerator};
use hub_core::models::credentials::{Credential, KeyOwner};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

/// Memory store that counts every trait call.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryCredentialStore,
    pub calls: AtomicU32,
    pub fail_usage: bool,
}

impl CountingStore {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialStore for CountingStore {
    async fn issue(&self, user_id: &str) -> Result<Credential, CredentialError> {
        self.hit();
        self.inner.issue(user_id).await
    }

    async fn get_or_create(&self, user_id: &str) -> Result<(Credential, bool), CredentialError> {
        self.hit();
        self.inner.get_or_create(user_id).await
    }

    async fn rotate(&self, user_id: &str) -> Result<Credential, CredentialError> {
        self.hit();
        self.inner.rotate(user_id).await
    }

    async fn validate(&self, key: &str) -> Result<KeyOwner, CredentialError> {
        self.hit();
        self.inner.validate(key).await
    }

    async fn record_usage(&self, credential_id: Uuid) -> Result<(), CredentialError> {
        self.hit();
        if self.fail_usage {
            return Err(CredentialError::Db(sqlx::Error::PoolTimedOut));
        }
        self.inner.record_usage(credential_id).await
    }

    async fn find(&self, user_id: &str) -> Result<Option<Credential>, CredentialError> {
        self.hit();
        self.inner.find(user_id).await
    }

    async fn set_active(&self, user_id: &str, active: bool) -> Result<Credential, CredentialError> {
        self.hit();
        self.inner.set_active(user_id, active).await
    }
}

/// Store whose lookups always fail with a database error.
pub struct BrokenStore;

#[async_trait]
impl CredentialStore for BrokenStore {
    async fn issue(&self, _: &str) -> Result<Credential, CredentialError> {
        Err(CredentialError::Db(sqlx::Error::PoolTimedOut))
    }
    async fn get_or_create(&self, _: &str) -> Result<(Credential, bool), CredentialError> {
        Err(CredentialError::Db(sqlx::Error::PoolTimedOut))
    }
    async fn rotate(&self, _: &str) -> Result<Credential, CredentialError> {
        Err(CredentialError::Db(sqlx::Error::PoolTimedOut))
    }
    async fn validate(&self, _: &str) -> Result<KeyOwner, CredentialError> {
        Err(CredentialError::Db(sqlx::Error::PoolTimedOut))
    }
    async fn record_usage(&self, _: Uuid) -> Result<(), CredentialError> {
        Err(CredentialError::Db(sqlx::Error::PoolTimedOut))
    }
    async fn find(&self, _: &str) -> Result<Option<Credential>, CredentialError> {
        Err(CredentialError::Db(sqlx::Error::PoolTimedOut))
    }
    async fn set_active(&self, _: &str, _: bool) -> Result<Credential, CredentialError> {
        Err(CredentialError::Db(sqlx::Error::PoolTimedOut))
    }
}

/// What the scripted generator answers.
#[derive(Clone)]
pub enum Script {
    Reply(&'static str),
    ModelNotFound,
    Quota,
}

/// Deterministic generator recording each prompt and temperature.
pub struct ScriptedGenerator {
    pub script: Script,
    pub prompts: Mutex<Vec<(String, f32)>>,
}

impl ScriptedGenerator {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<(String, f32)> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), params.temperature));
        match self.script {
            Script::Reply(text) => Ok(text.to_string()),
            Script::ModelNotFound => Err(LlmError::ModelUnavailable(
                "models/gemini-9 is not found for API version v1beta".into(),
            )),
            Script::Quota => Err(LlmError::Api {
                status: 429,
                message: "Resource has been exhausted (quota)".into(),
            }),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub const JWT_SECRET: &str = "test-secret";

pub fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        pg_connection_url: "postgres://nobody@127.0.0.1:1/none".into(),
        db_max_connections: 1,
        jwt_secret: JWT_SECRET.into(),
        secure_cookies: false,
        llm: LlmConfig {
            timeout: Duration::from_secs(5),
            ..LlmConfig::default()
        },
    }
}

/// Router over the given store and generator.
pub fn app(
    credentials: Arc<dyn CredentialStore>,
    generator: Arc<dyn TextGenerator>,
    readiness: Readiness,
) -> Router {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://nobody@127.0.0.1:1/none")
        .unwrap();
    hub_api::router(AppState {
        pool,
        config: test_config(),
        credentials,
        generator,
        readiness,
    })
}

/// Store with one account ("acct-1", "alice") and its key.
pub async fn store_with_key() -> (Arc<CountingStore>, String) {
    let store = Arc::new(CountingStore::default());
    store.inner.add_account("acct-1", "alice").await;
    let credential = store.inner.issue("acct-1").await.unwrap();
    (store, credential.key)
}

pub fn post_json(uri: &str, api_key: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn send(app: Router, req: Request<Body>) -> (u16, serde_json::Value) {
    let resp: Response<Body> = app.oneshot(req).await.expect("request");
    let status = resp.status().as_u16();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON")
    };
    (status, json)
}

pub async fn usage_of(store: &CountingStore) -> i64 {
    store
        .inner
        .find("acct-1")
        .await
        .unwrap()
        .map(|c| c.usage_count)
        .unwrap_or_default()
}
