//! # hub_core
//!
//! Core domain logic for Service Hub: accounts and sessions, per-account API
//! keys, the language-model client, and the text task registry.

pub mod auth;
pub mod credentials;
pub mod db;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod tasks;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
