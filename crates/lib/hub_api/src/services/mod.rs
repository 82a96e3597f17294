//! Session flows and cookie helpers used by the handlers.

pub mod auth;
pub mod cookies;
