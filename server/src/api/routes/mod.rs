//! API route handlers

pub mod api_keys;
pub mod auth;
pub mod health;
pub mod organizations;
pub mod prompts;
pub mod scenarios;
pub mod simulate;
pub mod variables;
