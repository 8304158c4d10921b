//! Shared domain types for chatrelay.
//!
//! This crate contains the types used across the relay pipeline: chat
//! sessions and messages, generation requests and chunks, the client/server
//! wire envelopes, sanitization results, configuration, and error enums.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
pub mod sanitize;
pub mod wire;
