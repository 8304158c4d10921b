//! Relay pipeline logic and port trait definitions for chatrelay.
//!
//! This crate defines the "ports" (session store, generation backend,
//! delivery channel, connection directory) that the infrastructure and
//! transport layers implement, plus the pure pipeline stages: input
//! sanitization, prompt assembly, and the per-turn relay orchestrator.
//! It depends only on `chatrelay-types` -- never on `chatrelay-infra`
//! or any database/IO crate.

pub mod connection;
pub mod delivery;
pub mod generation;
pub mod prompt;
pub mod relay;
pub mod sanitize;
pub mod session;
