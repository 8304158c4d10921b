//! Observability utilities for chatrelay.
//!
//! Tracing subscriber setup (structured logging plus optional OpenTelemetry
//! export) and GenAI semantic-convention attribute constants used on
//! generation spans.

pub mod genai_attrs;
pub mod tracing_setup;
