//! Request handlers.

pub mod ws;
