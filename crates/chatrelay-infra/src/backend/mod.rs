//! HTTP generation backend client.

mod client;
mod retry;
mod streaming;
mod types;

pub use client::HttpGenerationClient;
