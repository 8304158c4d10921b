//! HTTP/WebSocket transport layer.

pub mod handlers;
pub mod router;
