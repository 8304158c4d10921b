//! Infrastructure layer for chatrelay.
//!
//! Contains implementations of the port traits defined in `chatrelay-core`:
//! the SQLite session store and the HTTP generation backend client, plus
//! the configuration loader.

pub mod backend;
pub mod config;
pub mod sqlite;
