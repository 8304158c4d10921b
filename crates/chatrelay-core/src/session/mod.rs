//! Session store port and the in-memory implementation.

mod memory;
mod store;

pub use memory::InMemorySessionStore;
pub use store::SessionStore;
