//! SQLite persistence for chatrelay.

mod pool;
mod session;

pub use pool::DatabasePool;
pub use session::SqliteSessionStore;
