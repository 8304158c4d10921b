//! Connection directory port.

/// Metadata the transport layer holds for one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub connection_id: String,
    /// Authenticated user, when the transport resolved one.
    pub user_id: Option<String>,
    /// Client-declared display name, if any.
    pub display_name: Option<String>,
}

/// Lookup of live connection metadata.
///
/// Synchronous: the production registry is an in-process map. A missing
/// record is not an error; the relay treats the connection as anonymous.
pub trait ConnectionDirectory: Send + Sync {
    fn lookup(&self, connection_id: &str) -> Option<ConnectionRecord>;
}
