use thiserror::Error;

/// Errors from session store operations (used by the trait definitions in
/// chatrelay-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("session not found")]
    NotFound,
}

/// Errors from pushing a message to a remote connection.
///
/// `EndpointGone` is terminal and non-retriable for that delivery attempt:
/// the remote connection no longer exists and there is no one to surface
/// the failure to. Any other transport fault is `Transport`.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("remote endpoint gone")]
    EndpointGone,

    #[error("transport error: {0}")]
    Transport(String),
}
