//! Application state wiring the relay pipeline together.
//!
//! The relay service is generic over its port traits; AppState pins it to
//! the concrete infra implementations (SQLite store, HTTP generation
//! client) and the in-process connection registry.

use std::path::PathBuf;
use std::sync::Arc;

use chatrelay_core::relay::{RelayService, TurnGate};
use chatrelay_infra::backend::HttpGenerationClient;
use chatrelay_infra::config::{data_dir, load_relay_config};
use chatrelay_infra::sqlite::{DatabasePool, SqliteSessionStore};

use crate::registry::ConnectionRegistry;

/// The relay service pinned to its production implementations. The
/// registry serves as both delivery channel and connection directory.
pub type ConcreteRelayService =
    RelayService<SqliteSessionStore, HttpGenerationClient, ConnectionRegistry, ConnectionRegistry>;

/// Shared application state for the WebSocket transport.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ConcreteRelayService>,
    pub registry: Arc<ConnectionRegistry>,
    pub gate: Arc<TurnGate>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, open the database,
    /// connect the generation backend, wire the relay service.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_relay_config(&data_dir).await;

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("chatrelay.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;
        let store = Arc::new(SqliteSessionStore::new(db_pool.clone()));

        let backend = Arc::new(HttpGenerationClient::connect(config.backend.clone()).await?);

        let registry = Arc::new(ConnectionRegistry::new());
        let relay = Arc::new(RelayService::new(
            &config,
            store,
            backend,
            registry.clone(),
            registry.clone(),
        ));
        let gate = relay.gate();

        Ok(Self {
            relay,
            registry,
            gate,
            data_dir,
            db_pool,
        })
    }
}
