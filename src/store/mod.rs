//! Document store abstraction and connection lifecycle
//!
//! The server holds at most one store connection. It is opened once before
//! the listener starts and closed once after the server has drained.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::Document;

use crate::config::{MongoSection, StoreBackendKind, DATABASE_NAME};
use crate::Result;

pub mod memory;
pub mod mongo;

/// Read access to a logical database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in `collection`, in the store's natural order.
    ///
    /// A collection that does not exist yields no documents.
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>>;

    /// Round-trip to the server
    async fn ping(&self) -> Result<()>;

    /// Name of the logical database this handle targets
    fn database_name(&self) -> &str;

    /// Release driver resources. Called once at shutdown.
    async fn shutdown(&self) {}
}

/// Owner of the process-wide store handle
pub struct StoreConnection {
    store: Option<Arc<dyn DocumentStore>>,
}

impl StoreConnection {
    /// Open the configured store.
    ///
    /// Never fails: any error is logged and yields a disconnected instance,
    /// leaving store-backed routes in degraded mode.
    pub async fn open(config: &MongoSection) -> Self {
        let store: Arc<dyn DocumentStore> = match config.backend {
            StoreBackendKind::Memory => {
                tracing::info!(database = DATABASE_NAME, "Using in-memory document store");
                Arc::new(memory::MemoryStore::new(DATABASE_NAME))
            }
            StoreBackendKind::Mongodb => match mongo::MongoStore::connect(config) {
                Ok(store) => Arc::new(store),
                Err(err) => {
                    tracing::error!(error = %err, host = %config.host, "MongoDB connection error");
                    return Self::disconnected();
                }
            },
        };

        if config.verify_on_startup {
            if let Err(err) = store.ping().await {
                tracing::error!(error = %err, host = %config.host, "MongoDB connection error");
                store.shutdown().await;
                return Self::disconnected();
            }
        }

        tracing::info!(
            database = store.database_name(),
            host = %config.host,
            port = config.port,
            "MongoDB connection successful"
        );

        Self { store: Some(store) }
    }

    /// A connection that never came up
    pub fn disconnected() -> Self {
        Self { store: None }
    }

    /// Wrap an already constructed store
    pub fn from_store(store: Arc<dyn DocumentStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Lend the live handle, if any
    pub fn handle(&self) -> Option<Arc<dyn DocumentStore>> {
        self.store.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    /// Release the handle. A second call is a no-op.
    pub async fn close(&mut self) {
        if let Some(store) = self.store.take() {
            store.shutdown().await;
            tracing::info!(database = store.database_name(), "MongoDB connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_opens_connected() {
        let config = MongoSection {
            backend: StoreBackendKind::Memory,
            ..Default::default()
        };

        let mut connection = StoreConnection::open(&config).await;
        assert!(connection.is_connected());
        assert_eq!(
            connection.handle().unwrap().database_name(),
            DATABASE_NAME
        );

        connection.close().await;
        assert!(!connection.is_connected());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut connection = StoreConnection::disconnected();
        connection.close().await;
        connection.close().await;
        assert!(connection.handle().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_mongo_degrades() {
        let config = MongoSection {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_ms: 200,
            ..Default::default()
        };

        let connection = StoreConnection::open(&config).await;
        assert!(!connection.is_connected());
    }
}
