//! In-memory store backend

use async_trait::async_trait;
use dashmap::DashMap;
use mongodb::bson::Document;

use crate::Result;

use super::DocumentStore;

/// Collections held in process memory
pub struct MemoryStore {
    database: String,
    collections: DashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: DashMap::new(),
        }
    }

    /// Append documents to a collection, creating it if needed
    pub fn insert_many(&self, collection: &str, documents: impl IntoIterator<Item = Document>) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.value().clone())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn database_name(&self) -> &str {
        &self.database
    }
}
