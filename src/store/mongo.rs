//! MongoDB store backend

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::{Client, Database};

use crate::config::{MongoSection, DATABASE_NAME};
use crate::Result;

use super::DocumentStore;

/// Credentials are checked against this database.
const AUTH_SOURCE: &str = "admin";

/// MongoDB-backed store
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Build a client for the configured server.
    ///
    /// The driver connects lazily; use [`DocumentStore::ping`] to verify.
    pub fn connect(config: &MongoSection) -> Result<Self> {
        let client = Client::with_options(client_options(config))?;
        let database = client.database(DATABASE_NAME);

        Ok(Self { client, database })
    }
}

fn client_options(config: &MongoSection) -> ClientOptions {
    let mut options = ClientOptions::default();
    options.hosts = vec![ServerAddress::Tcp {
        host: config.host.clone(),
        port: Some(config.port),
    }];
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
    options.connect_timeout = Some(config.connect_timeout());
    options.server_selection_timeout = Some(config.connect_timeout());

    if let Some(username) = &config.username {
        let mut credential = Credential::default();
        credential.username = Some(username.clone());
        credential.password = config.password.clone();
        credential.source = Some(AUTH_SOURCE.to_string());
        options.credential = Some(credential);
    }

    options
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>> {
        let cursor = self
            .database
            .collection::<Document>(collection)
            .find(None, None)
            .await?;

        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    fn database_name(&self) -> &str {
        self.database.name()
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
    }
}
