use async_trait::async_trait;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection, Database, IndexModel,
    options::{ClientOptions, Credential, FindOptions, IndexOptions},
};
use std::{any::Any, sync::Arc};
use tracing::{debug, info};

use docmodel_core::{
    backend::{StoreBackend, StoreConnector, UpdateOutcome},
    connection::ConnectionConfig,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query},
};

use crate::query::MongoQueryTranslator;

/// A MongoDB session bound to one database.
///
/// Clones share the underlying client and its connection pool.
#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self { client, database: database.into() }
    }

    /// The driver client, for operations the model layer does not cover.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The driver handle for the bound database.
    pub fn database(&self) -> Database {
        self.client.database(&self.database)
    }

    /// The driver handle for `name` in the bound database.
    pub fn collection(&self, name: &str) -> MongoCollection<Document> {
        self.database().collection(name)
    }

    /// Drops the store-generated `_id`; documents are identified by their `id` field.
    fn restore_document(mut document: Document) -> Document {
        document.remove("_id");
        document
    }

    fn find_options(query: &Query) -> DocumentStoreResult<FindOptions> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(
                u64::try_from(skip)
                    .map_err(|_| DocumentStoreError::Store(format!("skip value must be non-negative, got {skip}")))?,
            );
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(doc! { sort.field.clone(): sort.direction.code() });
        }

        Ok(options)
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<()> {
        self.collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| DocumentStoreError::Store(e.to_string()))?;

        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: Option<Expr>) -> DocumentStoreResult<Option<Document>> {
        Ok(self
            .collection(collection)
            .find_one(MongoQueryTranslator::translate(filter.as_ref())?)
            .await
            .map_err(|e| DocumentStoreError::Store(e.to_string()))?
            .map(Self::restore_document))
    }

    async fn find_many(&self, collection: &str, query: Query) -> DocumentStoreResult<Vec<Document>> {
        Ok(self
            .collection(collection)
            .find(MongoQueryTranslator::translate(query.filter.as_ref())?)
            .with_options(Self::find_options(&query)?)
            .await
            .map_err(|e| DocumentStoreError::Store(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| DocumentStoreError::Store(e.to_string()))?
            .into_iter()
            .map(Self::restore_document)
            .collect())
    }

    async fn update_one(&self, collection: &str, filter: Expr, set: Document) -> DocumentStoreResult<UpdateOutcome> {
        let result = self
            .collection(collection)
            .update_one(MongoQueryTranslator::translate(Some(&filter))?, doc! { "$set": set })
            .await
            .map_err(|e| DocumentStoreError::Store(e.to_string()))?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn update_many(&self, collection: &str, filter: Expr, set: Document) -> DocumentStoreResult<UpdateOutcome> {
        let result = self
            .collection(collection)
            .update_many(MongoQueryTranslator::translate(Some(&filter))?, doc! { "$set": set })
            .await
            .map_err(|e| DocumentStoreError::Store(e.to_string()))?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, collection: &str, filter: Expr) -> DocumentStoreResult<u64> {
        Ok(self
            .collection(collection)
            .delete_one(MongoQueryTranslator::translate(Some(&filter))?)
            .await
            .map_err(|e| DocumentStoreError::Store(e.to_string()))?
            .deleted_count)
    }

    async fn delete_many(&self, collection: &str, filter: Expr) -> DocumentStoreResult<u64> {
        Ok(self
            .collection(collection)
            .delete_many(MongoQueryTranslator::translate(Some(&filter))?)
            .await
            .map_err(|e| DocumentStoreError::Store(e.to_string()))?
            .deleted_count)
    }

    async fn exists(&self, collection: &str, filter: Expr) -> DocumentStoreResult<bool> {
        Ok(self
            .collection(collection)
            .find_one(MongoQueryTranslator::translate(Some(&filter))?)
            .projection(doc! { "_id": 1 })
            .await
            .map_err(|e| DocumentStoreError::Store(e.to_string()))?
            .is_some())
    }

    async fn create_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        self.collection(collection)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { field: 1 })
                    .options(
                        IndexOptions::builder()
                            .unique(unique)
                            .build()
                    )
                    .build()
            )
            .await
            .map_err(|e| DocumentStoreError::Store(e.to_string()))?;

        Ok(())
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.client.clone().shutdown().await;
        debug!(database = %self.database, "mongodb client shut down");

        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Opens MongoDB sessions for a [`ConnectionRegistry`](docmodel_core::connection::ConnectionRegistry).
///
/// The registry name doubles as the database name. Explicit credentials override any
/// in the connection string, and the connect timeout also bounds server selection so a
/// dead server fails the open instead of stalling it. The driver has no per-socket
/// read timeout, so `socket_timeout_ms` caps how long a pooled connection may sit idle.
#[derive(Debug, Default, Clone)]
pub struct MongoDbConnector;

impl MongoDbConnector {
    pub fn new() -> Self {
        Self
    }

    async fn client_options(config: &ConnectionConfig) -> DocumentStoreResult<ClientOptions> {
        let mut options = ClientOptions::parse(&config.connection_string)
            .await
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;

        if config.user.is_some() || config.pass.is_some() {
            let credential = options.credential.get_or_insert_with(Credential::default);
            credential.username = config.user.clone();
            credential.password = config.pass.clone();
        }
        options.connect_timeout = Some(config.connect_timeout());
        options.server_selection_timeout = Some(config.connect_timeout());
        options.max_idle_time = Some(config.socket_timeout());

        Ok(options)
    }
}

#[async_trait]
impl StoreConnector for MongoDbConnector {
    async fn connect(&self, config: &ConnectionConfig) -> DocumentStoreResult<Arc<dyn StoreBackend>> {
        let client = Client::with_options(Self::client_options(config).await?)
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;
        let store = MongoDbStore::new(client, config.db_name.clone());

        store
            .database()
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;
        info!(database = %config.db_name, "mongodb server reachable");

        Ok(Arc::new(store))
    }
}
