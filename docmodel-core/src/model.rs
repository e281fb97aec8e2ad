//! Per-collection CRUD and listing operations.
//!
//! A [`Model`] binds a database name (resolved through the [`ConnectionRegistry`] on
//! every call), a collection name and an advisory [`Schema`]. It maintains three
//! fields on the documents it writes: `id` (generated on create), `createdDate` and
//! `updatedDate`.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! use bson::doc;
//!
//! let users = Model::builder(registry.clone(), "users")
//!     .schema(Schema::new().field("name", FieldType::String))
//!     .build()
//!     .await?;
//!
//! let created = users.create(doc! { "name": "Jo" }).await?;
//! let page = users
//!     .find_listable(&ListQuery::new().search(Search::new("name", "J")))
//!     .await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::debug;

use crate::{
    backend::{StoreBackend, UpdateOutcome},
    connection::{Connection, ConnectionRegistry, DEFAULT_DB_NAME},
    document::{CREATED_DATE_FIELD, ID_FIELD, generate_id, now},
    error::{DocumentStoreError, DocumentStoreResult},
    listing::{ListQuery, SortMode},
    query::{Expr, Filter, Query},
    schema::Schema,
    text::{TextNormalizer, TurkishSearchable},
    update::sanitize_update,
};

/// A named operation attached to a model for needs the generic surface does not cover.
///
/// Extensions are registered on the [`ModelBuilder`] and invoked through
/// [`Model::call_extension`], receiving the model as context.
#[async_trait]
pub trait ModelExtension: Send + Sync {
    async fn call(&self, model: &Model, args: Bson) -> DocumentStoreResult<Bson>;
}

/// CRUD and listing handle for one collection.
///
/// Cheap to clone; clones share the registry, normalizer and extensions.
#[derive(Clone)]
pub struct Model {
    registry: Arc<ConnectionRegistry>,
    db_name: String,
    collection: String,
    schema: Arc<Schema>,
    normalizer: Arc<dyn TextNormalizer>,
    sort_mode: SortMode,
    extensions: Arc<HashMap<String, Arc<dyn ModelExtension>>>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("db_name", &self.db_name)
            .field("collection", &self.collection)
            .field("schema", &self.schema)
            .field("normalizer", &self.normalizer)
            .field("sort_mode", &self.sort_mode)
            .field("extensions", &self.extensions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Model {
    /// Starts building a model for `collection` on the `"default"` database.
    pub fn builder(registry: Arc<ConnectionRegistry>, collection: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(registry, collection.into())
    }

    /// Name of the bound collection.
    pub fn name(&self) -> &str {
        &self.collection
    }

    /// Name of the bound database connection.
    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The live connection this model is bound to, for direct driver access.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::NotConnected`] if the registry has no entry for the database.
    pub async fn connection(&self) -> DocumentStoreResult<Arc<Connection>> {
        self.registry
            .get_connection(&self.db_name)
            .await
            .ok_or_else(|| DocumentStoreError::NotConnected(self.db_name.clone()))
    }

    async fn backend(&self) -> DocumentStoreResult<Arc<dyn StoreBackend>> {
        self.connection().await?.ready().await
    }

    /// Inserts `data` with a generated `id` and `createdDate`, returning the stored document.
    ///
    /// A string `id` supplied by the caller is kept; any other `id` value is replaced.
    pub async fn create(&self, data: Document) -> DocumentStoreResult<Document> {
        let backend = self.backend().await?;
        let mut document = data;

        if !matches!(document.get(ID_FIELD), Some(Bson::String(_))) {
            document.insert(ID_FIELD, generate_id());
        }
        document.insert(CREATED_DATE_FIELD, now());

        backend
            .insert_one(&self.collection, document.clone())
            .await?;
        debug!(collection = %self.collection, id = ?document.get(ID_FIELD), "document created");

        Ok(document)
    }

    pub async fn find_by_id(&self, id: &str) -> DocumentStoreResult<Option<Document>> {
        self.find_by_query(Filter::eq(ID_FIELD, id)).await
    }

    /// Returns the first document whose `field` equals `value`.
    pub async fn find_by_field(
        &self,
        field: &str,
        value: impl Into<Bson>,
    ) -> DocumentStoreResult<Option<Document>> {
        self.find_by_query(Filter::eq(field, value)).await
    }

    /// Returns the first document matching `query`.
    pub async fn find_by_query(&self, query: Expr) -> DocumentStoreResult<Option<Document>> {
        self.backend()
            .await?
            .find_one(&self.collection, Some(query))
            .await
    }

    /// Returns every document matching `query`; `None` lists the whole collection.
    pub async fn list(&self, query: Option<Expr>) -> DocumentStoreResult<Vec<Document>> {
        self.backend()
            .await?
            .find_many(&self.collection, Query::filtered(query))
            .await
    }

    /// Returns one page of documents for a listing request.
    ///
    /// See [`ListQuery`] for how the request becomes a store query. No total count is
    /// computed.
    pub async fn find_listable(&self, list: &ListQuery) -> DocumentStoreResult<Vec<Document>> {
        let query = list.to_query(self.normalizer.as_ref(), self.sort_mode);
        debug!(collection = %self.collection, ?query, "listing");

        self.backend()
            .await?
            .find_many(&self.collection, query)
            .await
    }

    pub async fn is_id_exist(&self, id: &str) -> DocumentStoreResult<bool> {
        self.is_query_exist(Filter::eq(ID_FIELD, id)).await
    }

    pub async fn is_query_exist(&self, query: Expr) -> DocumentStoreResult<bool> {
        self.backend()
            .await?
            .exists(&self.collection, query)
            .await
    }

    /// Deletes the document with the given `id`; returns the number deleted (0 or 1).
    pub async fn delete_by_id(&self, id: &str) -> DocumentStoreResult<u64> {
        let deleted = self
            .backend()
            .await?
            .delete_one(&self.collection, Filter::eq(ID_FIELD, id))
            .await?;
        debug!(collection = %self.collection, id, deleted, "delete by id");

        Ok(deleted)
    }

    /// Deletes every document matching `query`; returns the number deleted.
    ///
    /// An absent or empty query deletes nothing and returns 0.
    pub async fn delete_by_query(&self, query: Option<Expr>) -> DocumentStoreResult<u64> {
        let backend = self.backend().await?;

        let Some(query) = query.filter(|query| !query.is_empty()) else {
            debug!(collection = %self.collection, "delete skipped for empty query");
            return Ok(0);
        };

        let deleted = backend
            .delete_many(&self.collection, query)
            .await?;
        debug!(collection = %self.collection, deleted, "delete by query");

        Ok(deleted)
    }

    /// Applies `data` as a partial update to the document with the given `id`.
    ///
    /// The payload goes through [`sanitize_update`]: `id` and undefined fields are
    /// dropped and `updatedDate` is refreshed.
    pub async fn update_by_id(&self, id: &str, data: Document) -> DocumentStoreResult<UpdateOutcome> {
        let outcome = self
            .backend()
            .await?
            .update_one(&self.collection, Filter::eq(ID_FIELD, id), sanitize_update(data))
            .await?;
        debug!(collection = %self.collection, id, ?outcome, "update by id");

        Ok(outcome)
    }

    /// Applies `data` as a partial update to every document matching `query`.
    ///
    /// An absent or empty query performs no write and reports zero matches.
    pub async fn update_by_query(
        &self,
        query: Option<Expr>,
        data: Document,
    ) -> DocumentStoreResult<UpdateOutcome> {
        let backend = self.backend().await?;

        let Some(query) = query.filter(|query| !query.is_empty()) else {
            debug!(collection = %self.collection, "update skipped for empty query");
            return Ok(UpdateOutcome::default());
        };

        let outcome = backend
            .update_many(&self.collection, query, sanitize_update(data))
            .await?;
        debug!(collection = %self.collection, ?outcome, "update by query");

        Ok(outcome)
    }

    /// Creates the store indexes declared by the schema (`index` or `unique` fields).
    pub async fn sync_indexes(&self) -> DocumentStoreResult<()> {
        let backend = self.backend().await?;

        for (field, unique) in self.schema.indexed_fields() {
            backend
                .create_index(&self.collection, field, unique)
                .await?;
            debug!(collection = %self.collection, field, unique, "index ensured");
        }

        Ok(())
    }

    /// Invokes the extension registered under `name`.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::UnknownExtension`] if no such extension was registered,
    /// otherwise whatever the extension returns.
    pub async fn call_extension(&self, name: &str, args: Bson) -> DocumentStoreResult<Bson> {
        let extension = self
            .extensions
            .get(name)
            .cloned()
            .ok_or_else(|| DocumentStoreError::UnknownExtension(name.to_string()))?;

        extension.call(self, args).await
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }
}

/// Builder for [`Model`].
///
/// Defaults: database `"default"`, empty schema, [`TurkishSearchable`] normalization,
/// [`SortMode::Natural`], no extensions.
pub struct ModelBuilder {
    registry: Arc<ConnectionRegistry>,
    collection: String,
    db_name: String,
    schema: Schema,
    normalizer: Arc<dyn TextNormalizer>,
    sort_mode: SortMode,
    extensions: HashMap<String, Arc<dyn ModelExtension>>,
}

impl ModelBuilder {
    fn new(registry: Arc<ConnectionRegistry>, collection: String) -> Self {
        Self {
            registry,
            collection,
            db_name: DEFAULT_DB_NAME.to_string(),
            schema: Schema::new(),
            normalizer: Arc::new(TurkishSearchable),
            sort_mode: SortMode::default(),
            extensions: HashMap::new(),
        }
    }

    /// Binds the model to the connection registered under `db_name`.
    pub fn database(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Replaces the normalizer applied to search values.
    pub fn normalizer(mut self, normalizer: impl TextNormalizer + 'static) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    pub fn sort_mode(mut self, sort_mode: SortMode) -> Self {
        self.sort_mode = sort_mode;
        self
    }

    /// Registers an extension under `name`, replacing any previous one.
    pub fn extension(mut self, name: impl Into<String>, extension: impl ModelExtension + 'static) -> Self {
        self.extensions.insert(name.into(), Arc::new(extension));
        self
    }

    /// Builds the model.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::NotConnected`] if no connection is registered under the
    /// database name. The connection may still be opening.
    pub async fn build(self) -> DocumentStoreResult<Model> {
        if self.registry.get_connection(&self.db_name).await.is_none() {
            return Err(DocumentStoreError::NotConnected(self.db_name));
        }

        Ok(Model {
            registry: self.registry,
            db_name: self.db_name,
            collection: self.collection,
            schema: Arc::new(self.schema),
            normalizer: self.normalizer,
            sort_mode: self.sort_mode,
            extensions: Arc::new(self.extensions),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::StoreConnector, connection::ConnectionConfig};

    #[derive(Debug)]
    struct OfflineConnector;

    #[async_trait]
    impl StoreConnector for OfflineConnector {
        async fn connect(&self, _config: &ConnectionConfig) -> DocumentStoreResult<Arc<dyn StoreBackend>> {
            Err(DocumentStoreError::Connection("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn build_requires_a_registered_connection() {
        let registry = Arc::new(ConnectionRegistry::new(OfflineConnector));

        let err = Model::builder(registry, "users")
            .database("missing")
            .build()
            .await
            .unwrap_err();

        assert_eq!(err, DocumentStoreError::NotConnected("missing".to_string()));
    }

    #[tokio::test]
    async fn operations_surface_failed_opens() {
        let registry = Arc::new(ConnectionRegistry::new(OfflineConnector));
        registry
            .create_connection(ConnectionConfig::new("offline://"), crate::connection::NoEvents)
            .await;
        let users = Model::builder(registry, "users").build().await.unwrap();

        assert_eq!(
            users.find_by_id("x").await.unwrap_err(),
            DocumentStoreError::Connection("offline".to_string())
        );
        assert_eq!(
            users.call_extension("nope", Bson::Null).await.unwrap_err(),
            DocumentStoreError::UnknownExtension("nope".to_string())
        );
    }
}
