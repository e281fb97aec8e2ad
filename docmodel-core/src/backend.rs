//! Driver abstraction for document stores.
//!
//! [`StoreBackend`] is the narrow surface a model needs from a document store:
//! single and bulk reads, `$set`-style partial updates, deletes, existence checks and
//! index creation. [`StoreConnector`] opens a backend for a [`ConnectionConfig`]; the
//! [`ConnectionRegistry`](crate::connection::ConnectionRegistry) owns one connector and
//! calls it once per database name.
//!
//! # Thread Safety
//!
//! Backends are shared behind `Arc<dyn StoreBackend>` and must support concurrent use
//! from multiple tasks.

use async_trait::async_trait;
use bson::Document;
use std::{any::Any, fmt::Debug, sync::Arc};

use crate::{
    connection::ConnectionConfig,
    error::DocumentStoreResult,
    query::{Expr, Query},
};

/// Result of a partial update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Number of documents matched by the predicate.
    pub matched: u64,
    /// Number of documents actually changed.
    pub modified: u64,
}

/// Abstract interface for document store drivers.
///
/// All methods take the collection name explicitly; collections are created
/// implicitly on first insert. Filters are `Option<Expr>` where `None` matches every
/// document. Errors from the driver surface as
/// [`DocumentStoreError::Store`](crate::error::DocumentStoreError::Store).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts one document.
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<()>;

    /// Returns the first document matching `filter`, in natural order.
    async fn find_one(
        &self,
        collection: &str,
        filter: Option<Expr>,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Returns every document matching the query after applying sort, offset and limit
    /// (in that order).
    async fn find_many(&self, collection: &str, query: Query) -> DocumentStoreResult<Vec<Document>>;

    /// Sets the fields of `set` on the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: Expr,
        set: Document,
    ) -> DocumentStoreResult<UpdateOutcome>;

    /// Sets the fields of `set` on every document matching `filter`.
    async fn update_many(
        &self,
        collection: &str,
        filter: Expr,
        set: Document,
    ) -> DocumentStoreResult<UpdateOutcome>;

    /// Deletes the first document matching `filter`; returns the number deleted.
    async fn delete_one(&self, collection: &str, filter: Expr) -> DocumentStoreResult<u64>;

    /// Deletes every document matching `filter`; returns the number deleted.
    async fn delete_many(&self, collection: &str, filter: Expr) -> DocumentStoreResult<u64>;

    /// Returns whether at least one document matches `filter`.
    async fn exists(&self, collection: &str, filter: Expr) -> DocumentStoreResult<bool>;

    /// Creates an ascending single-field index.
    async fn create_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()>;

    /// Releases driver resources. The default implementation is a no-op.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }

    /// Access to the concrete driver type, see
    /// [`Connection::backend_as`](crate::connection::Connection::backend_as).
    fn as_any(&self) -> &dyn Any;
}

/// Opens backends from connection settings.
#[async_trait]
pub trait StoreConnector: Send + Sync + Debug {
    /// Opens a session for `config`. Called at most once per registered database name.
    async fn connect(&self, config: &ConnectionConfig) -> DocumentStoreResult<Arc<dyn StoreBackend>>;
}
