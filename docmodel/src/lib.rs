//! Named document database connections with a uniform model layer.
//!
//! This crate is the primary entry point of the docmodel project. It re-exports the
//! core types and gives access to the storage backends.
//!
//! A [`ConnectionRegistry`](connection::ConnectionRegistry) owns named connections,
//! each opened once through a [`StoreConnector`](backend::StoreConnector). A
//! [`Model`](model::Model) is bound to one database name and one collection and offers
//! CRUD, existence checks, paged listing with search and date ranges, and named
//! extensions. The model maintains `id`, `createdDate` and `updatedDate` on the
//! documents it writes.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use docmodel::{prelude::*, memory::InMemoryConnector};
//! use docmodel::bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let registry = Arc::new(ConnectionRegistry::new(InMemoryConnector::new()));
//!     registry
//!         .create_connection(ConnectionConfig::new("memory://"), NoEvents)
//!         .await;
//!
//!     let users = Model::builder(registry.clone(), "users")
//!         .schema(Schema::new().field("email", FieldDef::new(FieldType::String).unique()))
//!         .build()
//!         .await?;
//!     users.sync_indexes().await?;
//!
//!     let alice = users.create(doc! { "name": "Alice", "email": "alice@example.com" }).await?;
//!     users
//!         .update_by_id(alice.get_str("id").unwrap_or_default(), doc! { "name": "Alicia" })
//!         .await?;
//!
//!     let page = users
//!         .find_listable(
//!             &ListQuery::new()
//!                 .take(20)
//!                 .search(Search::new(vec!["name", "email"], "ali"))
//!                 .sort(ListSort::new("createdDate", SortOrder::Desc)),
//!         )
//!         .await?;
//!     println!("{page:?}");
//!
//!     registry.teardown().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires the `mongodb` feature)

pub mod prelude;

pub use docmodel_core::{backend, connection, document, error, listing, model, query, schema, text, update};

// Re-export BSON types for convenience
pub use bson;

// Needed to implement `ModelExtension`
pub use async_trait::async_trait;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryConnector, InMemoryStore};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDbConnector, MongoDbStore, query::MongoQueryTranslator};
}
