//! In-memory document storage backend for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend`
//! trait together with a `StoreConnector` that hands out fresh stores. It matches
//! documents with the same rules as the MongoDB backend, which makes it the backend of
//! choice for tests and local development.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use docmodel_core::{connection::*, model::Model};
//! use docmodel_memory::InMemoryConnector;
//! use bson::doc;
//!
//! let registry = Arc::new(ConnectionRegistry::new(Arc::new(InMemoryConnector::new())));
//! registry.create_connection(ConnectionConfig::new("memory://"), NoEvents).await;
//!
//! let users = Model::builder(registry.clone(), "users").build().await?;
//! let alice = users.create(doc! { "name": "Alice" }).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

mod evaluator;
pub mod store;

pub use store::{InMemoryConnector, InMemoryStore};
