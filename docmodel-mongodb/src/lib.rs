//! MongoDB backend implementation for docmodel.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait and
//! a `StoreConnector` that opens one client per registered connection.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmodel = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The connector reads the connection string, database name, credentials and connect
//! timeout from the `ConnectionConfig` and pings the server before the connection is
//! reported open.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docmodel::{connection::*, mongodb::MongoDbConnector};
//!
//! let registry = Arc::new(ConnectionRegistry::new(MongoDbConnector::new()));
//! registry
//!     .create_connection(
//!         ConnectionConfig::new("mongodb://localhost:27017").with_db_name("shop"),
//!         NoEvents,
//!     )
//!     .await;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_mongodb;

pub mod query;
pub mod store;

pub use store::{MongoDbConnector, MongoDbStore};
