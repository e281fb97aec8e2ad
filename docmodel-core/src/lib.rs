//! Core of the docmodel project: named document database connections and a uniform
//! model layer on top of them.
//!
//! - **Connections** ([`connection`]) - Registry of named, lazily opened connections
//! - **Models** ([`model`]) - Per-collection CRUD, existence checks and extensions
//! - **Listings** ([`listing`]) - Paging, multi-field search, sort and date-range filters
//! - **Queries** ([`query`]) - Backend-neutral predicate AST and visitor
//! - **Backends** ([`backend`]) - Traits implemented by store drivers
//! - **Updates** ([`update`]) - Partial update payload preparation
//! - **Text** ([`text`]) - Search value normalization
//! - **Schema** ([`schema`]) - Advisory field declarations
//! - **Documents** ([`document`]) - Maintained field names, ids and serde helpers
//! - **Errors** ([`error`])
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docmodel_core::{connection::*, model::Model, listing::*};
//!
//! let registry = Arc::new(ConnectionRegistry::new(connector));
//! registry
//!     .create_connection(ConnectionConfig::new("mongodb://localhost:27017"), NoEvents)
//!     .await;
//!
//! let users = Model::builder(registry.clone(), "users").build().await?;
//! let page = users
//!     .find_listable(&ListQuery::new().take(20).sort(ListSort::new("createdDate", SortOrder::Desc)))
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod backend;
pub mod connection;
pub mod document;
pub mod error;
pub mod listing;
pub mod model;
pub mod query;
pub mod schema;
pub mod text;
pub mod update;
