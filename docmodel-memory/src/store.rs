//! In-memory storage implementation for document stores.
//!
//! Collections are vectors of BSON documents kept in insertion order behind an
//! async-aware read-write lock, so unsorted reads return documents in natural
//! (insertion) order like a freshly written MongoDB collection.

use async_trait::async_trait;
use bson::Document;
use mea::rwlock::RwLock;
use std::{any::Any, collections::HashMap, sync::Arc};
use tracing::debug;

use docmodel_core::{
    backend::{StoreBackend, StoreConnector, UpdateOutcome},
    connection::ConnectionConfig,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup};

type StoreMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory document store.
///
/// Clones share the same data. Unique indexes are enforced on insert and update;
/// plain indexes are accepted and ignored.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::InMemoryStore;
/// use docmodel_core::{backend::StoreBackend, query::Filter};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.insert_one("users", doc! { "id": "1", "name": "Alice" }).await?;
/// let found = store.find_one("users", Some(Filter::eq("id", "1"))).await?;
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
    /// collection name -> fields with a unique index
    unique: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    fn matching_positions(
        documents: &[Document],
        filter: Option<&Expr>,
        first_only: bool,
    ) -> DocumentStoreResult<Vec<usize>> {
        let Some(filter) = filter else {
            let all = if first_only { documents.len().min(1) } else { documents.len() };
            return Ok((0..all).collect());
        };

        let mut evaluator = DocumentEvaluator::new();
        let mut positions = Vec::new();

        for (position, document) in documents.iter().enumerate() {
            if evaluator.matches(document, filter)? {
                positions.push(position);
                if first_only {
                    break;
                }
            }
        }

        Ok(positions)
    }

    fn check_unique(
        documents: &[Document],
        unique_fields: &[String],
        candidate: &Document,
        skip: Option<usize>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        for field in unique_fields {
            let Some(value) = lookup(candidate, field) else {
                continue;
            };

            let duplicate = documents
                .iter()
                .enumerate()
                .filter(|(position, _)| Some(*position) != skip)
                .any(|(_, other)| lookup(other, field).is_some_and(|existing| existing == value));

            if duplicate {
                return Err(DocumentStoreError::Store(format!(
                    "duplicate key in {collection}: {field} = {value}"
                )));
            }
        }

        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        filter: Expr,
        set: Document,
        first_only: bool,
    ) -> DocumentStoreResult<UpdateOutcome> {
        let unique = self.unique.read().await;
        let unique_fields = unique
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };

        let positions = Self::matching_positions(documents, Some(&filter), first_only)?;
        let mut outcome = UpdateOutcome { matched: positions.len() as u64, modified: 0 };

        for position in positions {
            let mut updated = documents[position].clone();
            for (key, value) in set.iter() {
                updated.insert(key.clone(), value.clone());
            }

            if updated != documents[position] {
                Self::check_unique(documents, unique_fields, &updated, Some(position), collection)?;
                documents[position] = updated;
                outcome.modified += 1;
            }
        }

        Ok(outcome)
    }

    async fn delete(&self, collection: &str, filter: Expr, first_only: bool) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(collection) else {
            return Ok(0);
        };

        let positions = Self::matching_positions(documents, Some(&filter), first_only)?;
        for position in positions.iter().rev() {
            documents.remove(*position);
        }

        Ok(positions.len() as u64)
    }
}

/// Applies `skip` then `limit` with MongoDB semantics: a zero limit means no limit, a
/// negative limit is taken by absolute value and a negative skip is an error.
fn paginate(documents: Vec<Document>, offset: Option<i64>, limit: Option<i64>) -> DocumentStoreResult<Vec<Document>> {
    let skip = match offset.unwrap_or(0) {
        skip if skip < 0 => {
            return Err(DocumentStoreError::Store(format!("skip value must be non-negative, got {skip}")));
        }
        skip => skip as usize,
    };
    let take = match limit.unwrap_or(0) {
        0 => usize::MAX,
        limit => limit.unsigned_abs() as usize,
    };

    Ok(documents
        .into_iter()
        .skip(skip)
        .take(take)
        .collect())
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<()> {
        let unique = self.unique.read().await;
        let mut store = self.store.write().await;
        let documents = store
            .entry(collection.to_string())
            .or_default();

        if let Some(fields) = unique.get(collection) {
            Self::check_unique(documents, fields, &document, None, collection)?;
        }
        documents.push(document);

        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: Option<Expr>) -> DocumentStoreResult<Option<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(None);
        };

        Ok(Self::matching_positions(documents, filter.as_ref(), true)?
            .first()
            .map(|position| documents[*position].clone()))
    }

    async fn find_many(&self, collection: &str, query: Query) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut found = Self::matching_positions(documents, query.filter.as_ref(), false)?
            .into_iter()
            .map(|position| documents[position].clone())
            .collect::<Vec<_>>();

        if let Some(sort) = &query.sort {
            // Stable, so ties keep natural order.
            found.sort_by(|a, b| {
                let left = lookup(a, &sort.field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);
                let right = lookup(b, &sort.field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);

                match sort.direction {
                    SortDirection::Asc => left.sort_cmp(&right),
                    SortDirection::Desc => right.sort_cmp(&left),
                }
            });
        }

        paginate(found, query.offset, query.limit)
    }

    async fn update_one(&self, collection: &str, filter: Expr, set: Document) -> DocumentStoreResult<UpdateOutcome> {
        self.update(collection, filter, set, true).await
    }

    async fn update_many(&self, collection: &str, filter: Expr, set: Document) -> DocumentStoreResult<UpdateOutcome> {
        self.update(collection, filter, set, false).await
    }

    async fn delete_one(&self, collection: &str, filter: Expr) -> DocumentStoreResult<u64> {
        self.delete(collection, filter, true).await
    }

    async fn delete_many(&self, collection: &str, filter: Expr) -> DocumentStoreResult<u64> {
        self.delete(collection, filter, false).await
    }

    async fn exists(&self, collection: &str, filter: Expr) -> DocumentStoreResult<bool> {
        let store = self.store.read().await;

        match store.get(collection) {
            Some(documents) => Ok(!Self::matching_positions(documents, Some(&filter), true)?.is_empty()),
            None => Ok(false),
        }
    }

    async fn create_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        if !unique {
            // Plain indexes only speed up lookups; nothing to do in memory.
            return Ok(());
        }

        let mut indexes = self.unique.write().await;
        let fields = indexes
            .entry(collection.to_string())
            .or_default();

        if !fields.iter().any(|existing| existing == field) {
            fields.push(field.to_string());
        }

        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Opens in-memory stores.
///
/// The connection string is ignored. Every successful open yields a fresh empty store, so
/// separate registries (e.g. one per test) never share data.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConnector;

impl InMemoryConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    async fn connect(&self, config: &ConnectionConfig) -> DocumentStoreResult<Arc<dyn StoreBackend>> {
        debug!(db_name = %config.db_name, "opening in-memory store");

        Ok(Arc::new(InMemoryStore::new()))
    }
}
