//! Field names maintained by models, identity generation and serde helpers.

use bson::{Bson, DateTime, Document, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// The generated identity field. Distinct from the store's native `_id`.
pub const ID_FIELD: &str = "id";
/// Stamped by `create`.
pub const CREATED_DATE_FIELD: &str = "createdDate";
/// Stamped by every update.
pub const UPDATED_DATE_FIELD: &str = "updatedDate";

/// Returns a new globally unique identity (24 hex characters).
pub fn generate_id() -> String {
    ObjectId::new().to_hex()
}

/// Current time as a BSON date.
pub fn now() -> DateTime {
    DateTime::from_chrono(chrono::Utc::now())
}

/// Serializes a struct into a document for `create` or an update payload.
///
/// # Errors
///
/// Fails if the value does not serialize to a BSON document.
pub fn to_document<T: Serialize>(value: &T) -> DocumentStoreResult<Document> {
    match serialize_to_bson(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// Deserializes a stored document into a struct.
pub fn from_document<T: DeserializeOwned>(document: Document) -> DocumentStoreResult<T> {
    Ok(deserialize_from_bson(Bson::Document(document))?)
}
