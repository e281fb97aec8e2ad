//! Preparation of partial-update payloads.

use bson::{Bson, Document};

use crate::document::{ID_FIELD, UPDATED_DATE_FIELD, now};

/// Builds the `$set` document for an update.
///
/// Keeps every field of `data` except the identity field and fields holding
/// [`Bson::Undefined`], then stamps `updatedDate`. Dropping an undefined field leaves
/// the stored value untouched; `Bson::Null` is kept and clears it.
pub fn sanitize_update(data: Document) -> Document {
    let mut set = Document::new();
    set.insert(UPDATED_DATE_FIELD, now());

    for (key, value) in data {
        if key == ID_FIELD || matches!(value, Bson::Undefined) {
            continue;
        }
        set.insert(key, value);
    }

    set
}
