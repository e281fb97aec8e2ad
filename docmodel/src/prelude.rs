//! Convenient re-exports of commonly used types from docmodel.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```

pub use docmodel_core::{
    backend::{StoreBackend, StoreConnector, UpdateOutcome},
    connection::{
        Connection, ConnectionConfig, ConnectionEvents, ConnectionRegistry, ConnectionState, NoEvents,
    },
    document::{from_document, generate_id, to_document},
    error::{DocumentStoreError, DocumentStoreResult},
    listing::{DateFilter, ListQuery, ListSort, Search, SearchFields, SortMode, SortOrder},
    model::{Model, ModelBuilder, ModelExtension},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    schema::{FieldDef, FieldType, Schema},
    text::{PlainText, TextNormalizer, TurkishSearchable},
    update::sanitize_update,
};
