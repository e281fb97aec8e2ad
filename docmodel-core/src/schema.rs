//! Advisory field declarations for a model.
//!
//! A [`Schema`] names the fields a collection is expected to hold and their primitive
//! kind. It is never checked against inserted or updated data; the only behavior it
//! drives is index creation via [`Model::sync_indexes`](crate::model::Model::sync_indexes).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Primitive kind of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
}

/// Declaration of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(rename = "type")]
    pub kind: FieldType,
    /// Create a (non-unique) index on this field.
    #[serde(default)]
    pub index: bool,
    /// Create a unique index on this field.
    #[serde(default)]
    pub unique: bool,
}

impl FieldDef {
    pub fn new(kind: FieldType) -> Self {
        Self { kind, index: false, unique: false }
    }

    pub fn indexed(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

impl From<FieldType> for FieldDef {
    fn from(kind: FieldType) -> Self {
        FieldDef::new(kind)
    }
}

/// Field name to declaration map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: BTreeMap<String, FieldDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field declaration.
    pub fn field(mut self, name: impl Into<String>, def: impl Into<FieldDef>) -> Self {
        self.fields.insert(name.into(), def.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields
            .iter()
            .map(|(name, def)| (name.as_str(), def))
    }

    /// Fields that need an index, with their uniqueness flag.
    pub fn indexed_fields(&self) -> impl Iterator<Item = (&str, bool)> {
        self.fields()
            .filter(|(_, def)| def.index || def.unique)
            .map(|(name, def)| (name, def.unique))
    }
}
