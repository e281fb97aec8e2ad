//! Query expression evaluation for in-memory document filtering.
//!
//! Mirrors the MongoDB matching rules the model layer relies on: dotted paths reach
//! into sub-documents, equality against an array field matches any element, a
//! missing field equals `null`, and values of different kinds never compare as
//! greater or smaller.

use bson::{Bson, Document, datetime::DateTime};
use regex::Regex;
use std::{cmp::Ordering, collections::HashMap};

use docmodel_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Comparable view of a BSON value. Integers stay exact; only comparisons against a
/// double go through `f64`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Integer(i64),
    Number(f64),
    String(&'a str),
    Document(&'a Document),
    Array(&'a [Bson]),
    Bool(bool),
    DateTime(DateTime),
    /// Any other BSON type; compared by its debug form only for equality.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Int32(value) => Comparable::Integer(i64::from(*value)),
            Bson::Int64(value) => Comparable::Integer(*value),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Document(doc) => Comparable::Document(doc),
            Bson::Array(arr) => Comparable::Array(arr),
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position in the cross-type sort order (null, numbers, strings, documents,
    /// arrays, booleans, dates).
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Integer(_) | Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Document(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Bool(_) => 5,
            Comparable::DateTime(_) => 6,
            Comparable::Other(_) => 7,
        }
    }

    /// Ordering between values of the same kind; `None` across kinds.
    fn same_kind_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Integer(a), Comparable::Integer(b)) => Some(a.cmp(b)),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::Integer(a), Comparable::Number(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Number(a), Comparable::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::String(a), Comparable::String(b)) => Some(a.cmp(b)),
            (Comparable::Bool(a), Comparable::Bool(b)) => Some(a.cmp(b)),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => Some(a.cmp(b)),
            (Comparable::Document(a), Comparable::Document(b)) if a == b => Some(Ordering::Equal),
            (Comparable::Array(a), Comparable::Array(b)) if a == b => Some(Ordering::Equal),
            (Comparable::Other(a), Comparable::Other(b)) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Total order used for sorting.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.same_kind_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.same_kind_cmp(other) == Some(Ordering::Equal)
    }
}

/// Resolves a possibly dotted field path.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Evaluates expressions against documents, caching compiled patterns between them.
#[derive(Default)]
pub(crate) struct DocumentEvaluator<'a> {
    document: Option<&'a Document>,
    patterns: HashMap<String, Regex>,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `document` satisfies `expr`.
    pub fn matches(&mut self, document: &'a Document, expr: &Expr) -> DocumentStoreResult<bool> {
        self.document = Some(document);
        self.visit_expr(expr)
    }

    fn field(&self, path: &str) -> Option<&'a Bson> {
        self.document.and_then(|document| lookup(document, path))
    }

    fn pattern(&mut self, source: &str) -> DocumentStoreResult<&Regex> {
        if !self.patterns.contains_key(source) {
            let compiled = Regex::new(source)
                .map_err(|e| DocumentStoreError::InvalidQuery(e.to_string()))?;
            self.patterns.insert(source.to_string(), compiled);
        }

        self.patterns
            .get(source)
            .ok_or_else(|| DocumentStoreError::InvalidQuery(source.to_string()))
    }

    fn equals(field_value: Option<&Bson>, value: &Bson) -> bool {
        let expected = Comparable::from(value);

        match field_value {
            None => matches!(expected, Comparable::Null),
            Some(Bson::Array(items)) if !matches!(value, Bson::Array(_)) => items
                .iter()
                .any(|item| Comparable::from(item) == expected),
            Some(actual) => Comparable::from(actual) == expected,
        }
    }

    fn compare(field_value: Option<&Bson>, op: &FieldOp, value: &Bson) -> bool {
        let Some(actual) = field_value else {
            return false;
        };

        match Comparable::from(actual).same_kind_cmp(&Comparable::from(value)) {
            Some(ordering) => match op {
                FieldOp::Gt => ordering == Ordering::Greater,
                FieldOp::Gte => ordering != Ordering::Less,
                FieldOp::Lt => ordering == Ordering::Less,
                FieldOp::Lte => ordering != Ordering::Greater,
                _ => false,
            },
            None => false,
        }
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.field(field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let field_value = self.field(field);

        match op {
            FieldOp::Eq => Ok(Self::equals(field_value, value)),
            FieldOp::Ne => Ok(!Self::equals(field_value, value)),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => Ok(Self::compare(field_value, op, value)),
            FieldOp::In => match value {
                Bson::Array(candidates) => Ok(candidates
                    .iter()
                    .any(|candidate| Self::equals(field_value, candidate))),
                _ => Err(DocumentStoreError::InvalidQuery(format!(
                    "`in` on {field} requires an array value"
                ))),
            },
            FieldOp::Regex => {
                let Bson::String(source) = value else {
                    return Err(DocumentStoreError::InvalidQuery(format!(
                        "regex on {field} requires a string pattern"
                    )));
                };
                let pattern = self.pattern(source)?;

                Ok(match field_value {
                    Some(Bson::String(text)) => pattern.is_match(text),
                    Some(Bson::Array(items)) => items
                        .iter()
                        .any(|item| matches!(item, Bson::String(text) if pattern.is_match(text))),
                    _ => false,
                })
            }
        }
    }
}
