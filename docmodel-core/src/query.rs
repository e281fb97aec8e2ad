//! Predicate and query AST shared by models and store backends.
//!
//! Models build [`Expr`] predicates and [`Query`] values; backends execute them,
//! usually by implementing [`QueryVisitor`] (the in-memory backend evaluates the
//! tree, the MongoDB backend translates it into a filter document).
//!
//! ```ignore
//! use docmodel::query::{Filter, Query, SortDirection};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("status", "active").and(Filter::gte("age", 18)))
//!     .sort("createdDate", SortDirection::Desc)
//!     .limit(10)
//!     .offset(20)
//!     .build();
//! ```

use bson::Bson;

use crate::error::DocumentStoreError;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// The numeric sort code used by MongoDB-style drivers (`1` / `-1`).
    pub fn code(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// Single-key sort specification.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Field value (or any element of an array field) is one of the given values.
    In,
    /// String field matches the regular expression given as a string value.
    /// Matching is case-sensitive and unanchored.
    Regex,
}

/// A predicate over stored documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions. An empty list matches every document.
    And(Vec<Expr>),
    /// Logical OR of multiple expressions.
    Or(Vec<Expr>),
    /// Logical NOT of an expression.
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Returns `true` when the expression places no constraint at all, i.e. it is an
    /// `And` whose members are themselves all empty.
    ///
    /// Bulk writes refuse empty predicates so that they never touch every document.
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(list) => list.iter().all(Expr::is_empty),
            _ => false,
        }
    }
}

/// Static constructors for [`Expr`] values.
pub struct Filter;

impl Filter {
    /// The match-all expression (an empty conjunction).
    pub fn all() -> Expr {
        Expr::And(Vec::new())
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Matches documents whose field equals one of `values`.
    pub fn any_of<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::In,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Matches documents whose string field matches `pattern`.
    ///
    /// The pattern is used as-is; escape user input before passing it here.
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Expr {
        Expr::field(field.into(), FieldOp::Regex, Bson::String(pattern.into()))
    }

    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

/// A read request: predicate, sort, limit and offset.
///
/// `limit` and `offset` are signed and are handed to the backend untouched, so the
/// store's own semantics decide what zero or negative values mean.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression; `None` matches every document.
    pub filter: Option<Expr>,
    /// Maximum number of documents to return.
    pub limit: Option<i64>,
    /// Number of documents to skip.
    pub offset: Option<i64>,
    /// Sort specification for results.
    pub sort: Option<Sort>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// A query matching every document, without sort or pagination.
    pub fn filtered(filter: Option<Expr>) -> Self {
        Query { filter, ..Query::default() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the filter expression, or clears it when `filter` is `None`.
    pub fn maybe_filter(mut self, filter: Option<Expr>) -> Self {
        self.query.filter = filter;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.query.offset = Some(offset);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// Walks an [`Expr`] tree; implemented by each backend.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conjunctions_are_empty() {
        assert!(Filter::all().is_empty());
        assert!(Filter::and([Filter::all(), Filter::and([])]).is_empty());
    }

    #[test]
    fn constrained_expressions_are_not_empty() {
        assert!(!Filter::eq("status", "x").is_empty());
        assert!(!Filter::and([Filter::all(), Filter::exists("a")]).is_empty());
        assert!(!Filter::or([]).is_empty());
    }

    #[test]
    fn and_appends_to_existing_conjunction() {
        let expr = Filter::eq("a", 1).and(Filter::eq("b", 2)).and(Filter::eq("c", 3));

        match expr {
            Expr::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn builder_keeps_signed_pagination() {
        let query = Query::builder().limit(-5).offset(-1).build();

        assert_eq!(query.limit, Some(-5));
        assert_eq!(query.offset, Some(-1));
        assert!(query.filter.is_none());
    }
}
