//! Query translation from docmodel expressions to MongoDB filter documents.

use bson::{Bson, Document, doc};

use docmodel_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Translates query expressions into MongoDB's native BSON filter syntax.
///
/// MongoDB rejects `$and`/`$or` with empty arrays and a top-level `$not`, so an empty
/// conjunction becomes `{}` (match everything), an empty disjunction becomes a filter
/// that matches nothing and negation is expressed with `$nor`.
pub struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Filter document for an optional expression; `None` matches everything.
    pub fn translate(expr: Option<&Expr>) -> DocumentStoreResult<Document> {
        match expr {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    fn visit_all(&mut self, exprs: &[Expr]) -> DocumentStoreResult<Vec<Document>> {
        exprs
            .iter()
            .map(|expr| self.visit_expr(expr))
            .collect()
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        let clauses = self.visit_all(exprs)?
            .into_iter()
            .filter(|clause| !clause.is_empty())
            .collect::<Vec<_>>();

        Ok(match clauses.len() {
            0 => doc! {},
            1 => clauses.into_iter().next().unwrap_or_default(),
            _ => doc! { "$and": clauses },
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! { "$expr": false });
        }

        Ok(doc! { "$or": self.visit_all(exprs)? })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$nor": [self.visit_expr(expr)?] })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::In => match value {
                    Bson::Array(values) => doc! { "$in": values },
                    _ => return Err(DocumentStoreError::InvalidQuery(format!("`in` on {field} requires an array value"))),
                },
                // Case-sensitive: no `$options`.
                FieldOp::Regex => match value {
                    Bson::String(pattern) => doc! { "$regex": pattern },
                    _ => return Err(DocumentStoreError::InvalidQuery(format!("regex on {field} requires a string pattern"))),
                },
            }
        })
    }
}
