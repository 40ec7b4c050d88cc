//! Query translation from docview filter expressions to MongoDB query syntax.

use bson::{Document, Bson, doc};

use docview_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::DocumentStoreError,
};

/// Translates docview filter expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter; `None` matches every document.
    pub(crate) fn translate(filter: Option<&Expr>) -> Result<Document, DocumentStoreError> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }
}

/// `$in`/`$nin` need an array; a single value is treated as a one-element list.
fn as_list(value: &Bson) -> Bson {
    match value {
        Bson::Array(_) => value.clone(),
        single => Bson::Array(vec![single.clone()]),
    }
}

fn escape(value: &str) -> String {
    value
        .chars()
        .fold(String::with_capacity(value.len()), |mut escaped, c| {
            if "\\^$.|?*+()[]{}".contains(c) {
                escaped.push('\\');
            }
            escaped.push(c);
            escaped
        })
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // `$not` only applies to operator expressions; `$nor` negates a whole clause.
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
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
                FieldOp::Contains => match value {
                    Bson::String(s) => doc! { "$regex": escape(s) },
                    Bson::Array(arr) => doc! { "$all": arr },
                    other => doc! { "$elemMatch": { "$eq": other } },
                },
                FieldOp::NotContains => match value {
                    Bson::String(s) => doc! { "$not": { "$regex": escape(s) } },
                    other => doc! { "$nin": as_list(other) },
                },
                FieldOp::StartsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("^{}", escape(s)) },
                    _ => return Err(DocumentStoreError::Backend("StartsWith operator requires a string value".to_string())),
                },
                FieldOp::EndsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("{}$", escape(s)) },
                    _ => return Err(DocumentStoreError::Backend("EndsWith operator requires a string value".to_string())),
                },
                FieldOp::AnyOf => doc! { "$in": as_list(value) },
                FieldOp::NoneOf => doc! { "$nin": as_list(value) },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docview_core::query::Filter;

    fn translate(expr: Expr) -> Document {
        MongoQueryTranslator::translate(Some(&expr)).unwrap()
    }

    #[test]
    fn type_filters_become_in_clauses() {
        assert_eq!(
            translate(Filter::any_of("_t", vec!["Cat", "Lion"])),
            doc! { "_t": { "$in": ["Cat", "Lion"] } },
        );
        assert_eq!(
            translate(Filter::any_of("_t", "Cat")),
            doc! { "_t": { "$in": ["Cat"] } },
        );
    }

    #[test]
    fn narrowing_and_caller_filters_are_anded_in_order() {
        let expr = Filter::any_of("_t", vec!["Cat"]).and(Filter::gte("age", 3));

        assert_eq!(
            translate(expr),
            doc! { "$and": [
                { "_t": { "$in": ["Cat"] } },
                { "age": { "$gte": 3 } },
            ] },
        );
    }

    #[test]
    fn negation_uses_nor() {
        assert_eq!(
            translate(Filter::eq("name", "Tom").not()),
            doc! { "$nor": [{ "name": { "$eq": "Tom" } }] },
        );
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        assert_eq!(
            translate(Filter::starts_with("name", "a.b")),
            doc! { "name": { "$regex": "^a\\.b" } },
        );
    }

    #[test]
    fn no_filter_matches_everything() {
        assert_eq!(MongoQueryTranslator::translate(None).unwrap(), doc! {});
    }
}
