//! Query expression evaluation for in-memory document filtering.
//!
//! Field names address nested documents with dots (`"owner.name"`). A document that is
//! not a BSON document, or lacks the field, simply does not match.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, datetime::DateTime};

use docview_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Comparable view of a BSON value.
///
/// Integers and floats are normalized to `f64`, so `Int32(3) == Double(3.0)`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    /// Binary payloads, UUIDs included.
    Binary(&'a [u8]),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Values with no meaningful comparison; never equal to anything.
    Opaque,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Binary(binary) => Comparable::Binary(&binary.bytes),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Opaque,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Binary(a), Comparable::Binary(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted field path inside a document.
pub(crate) fn lookup<'a>(document: &'a Bson, path: &str) -> Option<&'a Bson> {
    path.split('.')
        .try_fold(document, |current, segment| {
            current
                .as_document()
                .and_then(|fields| fields.get(segment))
        })
}

/// Whether `candidate` equals `value`, or any entry of it when `candidate` is an array.
fn holds(candidate: &Comparable<'_>, value: &Comparable<'_>) -> bool {
    match candidate {
        Comparable::Array(items) => items.iter().any(|item| item == value) || candidate == value,
        _ => candidate == value,
    }
}

/// Whether the stored value shares any member with `values` (a single value or an array).
fn intersects(stored: &Comparable<'_>, values: &Comparable<'_>) -> bool {
    match values {
        Comparable::Array(values) => values.iter().any(|value| holds(stored, value)),
        value => holds(stored, value),
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Bson,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Bson) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Keeps the documents matching `expr`.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Bson>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(expr)? {
                matched.push(document.clone());
            }
        }

        Ok(matched)
    }

    /// Whether `document` matches `expr`, or `true` when there is no filter.
    pub fn matches(document: &'a Bson, expr: Option<&Expr>) -> DocumentStoreResult<bool> {
        match expr {
            Some(expr) => DocumentEvaluator::new(document).evaluate(expr),
            None => Ok(true),
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
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = lookup(self.document, field) else {
            // Missing fields only satisfy the negative operators.
            return Ok(matches!(op, FieldOp::Ne | FieldOp::NotContains | FieldOp::NoneOf));
        };

        let stored = Comparable::from(field_value);
        let expected = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => stored == expected,
            FieldOp::Ne => stored != expected,
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match stored.partial_cmp(&expected) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                }
            },
            FieldOp::Contains => match (&stored, &expected) {
                (Comparable::String(left), Comparable::String(right)) => left.contains(right),
                (Comparable::Array(_), _) => holds(&stored, &expected),
                _ => false,
            },
            FieldOp::NotContains => match (&stored, &expected) {
                (Comparable::String(left), Comparable::String(right)) => !left.contains(right),
                (Comparable::Array(_), _) => !holds(&stored, &expected),
                _ => true,
            },
            FieldOp::StartsWith => match (&stored, &expected) {
                (Comparable::String(left), Comparable::String(right)) => left.starts_with(right),
                _ => false,
            },
            FieldOp::EndsWith => match (&stored, &expected) {
                (Comparable::String(left), Comparable::String(right)) => left.ends_with(right),
                _ => false,
            },
            FieldOp::AnyOf => intersects(&stored, &expected),
            FieldOp::NoneOf => !intersects(&stored, &expected),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docview_core::query::Filter;

    fn eval(document: &Bson, expr: Expr) -> bool {
        DocumentEvaluator::new(document).evaluate(&expr).unwrap()
    }

    #[test]
    fn dotted_paths_reach_nested_fields() {
        let document = Bson::Document(doc! { "owner": { "name": "Ann", "age": 40 } });

        assert!(eval(&document, Filter::eq("owner.name", "Ann")));
        assert!(eval(&document, Filter::gte("owner.age", 40)));
        assert!(eval(&document, Filter::not_exists("owner.email")));
        assert!(!eval(&document, Filter::eq("owner.name.first", "Ann")));
    }

    #[test]
    fn any_of_matches_single_tags_and_tag_arrays() {
        let cat = Bson::Document(doc! { "_t": "Cat" });
        let lion = Bson::Document(doc! { "_t": ["Animal", "Cat", "Lion"] });
        let dog = Bson::Document(doc! { "_t": "Dog" });
        let cats = || Filter::any_of("_t", vec!["Cat", "Lion"]);

        assert!(eval(&cat, cats()));
        assert!(eval(&lion, cats()));
        assert!(!eval(&dog, cats()));
        assert!(eval(&dog, Filter::none_of("_t", vec!["Cat", "Lion"])));
    }

    #[test]
    fn numbers_compare_across_widths() {
        let document = Bson::Document(doc! { "age": 3_i64 });

        assert!(eval(&document, Filter::eq("age", 3)));
        assert!(eval(&document, Filter::gt("age", 2.5)));
        assert!(!eval(&document, Filter::lt("age", 3)));
    }

    #[test]
    fn uuids_compare_by_value() {
        let id = bson::Uuid::new();
        let document = Bson::Document(doc! { "id": id });

        assert!(eval(&document, Filter::eq("id", id)));
        assert!(!eval(&document, Filter::eq("id", bson::Uuid::new())));
    }

    #[test]
    fn non_documents_never_match() {
        assert!(!eval(&Bson::Int32(1), Filter::exists("a")));
        assert!(!eval(&Bson::Null, Filter::eq("a", 1)));
    }
}
