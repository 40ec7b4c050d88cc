//! Filter expressions, find options and the visitor backends use to execute them.
//!
//! Filters are plain values. Views combine their own narrowing filter with whatever the
//! caller passes using [`Expr::and`], so composing a filter never mutates the one a view
//! holds.
//!
//! ```ignore
//! use docview::query::{Filter, FindOptions, SortDirection};
//!
//! let adults = Filter::gte("age", 18).and(Filter::exists("email"));
//! let options = FindOptions::new().limit(10).sort("name", SortDirection::Asc);
//! ```

use bson::Bson;

use crate::error::DocumentStoreError;

/// Sort direction for query results.
#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// String or array contains value.
    Contains,
    /// String or array does not contain value.
    NotContains,
    StartsWith,
    EndsWith,
    /// Field (or any of its array entries) equals any of the values.
    AnyOf,
    /// Field (and every one of its array entries) equals none of the values.
    NoneOf,
}

/// A filter expression over stored documents.
///
/// Field names may address nested values with dots (`"owner.name"`).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
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
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
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
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression.
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// ANDs an optional caller filter onto this one.
    ///
    /// `self` always comes first, so the result of narrowing a collection reads
    /// `narrowing AND caller`.
    pub fn and_then(self, other: Option<Expr>) -> Self {
        match other {
            Some(other) => self.and(other),
            None => self,
        }
    }

    /// ANDs two optional filters, keeping whichever side is present.
    pub fn and_optional(left: Option<Expr>, right: Option<Expr>) -> Option<Expr> {
        match (left, right) {
            (Some(left), right) => Some(left.and_then(right)),
            (None, right) => right,
        }
    }
}

/// Static helpers for building filter expressions.
///
/// ```ignore
/// let expr = Filter::eq("name", "Alice").and(Filter::gt("age", 18));
/// ```
pub struct Filter;

impl Filter {
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

    pub fn starts_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::StartsWith, value.into())
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::EndsWith, value.into())
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Contains, value.into())
    }

    pub fn not_contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NotContains, value.into())
    }

    /// Matches documents where the field is present.
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    /// Matches documents where the field is missing.
    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    /// Matches documents where the field, or any entry of an array field, is one of `value`.
    pub fn any_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, value.into())
    }

    /// Matches documents where the field, and every entry of an array field, is none of `value`.
    pub fn none_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, value.into())
    }
}

/// Paging and ordering for a find, independent of its filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub offset: Option<usize>,
    /// Sort specification for results.
    pub sort: Option<Sort>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(Sort { field: field.into(), direction });
        self
    }
}

/// A filter together with its find options, as handed to a storage backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression to match documents.
    pub filter: Option<Expr>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub offset: Option<usize>,
    /// Sort specification for results.
    pub sort: Option<Sort>,
}

impl Query {
    /// Creates a new empty query with no filters or limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a query from a filter and find options.
    pub fn with_options(filter: Option<Expr>, options: FindOptions) -> Self {
        Query {
            filter,
            limit: options.limit,
            offset: options.offset,
            sort: options.sort,
        }
    }
}

/// Conditions a replacement is made under.
///
/// The stored document must match `filter` for the replacement to happen. Fields named in
/// `retain` keep their stored value when the replacement leaves them out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateScope {
    pub filter: Option<Expr>,
    pub retain: Vec<String>,
}

impl UpdateScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Option<Expr>) -> Self {
        self.filter = filter;
        self
    }

    pub fn retain(mut self, field: impl Into<String>) -> Self {
        let field = field.into();

        if !self.retain.contains(&field) {
            self.retain.push(field);
        }

        self
    }
}

/// Walks a filter expression; implemented by each backend to evaluate or translate it.
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
