//! Collections restricted by a fixed filter.

use async_trait::async_trait;
use bson::{Bson, Uuid};

use crate::{
    collection::{DocumentCollection, Narrowable},
    document::Document,
    error::DocumentStoreResult,
    query::{Expr, FindOptions, UpdateScope},
    settings::{CollectionSettings, ReadConcern, ReadPreference, WriteConcern},
};

/// A collection whose reads, counts, updates and deletes only see documents matching `filter`.
///
/// The caller's filter, when given, is ANDed after the fixed one. Inserted documents are
/// not checked against the filter.
#[derive(Debug, Clone)]
pub struct FilteredCollection<C> {
    wrapped: C,
    filter: Expr,
}

impl<C: DocumentCollection> FilteredCollection<C> {
    pub fn new(wrapped: C, filter: Expr) -> Self {
        Self { wrapped, filter }
    }

    pub fn wrapped(&self) -> &C {
        &self.wrapped
    }

    /// The fixed filter, without any the wrapped collection applies.
    pub fn filter(&self) -> &Expr {
        &self.filter
    }

    fn combined(&self, filter: Option<Expr>) -> Option<Expr> {
        Some(self.filter.clone().and_then(filter))
    }

    fn rewrap(&self, wrapped: C) -> Self {
        Self::new(wrapped, self.filter.clone())
    }
}

#[async_trait]
impl<C: DocumentCollection> DocumentCollection for FilteredCollection<C> {
    type Document = C::Document;

    fn name(&self) -> &str {
        self.wrapped.name()
    }

    fn settings(&self) -> &CollectionSettings {
        self.wrapped.settings()
    }

    fn effective_filter(&self) -> Option<Expr> {
        Expr::and_optional(self.wrapped.effective_filter(), Some(self.filter.clone()))
    }

    async fn find_documents(
        &self,
        filter: Option<Expr>,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Bson>> {
        self.wrapped
            .find_documents(self.combined(filter), options)
            .await
    }

    async fn find_raw(
        &self,
        filter: Option<Expr>,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Vec<u8>>> {
        self.wrapped
            .find_raw(self.combined(filter), options)
            .await
    }

    async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.wrapped
            .count(self.combined(filter))
            .await
    }

    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.wrapped
            .insert_documents(documents)
            .await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        scope: UpdateScope,
    ) -> DocumentStoreResult<()> {
        let filter = self.combined(scope.filter.clone());

        self.wrapped
            .update_documents(documents, scope.filter(filter))
            .await
    }

    async fn delete_many(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.wrapped
            .delete_many(self.combined(filter))
            .await
    }

    fn with_read_concern(&self, read_concern: ReadConcern) -> Self {
        self.rewrap(self.wrapped.with_read_concern(read_concern))
    }

    fn with_read_preference(&self, read_preference: ReadPreference) -> Self {
        self.rewrap(self.wrapped.with_read_preference(read_preference))
    }

    fn with_write_concern(&self, write_concern: WriteConcern) -> Self {
        self.rewrap(self.wrapped.with_write_concern(write_concern))
    }
}

impl<C: Narrowable> Narrowable for FilteredCollection<C> {
    type Retyped<T: Document> = FilteredCollection<C::Retyped<T>>;

    fn retype<T: Document>(&self) -> Self::Retyped<T> {
        FilteredCollection::new(self.wrapped.retype::<T>(), self.filter.clone())
    }
}
