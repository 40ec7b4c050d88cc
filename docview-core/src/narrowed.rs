//! Views of a collection narrowed to one document subtype.
//!
//! An [`OfTypeCollection`] remembers the collection it was narrowed from (its root) and
//! wraps a retyped copy of that root behind the subtype's discriminator filter. Reads
//! return only documents tagged as the subtype. Inserts tag documents that carry no tag
//! yet. Updates only replace documents the view can see, and keep the stored tag, so a
//! `Lion` written back through a view of `Cat` stays a `Lion`.
//!
//! Narrowing again always starts from the root, so `animals.of_type::<Cat>()?.of_type::<Lion>()?`
//! is the same view as `animals.of_type::<Lion>()?`: one discriminator filter, never a
//! stack of them.

use async_trait::async_trait;
use bson::{Bson, Uuid};

use crate::{
    collection::{DocumentCollection, Narrowable},
    document::{
        Discriminated, SubtypeOf, stamp_discriminator, verify_discriminator, verify_narrowing,
        verify_replacement,
    },
    error::{DocumentStoreError, DocumentStoreResult},
    filtered::FilteredCollection,
    query::{Expr, FindOptions, UpdateScope},
    settings::{CollectionSettings, ReadConcern, ReadPreference, WriteConcern},
};

/// A collection of `R::Document` seen as holding only `W::Document`.
#[derive(Debug, Clone)]
pub struct OfTypeCollection<R, W> {
    root: R,
    inner: FilteredCollection<W>,
}

impl<R, W> OfTypeCollection<R, W>
where
    R: Narrowable,
    W: DocumentCollection,
    W::Document: SubtypeOf<R::Document>,
{
    /// Narrows `wrapped`, a retyped copy of `root`, with `filter`.
    ///
    /// Fails with [`DocumentStoreError::TypeMismatch`] when the subtype has no usable
    /// discriminator.
    pub fn narrow(root: R, wrapped: W, filter: Expr) -> DocumentStoreResult<Self> {
        verify_narrowing::<W::Document>()?;

        tracing::debug!(
            collection = wrapped.name(),
            document_type = <W::Document as Discriminated>::discriminator(),
            "narrowing collection"
        );

        Ok(Self { root, inner: FilteredCollection::new(wrapped, filter) })
    }

    /// The collection this view was first narrowed from.
    pub fn root(&self) -> &R {
        &self.root
    }

    /// The retyped collection reads and writes go through.
    pub fn wrapped(&self) -> &W {
        self.inner.wrapped()
    }

    /// The discriminator filter this view adds on top of the root's own filter.
    pub fn filter(&self) -> &Expr {
        self.inner.filter()
    }

    /// Narrows further, to a subtype of this view's document type.
    ///
    /// The new view is derived from the root, not from this view.
    pub fn of_type<T>(&self) -> DocumentStoreResult<OfTypeCollection<R, R::Retyped<T>>>
    where
        T: SubtypeOf<W::Document> + SubtypeOf<R::Document>,
    {
        self.root.of_type::<T>()
    }

    fn rewrap(&self, wrapped: W) -> Self {
        Self {
            root: self.root.clone(),
            inner: FilteredCollection::new(wrapped, self.filter().clone()),
        }
    }
}

#[async_trait]
impl<R, W> DocumentCollection for OfTypeCollection<R, W>
where
    R: Narrowable,
    W: DocumentCollection,
    W::Document: SubtypeOf<R::Document>,
{
    type Document = W::Document;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn settings(&self) -> &CollectionSettings {
        self.inner.settings()
    }

    fn effective_filter(&self) -> Option<Expr> {
        self.inner.effective_filter()
    }

    async fn find_documents(
        &self,
        filter: Option<Expr>,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let documents = self
            .inner
            .find_documents(filter, options)
            .await?;

        for document in &documents {
            verify_discriminator::<W::Document>(document)?;
        }

        Ok(documents)
    }

    async fn find_raw(
        &self,
        _filter: Option<Expr>,
        _options: FindOptions,
    ) -> DocumentStoreResult<Vec<Vec<u8>>> {
        tracing::debug!(
            collection = self.name(),
            document_type = <W::Document as Discriminated>::discriminator(),
            "refusing raw retrieval through a narrowed collection"
        );

        Err(DocumentStoreError::NotSupported(format!(
            "raw retrieval from `{}` narrowed to `{}`",
            self.name(),
            <W::Document as Discriminated>::discriminator()
        )))
    }

    async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.inner.count(filter).await
    }

    async fn insert_documents(&self, mut documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        for (_, document) in documents.iter_mut() {
            stamp_discriminator::<W::Document>(document)?;
        }

        self.inner
            .insert_documents(documents)
            .await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        scope: UpdateScope,
    ) -> DocumentStoreResult<()> {
        for (_, document) in &documents {
            verify_replacement::<W::Document>(document)?;
        }

        self.inner
            .update_documents(
                documents,
                scope.retain(<W::Document as Discriminated>::discriminator_key()),
            )
            .await
    }

    async fn delete_many(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.inner.delete_many(filter).await
    }

    fn with_read_concern(&self, read_concern: ReadConcern) -> Self {
        self.rewrap(self.wrapped().with_read_concern(read_concern))
    }

    fn with_read_preference(&self, read_preference: ReadPreference) -> Self {
        self.rewrap(self.wrapped().with_read_preference(read_preference))
    }

    fn with_write_concern(&self, write_concern: WriteConcern) -> Self {
        self.rewrap(self.wrapped().with_write_concern(write_concern))
    }
}
