//! Collection handles and the traits views are built on.
//!
//! - [`DocumentCollection`] - Anything documents can be read from and written to: a plain
//!   [`TypedCollection`], a [`FilteredCollection`], or a type-narrowed [`OfTypeCollection`]
//! - [`Narrowable`] - Collections that can be retyped, and therefore act as the root of a
//!   narrowing
//!
//! Handles are cheap to clone and immutable. Reconfiguring one (`with_read_concern` and
//! friends) returns a new handle and leaves the receiver as it was.
//!
//! # Example
//!
//! ```ignore
//! let animals = store.typed_collection::<Animal>();
//! let cats = animals.of_type::<Cat>()?;
//!
//! cats.insert(vec![tom]).await?;
//! let old_cats = cats.find(Some(Filter::gte("age", 10)), FindOptions::new()).await?;
//!
//! let careful = cats.with_read_concern(ReadConcern::Majority);
//! ```

use async_trait::async_trait;
use bson::{Bson, Uuid};
use std::{fmt, marker::PhantomData};

use crate::{
    backend::StoreBackend,
    document::{Document, DocumentExt, SubtypeOf, to_raw_bytes},
    error::DocumentStoreResult,
    filtered::FilteredCollection,
    narrowed::OfTypeCollection,
    query::{Expr, FindOptions, Query, UpdateScope},
    settings::{CollectionSettings, ReadConcern, ReadPreference, WriteConcern},
};

/// A handle to a collection of `Self::Document`.
///
/// Implementors provide the BSON-level operations; the typed `find`, `find_one`,
/// `insert` and `update` are derived from them.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    type Document: Document;

    /// Name of the underlying storage collection.
    fn name(&self) -> &str;

    /// Read and write policies this handle issues operations with.
    fn settings(&self) -> &CollectionSettings;

    /// The filter this handle applies to every read, update, delete and count, if any.
    fn effective_filter(&self) -> Option<Expr>;

    /// Finds matching documents without decoding them.
    async fn find_documents(
        &self,
        filter: Option<Expr>,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Finds matching documents as encoded BSON bytes.
    async fn find_raw(
        &self,
        filter: Option<Expr>,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Vec<u8>>>;

    /// Counts matching documents.
    async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64>;

    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()>;

    /// Replaces existing documents by ID, provided the stored ones fall within `scope`
    /// and this handle's own filter.
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        scope: UpdateScope,
    ) -> DocumentStoreResult<()>;

    /// Deletes matching documents, returning how many were removed.
    async fn delete_many(&self, filter: Option<Expr>) -> DocumentStoreResult<u64>;

    fn with_read_concern(&self, read_concern: ReadConcern) -> Self
    where
        Self: Sized;

    fn with_read_preference(&self, read_preference: ReadPreference) -> Self
    where
        Self: Sized;

    fn with_write_concern(&self, write_concern: WriteConcern) -> Self
    where
        Self: Sized;

    /// Finds and decodes matching documents.
    async fn find(
        &self,
        filter: Option<Expr>,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Self::Document>> {
        self.find_documents(filter, options)
            .await?
            .into_iter()
            .map(<Self::Document as DocumentExt>::from_bson)
            .collect()
    }

    /// Finds the first matching document.
    async fn find_one(&self, filter: Option<Expr>) -> DocumentStoreResult<Option<Self::Document>> {
        Ok(self
            .find(filter, FindOptions::new().limit(1))
            .await?
            .into_iter()
            .next())
    }

    /// Inserts new documents.
    async fn insert(&self, documents: Vec<Self::Document>) -> DocumentStoreResult<()> {
        self.insert_documents(encode(documents)?).await
    }

    /// Replaces existing documents by ID.
    async fn update(&self, documents: Vec<Self::Document>) -> DocumentStoreResult<()> {
        self.update_documents(encode(documents)?, UpdateScope::new()).await
    }
}

/// A collection that can be viewed as holding another document type.
///
/// Narrowable collections are the roots of type-narrowed views: `of_type` retypes the
/// root and attaches the subtype's discriminator filter.
pub trait Narrowable: DocumentCollection + Clone {
    type Retyped<T: Document>: DocumentCollection<Document = T> + Clone;

    /// The same collection, settings and filters, read and written as `T`.
    fn retype<T: Document>(&self) -> Self::Retyped<T>;

    /// Restricts every read, count and delete to documents matching `filter`.
    fn filtered(&self, filter: Expr) -> FilteredCollection<Self> {
        FilteredCollection::new(self.clone(), filter)
    }

    /// Narrows this collection to the documents of subtype `T`.
    fn of_type<T>(&self) -> DocumentStoreResult<OfTypeCollection<Self, Self::Retyped<T>>>
    where
        T: SubtypeOf<Self::Document>,
    {
        OfTypeCollection::narrow(self.clone(), self.retype::<T>(), T::type_filter())
    }
}

fn encode<D: Document>(documents: Vec<D>) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
    documents
        .into_iter()
        .map(|d| {
            d.to_bson()
                .map(move |b| (d.id().clone(), b))
        })
        .collect()
}

/// A collection of `D` stored through backend `B`.
pub struct TypedCollection<'a, B: StoreBackend, D: Document> {
    name: String,
    backend: &'a B,
    settings: CollectionSettings,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(name: String, backend: &'a B, settings: CollectionSettings) -> Self {
        Self { name, backend, settings, _marker: PhantomData }
    }

    /// The backend this collection issues operations to.
    pub fn backend(&self) -> &'a B {
        self.backend
    }

    /// Converts this typed collection to a different document type.
    pub fn with_type<T: Document>(&self) -> TypedCollection<'a, B, T> {
        TypedCollection::new(self.name.clone(), self.backend, self.settings.clone())
    }

    fn with_settings(&self, settings: CollectionSettings) -> Self {
        Self::new(self.name.clone(), self.backend, settings)
    }

    /// Retrieves documents by their IDs. IDs that don't exist are omitted.
    pub async fn get<U>(&self, ids: Vec<U>) -> DocumentStoreResult<Vec<D>>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .get_documents(
                ids.into_iter()
                    .map(Into::into)
                    .collect(),
                &self.name,
                &self.settings,
            )
            .await?
            .into_iter()
            .map(D::from_bson)
            .collect()
    }

    /// Deletes documents by their IDs.
    pub async fn delete<U>(&self, ids: Vec<U>) -> DocumentStoreResult<()>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .delete_documents(
                ids.into_iter()
                    .map(Into::into)
                    .collect(),
                &self.name,
                &self.settings,
            )
            .await
    }
}

impl<B: StoreBackend, D: Document> Clone for TypedCollection<'_, B, D> {
    fn clone(&self) -> Self {
        self.with_settings(self.settings.clone())
    }
}

impl<B: StoreBackend, D: Document> fmt::Debug for TypedCollection<'_, B, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCollection")
            .field("name", &self.name)
            .field("document", &std::any::type_name::<D>())
            .field("settings", &self.settings)
            .field("backend", self.backend)
            .finish()
    }
}

#[async_trait]
impl<'a, B: StoreBackend, D: Document> DocumentCollection for TypedCollection<'a, B, D> {
    type Document = D;

    fn name(&self) -> &str {
        &self.name
    }

    fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    fn effective_filter(&self) -> Option<Expr> {
        None
    }

    async fn find_documents(
        &self,
        filter: Option<Expr>,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Bson>> {
        self.backend
            .query_documents(Query::with_options(filter, options), &self.name, &self.settings)
            .await
    }

    async fn find_raw(
        &self,
        filter: Option<Expr>,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Vec<u8>>> {
        self.find_documents(filter, options)
            .await?
            .iter()
            .map(to_raw_bytes)
            .collect()
    }

    async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.backend
            .count_documents(filter, &self.name, &self.settings)
            .await
    }

    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(documents, &self.name, &self.settings)
            .await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        scope: UpdateScope,
    ) -> DocumentStoreResult<()> {
        self.backend
            .update_documents(documents, scope, &self.name, &self.settings)
            .await
    }

    async fn delete_many(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.backend
            .delete_matching(filter, &self.name, &self.settings)
            .await
    }

    fn with_read_concern(&self, read_concern: ReadConcern) -> Self {
        self.with_settings(self.settings.clone().with_read_concern(read_concern))
    }

    fn with_read_preference(&self, read_preference: ReadPreference) -> Self {
        self.with_settings(self.settings.clone().with_read_preference(read_preference))
    }

    fn with_write_concern(&self, write_concern: WriteConcern) -> Self {
        self.with_settings(self.settings.clone().with_write_concern(write_concern))
    }
}

impl<'a, B: StoreBackend, D: Document> Narrowable for TypedCollection<'a, B, D> {
    type Retyped<T: Document> = TypedCollection<'a, B, T>;

    fn retype<T: Document>(&self) -> Self::Retyped<T> {
        self.with_type::<T>()
    }
}
