//! Storage backend abstraction for the document store.
//!
//! A [`StoreBackend`] executes filters, reads and writes over persisted BSON documents.
//! Collections and views never touch storage themselves; they build a [`Query`] or a batch
//! of documents and hand it to the backend together with their [`CollectionSettings`].
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use docview::backend::StoreBackend;
//! use docview::settings::CollectionSettings;
//! use bson::{Uuid, Bson, doc};
//!
//! let backend = MyBackendImpl::new();
//! let settings = CollectionSettings::default();
//!
//! let doc = Bson::Document(doc! { "name": "Alice", "_t": "Cat" });
//! backend.insert_documents(vec![(Uuid::new(), doc)], "animals", &settings).await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, Uuid};
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    query::{Expr, Query, UpdateScope},
    settings::CollectionSettings,
};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. Collections and views add no serialization of their own, so whatever
/// guarantees the backend gives are the ones callers get.
///
/// # Settings
///
/// Every data operation receives the [`CollectionSettings`] of the handle that issued it.
/// Backends without replication may ignore them.
///
/// # Error Handling
///
/// Errors returned here reach the caller unchanged through every collection and view
/// layered on top.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection.
    ///
    /// The collection is created automatically if it doesn't exist.
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<()>;

    /// Replaces existing documents in a collection by ID.
    ///
    /// A document is only replaced when the stored one matches `scope.filter`; otherwise the
    /// call fails with `DocumentNotFound`. Fields in `scope.retain` that the replacement
    /// omits keep their stored value.
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        scope: UpdateScope,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<()>;

    /// Deletes documents from a collection by their IDs.
    async fn delete_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<()>;

    /// Deletes every document matching `filter` (all documents when `None`).
    ///
    /// Returns the number of documents removed. A missing collection removes nothing.
    async fn delete_matching(
        &self,
        filter: Option<Expr>,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<u64>;

    /// Retrieves documents from a collection by their IDs.
    ///
    /// IDs that don't exist are omitted from the results.
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Queries documents in a collection using a structured query.
    ///
    /// Applies the filter, then sort, then offset and limit.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Counts the documents matching `filter` (all documents when `None`).
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<u64>;

    /// Creates a new, empty collection.
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Drops a collection and all its documents.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Creates an index on a field, typically the discriminator field of a shared collection.
    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()>;

    /// Removes an index from a collection.
    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
