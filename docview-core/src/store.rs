//! Main document store interface.
//!
//! A [`DocumentStore`] owns a backend and hands out [`TypedCollection`] handles bound to
//! it. Handles inherit the store's default [`CollectionSettings`] and can be reconfigured
//! individually afterwards.
//!
//! # Example
//!
//! ```ignore
//! use docview::store::DocumentStore;
//! use docview::settings::{CollectionSettings, ReadConcern};
//!
//! let store = DocumentStore::new(backend)
//!     .with_settings(CollectionSettings::new().with_read_concern(ReadConcern::Majority));
//! let animals = store.typed_collection::<Animal>();
//! ```

use crate::{
    backend::StoreBackend,
    collection::TypedCollection,
    document::Document,
    error::DocumentStoreResult,
    settings::CollectionSettings,
};

/// A document store bound to a specific backend implementation.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
    settings: CollectionSettings,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend, settings: CollectionSettings::default() }
    }

    /// Sets the settings every collection handed out afterwards starts with.
    pub fn with_settings(mut self, settings: CollectionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a typed collection for the specified document type.
    ///
    /// The collection name is determined by the document type's `collection_name()` method.
    pub fn typed_collection<'a, D: Document>(&'a self) -> TypedCollection<'a, B, D> {
        TypedCollection::new(
            D::collection_name().to_string(),
            &self.backend,
            self.settings.clone(),
        )
    }

    /// Creates a new collection with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection already exists or creation fails.
    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .create_collection(name)
            .await
    }

    /// Drops a collection with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or deletion fails.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name).await
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Adds an index to a field in a collection.
    ///
    /// Indexing the discriminator field keeps narrowed reads on shared collections cheap.
    ///
    /// # Errors
    ///
    /// Returns an error if the index already exists or the operation fails.
    pub async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()> {
        self.backend
            .add_index(collection, field, unique)
            .await
    }

    /// Removes an index from a field in a collection.
    pub async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        self.backend
            .drop_index(collection, field)
            .await
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;

        Ok(())
    }
}
