//! Typed, filtered and type-narrowed views over shared document collections.
//!
//! This crate is the primary entry point of the docview project. It re-exports the core
//! types from the sub-crates and gives access to the storage backends.
//!
//! # Features
//!
//! - **Shared collections** - Several document types live in one collection, told apart by
//!   a discriminator field (`_t` by default)
//! - **Type narrowing** - `of_type` turns a collection of a base type into a view of one
//!   subtype, with the subtype check enforced at compile time
//! - **Immutable reconfiguration** - Read concern, read preference and write concern are set
//!   per handle, and changing them produces a new handle
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docview::{prelude::*, memory::InMemoryStore};
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Animal {
//!     pub id: Uuid,
//!     pub name: String,
//! }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Cat {
//!     pub id: Uuid,
//!     pub name: String,
//!     pub lives: u8,
//! }
//!
//! impl Document for Animal {
//!     fn id(&self) -> &Uuid { &self.id }
//!     fn collection_name() -> &'static str { "animals" }
//! }
//!
//! impl Document for Cat {
//!     fn id(&self) -> &Uuid { &self.id }
//!     fn collection_name() -> &'static str { "animals" }
//! }
//!
//! impl Discriminated for Cat {
//!     fn discriminator() -> &'static str { "Cat" }
//! }
//!
//! impl SubtypeOf<Animal> for Cat {}
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let cats = store.typed_collection::<Animal>().of_type::<Cat>()?;
//!
//!     cats.insert(vec![Cat { id: Uuid::new(), name: "Tom".into(), lives: 9 }]).await?;
//!
//!     let lucky = cats
//!         .with_read_concern(ReadConcern::Majority)
//!         .find(Some(Filter::gte("lives", 7)), FindOptions::new())
//!         .await?;
//!
//!     println!("{:?}", lucky);
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

pub mod prelude;

pub use docview_core::{
    backend, collection, document, error, filtered, narrowed, query, settings, store, timer,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docview_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docview_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
