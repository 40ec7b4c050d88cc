//! In-memory document storage backend for docview.
//!
//! A thread-safe, in-memory implementation of the `StoreBackend` trait, intended for
//! development, tests and small deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Type-erased storage** - Documents are stored as BSON, so differently-typed documents
//!   can share one collection
//! - **Full query support** - Filtering on dotted paths, sorting, pagination, counts and
//!   filtered deletes
//!
//! # Quick Start
//!
//! ```ignore
//! use docview::{DocumentCollection, DocumentStore, Narrowable, memory::InMemoryStore};
//!
//! let backend = InMemoryStore::builder().build().await?;
//! let store = DocumentStore::new(backend);
//!
//! let cats = store.typed_collection::<Animal>().of_type::<Cat>()?;
//! cats.insert(vec![tom]).await?;
//! ```

pub mod store;
pub mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
