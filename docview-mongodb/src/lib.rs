//! MongoDB backend implementation for docview.
//!
//! Stores documents in MongoDB and translates docview filters into MongoDB queries.
//! Each collection handle's read concern, read preference and write concern are passed
//! to the driver for every operation it issues.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docview = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docview::{backend::StoreBackendBuilder, mongodb::MongoDbStore, DocumentStore};
//!
//! let backend = MongoDbStore::builder("mongodb://localhost:27017", "zoo")
//!     .build()
//!     .await?;
//! let store = DocumentStore::new(backend);
//! ```

pub mod store;
pub(crate) mod options;
pub mod query;
pub mod sanitizer;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
