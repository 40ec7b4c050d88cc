//! Typed, filtered and type-narrowed views over shared document collections.
//!
//! This crate is the core of the docview project and provides:
//!
//! - **Document traits** ([`document`]) - Documents, their serialization and type tags
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Query and filtering API** ([`query`]) - Filter expressions and find options
//! - **Collections** ([`collection`], [`filtered`], [`narrowed`]) - Typed handles and the views built on them
//! - **Durability settings** ([`settings`]) - Read concern, read preference and write concern
//! - **Document store** ([`store`]) - Entry point handing out collection handles
//! - **Timing** ([`timer`]) - Scoped wall-clock timing with checkpoints
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docview::{Discriminated, Document, DocumentStore, SubtypeOf};
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Cat {
//!     pub id: Uuid,
//!     pub name: String,
//! }
//!
//! impl Document for Cat {
//!     fn id(&self) -> &Uuid {
//!         &self.id
//!     }
//!
//!     fn collection_name() -> &'static str {
//!         "animals"
//!     }
//! }
//!
//! impl Discriminated for Cat {
//!     fn discriminator() -> &'static str {
//!         "Cat"
//!     }
//! }
//!
//! impl SubtypeOf<Animal> for Cat {}
//!
//! let cats = store.typed_collection::<Animal>().of_type::<Cat>()?;
//! ```

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod filtered;
pub mod narrowed;
pub mod query;
pub mod settings;
pub mod store;
pub mod timer;
