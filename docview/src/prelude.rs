//! Convenient re-exports of commonly used types from docview.
//!
//! ```ignore
//! use docview::prelude::*;
//! ```

pub use docview_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::{DocumentCollection, Narrowable, TypedCollection},
    document::{Discriminated, Document, DocumentExt, SubtypeOf},
    error::{DocumentStoreError, DocumentStoreResult},
    filtered::FilteredCollection,
    narrowed::OfTypeCollection,
    query::{Expr, FieldOp, Filter, FindOptions, Query, QueryVisitor, Sort, SortDirection, UpdateScope},
    settings::{Acknowledgment, CollectionSettings, ReadConcern, ReadPreference, WriteConcern},
    store::DocumentStore,
    timer::ScopedTimer,
};
