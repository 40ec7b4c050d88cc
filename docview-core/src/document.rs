//! Core traits for document representation, serialization and type discrimination.
//!
//! A collection may hold several document types at once, each tagged with a discriminator
//! field (`_t` by default). [`Discriminated`] describes how a type is tagged, and
//! [`SubtypeOf`] declares at compile time that one document type is a narrowing of another,
//! which is what [`of_type`](crate::collection::Narrowable::of_type) requires.

use bson::{Bson, Uuid, de::deserialize_from_bson, ser::{serialize_to_bson, serialize_to_vec}};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Filter},
};

/// Field name used for the type tag unless a type overrides [`Discriminated::discriminator_key`].
pub const DEFAULT_DISCRIMINATOR_KEY: &str = "_t";

/// Core trait that all documents stored in a document store must implement.
///
/// Every document must have a unique identifier (UUID) and specify which collection it
/// belongs to. Types that share a collection return the same collection name.
///
/// # Example
///
/// ```ignore
/// use docview::document::Document;
/// use bson::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Animal {
///     pub id: Uuid,
///     pub name: String,
/// }
///
/// impl Document for Animal {
///     fn id(&self) -> &Uuid {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "animals"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this document's unique identifier.
    fn id(&self) -> &Uuid;

    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;
}

/// Extension trait providing serialization/deserialization utilities for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value for storage.
    fn to_bson(&self) -> DocumentStoreResult<Bson>;

    /// Creates a document from a BSON value.
    fn from_bson(bson: Bson) -> DocumentStoreResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> DocumentStoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// A document type that is told apart from its siblings by a type tag field.
///
/// `discriminators` lists every tag a stored document may carry and still be read as
/// `Self`. A type with subtypes of its own lists their tags too, so that a view of the
/// parent also yields the children.
///
/// # Example
///
/// ```ignore
/// impl Discriminated for Cat {
///     fn discriminator() -> &'static str { "Cat" }
///     fn discriminators() -> Vec<&'static str> { vec!["Cat", "Lion"] }
/// }
/// ```
pub trait Discriminated: Document {
    /// Field holding the type tag.
    fn discriminator_key() -> &'static str {
        DEFAULT_DISCRIMINATOR_KEY
    }

    /// Tag written on documents of exactly this type.
    fn discriminator() -> &'static str;

    /// Tags accepted when reading this type.
    fn discriminators() -> Vec<&'static str> {
        vec![Self::discriminator()]
    }

    /// Filter selecting documents readable as this type.
    fn type_filter() -> Expr {
        Filter::any_of(Self::discriminator_key(), Self::discriminators())
    }
}

/// Marks `Self` as a narrowing of the document type `B`.
///
/// Every stored `Self` is also a valid `B`, so a collection of `B` can be narrowed to
/// `Self` with [`of_type`](crate::collection::Narrowable::of_type). The relationship is
/// declared, not inferred: implement it once per ancestor.
///
/// ```ignore
/// impl SubtypeOf<Animal> for Cat {}
/// impl SubtypeOf<Animal> for Lion {}
/// impl SubtypeOf<Cat> for Lion {}
/// ```
pub trait SubtypeOf<B: Document>: Discriminated {}

/// Checks that `D` carries a usable discriminator before any view is built on it.
pub(crate) fn verify_narrowing<D: Discriminated>() -> DocumentStoreResult<()> {
    let tags = D::discriminators();

    if D::discriminator_key().trim().is_empty()
        || tags.is_empty()
        || tags.iter().any(|tag| tag.trim().is_empty())
    {
        return Err(DocumentStoreError::TypeMismatch(
            std::any::type_name::<D>().to_string(),
            "no usable discriminator".to_string(),
        ));
    }

    Ok(())
}

/// Verifies that a stored document's tag is one `D` accepts.
///
/// Tags may be a single string or an array of strings (hierarchical tagging); an array
/// matches when any of its entries is accepted.
pub(crate) fn verify_discriminator<D: Discriminated>(document: &Bson) -> DocumentStoreResult<()> {
    let accepted = D::discriminators();
    let found = document
        .as_document()
        .and_then(|fields| fields.get(D::discriminator_key()));

    let matches = match found {
        Some(Bson::String(tag)) => accepted.contains(&tag.as_str()),
        Some(Bson::Array(tags)) => tags
            .iter()
            .any(|tag| matches!(tag, Bson::String(tag) if accepted.contains(&tag.as_str()))),
        _ => false,
    };

    if matches {
        Ok(())
    } else {
        Err(DocumentStoreError::TypeMismatch(
            D::discriminator().to_string(),
            found
                .map(|tag| tag.to_string())
                .unwrap_or_else(|| format!("document without `{}`", D::discriminator_key())),
        ))
    }
}

/// Writes `D`'s tag onto a document that does not carry one yet, then verifies the result.
pub(crate) fn stamp_discriminator<D: Discriminated>(document: &mut Bson) -> DocumentStoreResult<()> {
    let fields = document
        .as_document_mut()
        .ok_or_else(|| DocumentStoreError::InvalidDocument("Expected document".into()))?;

    if !fields.contains_key(D::discriminator_key()) {
        fields.insert(D::discriminator_key(), D::discriminator());
    }

    verify_discriminator::<D>(document)
}

/// Checks a replacement document before it is written through a view of `D`.
///
/// A replacement carrying a tag must carry one `D` accepts. One without a tag is left
/// alone, so that the stored document's tag survives the replacement.
pub(crate) fn verify_replacement<D: Discriminated>(document: &Bson) -> DocumentStoreResult<()> {
    let fields = document
        .as_document()
        .ok_or_else(|| DocumentStoreError::InvalidDocument("Expected document".into()))?;

    if fields.contains_key(D::discriminator_key()) {
        verify_discriminator::<D>(document)?;
    }

    Ok(())
}

/// Encodes a stored document into its BSON byte representation.
pub(crate) fn to_raw_bytes(document: &Bson) -> DocumentStoreResult<Vec<u8>> {
    match document {
        Bson::Document(fields) => Ok(serialize_to_vec(fields)?),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "Expected document, found {:?}",
            other.element_type()
        ))),
    }
}
