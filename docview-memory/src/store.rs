//! In-memory storage implementation for document stores.
//!
//! Documents are kept as BSON values in HashMaps behind async-aware read-write locks.
//! Read and write policies are accepted and ignored: there is a single copy of every
//! document and every write is visible as soon as it returns.

use std::{collections::{HashMap, HashSet}, sync::Arc, cmp::Ordering};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Uuid, Bson};

use docview_core::{
    query::{Expr, Query, SortDirection, UpdateScope},
    error::{DocumentStoreError, DocumentStoreResult},
    backend::{StoreBackend, StoreBackendBuilder},
    settings::CollectionSettings,
    timer::ScopedTimer,
};

use crate::evaluator::{DocumentEvaluator, Comparable, lookup};

type CollectionMap = HashMap<String, Bson>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so clones share
/// the same underlying data.
///
/// Queries scan every document in a collection; indexes are accepted but not built.
///
/// # Example
///
/// ```ignore
/// use docview_memory::InMemoryStore;
/// use docview::{backend::StoreBackend, settings::CollectionSettings};
/// use bson::{Uuid, Bson, doc};
///
/// let store = InMemoryStore::new();
/// let settings = CollectionSettings::default();
///
/// let id = Uuid::new();
/// let doc = Bson::Document(doc! { "name": "Tom", "_t": "Cat" });
/// store.insert_documents(vec![(id, doc)], "animals", &settings).await?;
///
/// let docs = store.get_documents(vec![id], "animals", &settings).await?;
/// assert_eq!(docs.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (document id -> document)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

/// Carries the `retain` fields the replacement leaves out over from the stored document.
fn retain_fields(mut replacement: Bson, stored: &Bson, retain: &[String]) -> DocumentStoreResult<Bson> {
    let fields = replacement
        .as_document_mut()
        .ok_or_else(|| DocumentStoreError::InvalidDocument("Expected document".into()))?;

    if let Some(stored) = stored.as_document() {
        for field in retain {
            if !fields.contains_key(field) {
                if let Some(value) = stored.get(field) {
                    fields.insert(field.clone(), value.clone());
                }
            }
        }
    }

    Ok(replacement)
}

fn sort_key<'a>(document: &'a Bson, field: &str) -> Comparable<'a> {
    lookup(document, field)
        .map(Comparable::from)
        .unwrap_or(Comparable::Null)
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
        _settings: &CollectionSettings,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        let mut incoming = HashSet::with_capacity(documents.len());

        for (id, _) in &documents {
            let key = id.to_string();

            if collection_map.contains_key(&key) || !incoming.insert(key.clone()) {
                return Err(DocumentStoreError::DocumentAlreadyExists(key, collection.to_string()));
            }
        }

        collection_map.extend(
            documents
                .into_iter()
                .map(|(id, doc)| (id.to_string(), doc))
        );

        Ok(())
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        scope: UpdateScope,
        collection: &str,
        _settings: &CollectionSettings,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(DocumentStoreError::CollectionNotFound(collection.to_string())),
        };

        let mut replacements = Vec::with_capacity(documents.len());

        for (id, doc) in documents {
            let key = id.to_string();

            let stored = match collection_map.get(&key) {
                Some(stored) if DocumentEvaluator::matches(stored, scope.filter.as_ref())? => stored,
                _ => return Err(DocumentStoreError::DocumentNotFound(key, collection.to_string())),
            };

            replacements.push((key, retain_fields(doc, stored, &scope.retain)?));
        }

        collection_map.extend(replacements);

        Ok(())
    }

    async fn delete_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
        _settings: &CollectionSettings,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(DocumentStoreError::CollectionNotFound(collection.to_string())),
        };

        for id in ids {
            let key = id.to_string();

            if collection_map.remove(&key).is_none() {
                return Err(DocumentStoreError::DocumentNotFound(key, collection.to_string()));
            }
        }

        Ok(())
    }

    async fn delete_matching(
        &self,
        filter: Option<Expr>,
        collection: &str,
        _settings: &CollectionSettings,
    ) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Ok(0),
        };

        let mut doomed = Vec::new();

        for (key, doc) in collection_map.iter() {
            if DocumentEvaluator::matches(doc, filter.as_ref())? {
                doomed.push(key.clone());
            }
        }

        for key in &doomed {
            collection_map.remove(key);
        }

        tracing::debug!(collection, deleted = doomed.len(), "deleted matching documents");

        Ok(doomed.len() as u64)
    }

    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
        _settings: &CollectionSettings,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut documents = Vec::with_capacity(ids.len());

        for id in ids {
            let key = id.to_string();

            if let Some(doc) = collection_map.get(&key) {
                documents.push(doc.clone());
            }
        }

        Ok(documents)
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
        _settings: &CollectionSettings,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let mut timer = ScopedTimer::start(format!("query {}", collection));

        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut documents = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(
                collection_map.values(),
                filter,
            )?,
            None => collection_map
                .values()
                .cloned()
                .collect::<Vec<_>>(),
        };

        timer.checkpoint(
            &format!("filtered {} of {} documents", documents.len(), collection_map.len()),
            "sort and page",
        )?;

        if let Some(sort) = &query.sort {
            documents.sort_by(|a, b| {
                let left = sort_key(a, &sort.field);
                let right = sort_key(b, &sort.field);

                match sort.direction {
                    SortDirection::Asc => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
                    SortDirection::Desc => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
                }
            });
        }

        Ok(
            documents
                .into_iter()
                .skip(query.offset.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
                .collect()
        )
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
        _settings: &CollectionSettings,
    ) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(0),
        };

        let mut count = 0;

        for doc in collection_map.values() {
            if DocumentEvaluator::matches(doc, filter.as_ref())? {
                count += 1;
            }
        }

        Ok(count)
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(HashMap::new);

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        Ok(
            self.store
                .read()
                .await
                .keys()
                .cloned()
                .collect()
        )
    }

    async fn add_index(&self, _collection: &str, _field: &str, _unique: bool) -> DocumentStoreResult<()> {
        // no-op
        Ok(())
    }

    async fn drop_index(&self, _collection: &str, _field: &str) -> DocumentStoreResult<()> {
        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docview_core::query::{Filter, FindOptions};

    fn animal(name: &str, tag: &str, age: i32) -> (Uuid, Bson) {
        let id = Uuid::new();
        (id, Bson::Document(doc! { "id": id, "name": name, "_t": tag, "age": age }))
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::builder().build().await.unwrap();
        store
            .insert_documents(
                vec![
                    animal("Tom", "Cat", 4),
                    animal("Leo", "Lion", 9),
                    animal("Rex", "Dog", 2),
                ],
                "animals",
                &CollectionSettings::default(),
            )
            .await
            .unwrap();
        store
    }

    fn names(documents: &[Bson]) -> Vec<&str> {
        documents
            .iter()
            .map(|d| d.as_document().unwrap().get_str("name").unwrap())
            .collect()
    }

    #[tokio::test]
    async fn query_filters_then_sorts_then_pages() {
        let store = seeded().await;
        let query = Query::with_options(
            Some(Filter::gte("age", 3)),
            FindOptions::new()
                .sort("age", SortDirection::Desc)
                .offset(1)
                .limit(5),
        );

        let found = store
            .query_documents(query, "animals", &CollectionSettings::default())
            .await
            .unwrap();

        assert_eq!(names(&found), vec!["Tom"]);
    }

    #[tokio::test]
    async fn count_and_delete_respect_the_filter() {
        let store = seeded().await;
        let settings = CollectionSettings::default();
        let felines = || Some(Filter::any_of("_t", vec!["Cat", "Lion"]));

        assert_eq!(store.count_documents(felines(), "animals", &settings).await.unwrap(), 2);
        assert_eq!(store.count_documents(None, "animals", &settings).await.unwrap(), 3);

        assert_eq!(store.delete_matching(felines(), "animals", &settings).await.unwrap(), 2);
        assert_eq!(store.count_documents(None, "animals", &settings).await.unwrap(), 1);
        assert_eq!(store.delete_matching(None, "missing", &settings).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = InMemoryStore::new();
        let settings = CollectionSettings::default();
        let document = animal("Tom", "Cat", 4);

        store
            .insert_documents(vec![document.clone()], "animals", &settings)
            .await
            .unwrap();
        let err = store
            .insert_documents(vec![document], "animals", &settings)
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::DocumentAlreadyExists(_, collection) if collection == "animals"));
    }

    #[tokio::test]
    async fn updating_a_missing_collection_fails() {
        let store = InMemoryStore::new();
        let err = store
            .update_documents(
                vec![animal("Tom", "Cat", 4)],
                UpdateScope::new(),
                "animals",
                &CollectionSettings::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn a_failed_insert_writes_nothing() {
        let store = seeded().await;
        let settings = CollectionSettings::default();
        let fresh = animal("Kit", "Cat", 1);
        let twice = animal("Tib", "Cat", 2);

        let err = store
            .insert_documents(vec![fresh, twice.clone(), twice], "animals", &settings)
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::DocumentAlreadyExists(_, _)));
        assert_eq!(store.count_documents(None, "animals", &settings).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn a_failed_update_writes_nothing() {
        let store = InMemoryStore::new();
        let settings = CollectionSettings::default();
        let (id, tom) = animal("Tom", "Cat", 4);
        store.insert_documents(vec![(id, tom)], "animals", &settings).await.unwrap();

        let renamed = Bson::Document(doc! { "id": id, "name": "Thomas", "_t": "Cat", "age": 4 });
        let err = store
            .update_documents(
                vec![(id, renamed), animal("Ghost", "Cat", 1)],
                UpdateScope::new(),
                "animals",
                &settings,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::DocumentNotFound(_, _)));
        let unchanged = store.get_documents(vec![id], "animals", &settings).await.unwrap();
        assert_eq!(names(&unchanged), vec!["Tom"]);
    }

    #[tokio::test]
    async fn updates_outside_the_scope_are_not_found() {
        let store = InMemoryStore::new();
        let settings = CollectionSettings::default();
        let (id, rex) = animal("Rex", "Dog", 2);
        store.insert_documents(vec![(id, rex)], "animals", &settings).await.unwrap();

        let cats_only = || UpdateScope::new().filter(Some(Filter::eq("_t", "Cat")));
        let err = store
            .update_documents(
                vec![(id, Bson::Document(doc! { "name": "NotRex" }))],
                cats_only(),
                "animals",
                &settings,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::DocumentNotFound(_, _)));

        store
            .update_documents(
                vec![(id, Bson::Document(doc! { "name": "Rexy", "age": 3 }))],
                UpdateScope::new()
                    .filter(Some(Filter::eq("_t", "Dog")))
                    .retain("_t"),
                "animals",
                &settings,
            )
            .await
            .unwrap();

        let stored = store.get_documents(vec![id], "animals", &settings).await.unwrap();
        let stored = stored[0].as_document().unwrap();
        assert_eq!(stored.get_str("name").unwrap(), "Rexy");
        assert_eq!(stored.get_str("_t").unwrap(), "Dog");
    }
}
