use async_trait::async_trait;
use futures::{stream::iter, StreamExt, TryStreamExt};
use bson::{Document, Bson, Uuid, doc};
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    options::{ClientOptions, FindOptions, IndexOptions},
};
use docview_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query, SortDirection, UpdateScope},
    settings::CollectionSettings,
};

use crate::{options::collection_options, query::MongoQueryTranslator, sanitizer::KeySanitizer};

fn backend_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

/// Selects the stored document `id`, provided it also matches `within`.
fn scoped_filter(id: &Uuid, within: &Document) -> Document {
    if within.is_empty() {
        doc! { "_id": *id }
    } else {
        doc! { "$and": [{ "_id": *id }, within.clone()] }
    }
}

/// Copies the `retain` fields a replacement leaves out from the stored document.
///
/// The returned filter also requires each copied field to still hold its stored value, so
/// a concurrent change to it makes the replacement miss instead of overwriting it.
fn retain_fields(
    filter: Document,
    replacement: &mut Document,
    stored: &Document,
    retain: &[String],
) -> Document {
    let mut pinned = Vec::new();

    for field in retain {
        if replacement.contains_key(field) {
            continue;
        }

        if let Some(value) = stored.get(field) {
            replacement.insert(field.clone(), value.clone());
            pinned.push(doc! { field.clone(): { "$eq": value.clone() } });
        }
    }

    if pinned.is_empty() {
        filter
    } else {
        pinned.insert(0, filter);
        doc! { "$and": pinned }
    }
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    /// Opens a collection handle carrying the caller's read and write policies.
    fn get_collection(
        &self,
        collection_name: &str,
        settings: &CollectionSettings,
    ) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection_with_options(
                &KeySanitizer::sanitize_string(collection_name),
                collection_options(settings),
            )
    }

    fn admin_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.get_collection(collection_name, &CollectionSettings::default())
    }

    fn prepare_document(&self, id: &Uuid, document: &Bson) -> DocumentStoreResult<Document> {
        Ok(Document::from_iter(
            KeySanitizer::sanitize_value(document)
                .as_document()
                .cloned()
                .ok_or_else(|| DocumentStoreError::InvalidDocument("Expected document".into()))?
                .into_iter()
                .chain(vec![("_id".to_string(), id.into())].into_iter()),
        ))
    }

    fn restore_document(&self, document: Document) -> Bson {
        KeySanitizer::restore_value(&Bson::Document(
            document
                .into_iter()
                .filter(|(k, _)| k != "_id")
                .collect(),
        ))
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        self.get_collection(collection, settings)
            .insert_many(
                documents
                    .iter()
                    .map(|(id, doc)| self.prepare_document(id, doc))
                    .collect::<DocumentStoreResult<Vec<Document>>>()?,
            )
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        scope: UpdateScope,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<()> {
        let target = self.get_collection(collection, settings);
        let within = MongoQueryTranslator::translate(scope.filter.as_ref())?;
        let retain = scope
            .retain
            .iter()
            .map(|field| KeySanitizer::sanitize_string(field))
            .collect::<Vec<_>>();

        iter(documents)
            .then(async |(id, doc)| {
                let not_found = || DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string());

                let mut filter = scoped_filter(&id, &within);
                let mut replacement = self.prepare_document(&id, &doc)?;

                if retain.iter().any(|field| !replacement.contains_key(field)) {
                    let stored = target
                        .find_one(filter.clone())
                        .await
                        .map_err(backend_error)?
                        .ok_or_else(not_found)?;

                    filter = retain_fields(filter, &mut replacement, &stored, &retain);
                }

                let result = target
                    .replace_one(filter, replacement)
                    .await
                    .map_err(backend_error)?;

                if result.matched_count == 0 {
                    return Err(not_found());
                }

                Ok(())
            })
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }

    async fn delete_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<()> {
        self.get_collection(collection, settings)
            .delete_many(doc! { "_id": { "$in": ids } })
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn delete_matching(
        &self,
        filter: Option<Expr>,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<u64> {
        let result = self.get_collection(collection, settings)
            .delete_many(MongoQueryTranslator::translate(filter.as_ref())?)
            .await
            .map_err(backend_error)?;

        tracing::debug!(collection, deleted = result.deleted_count, "deleted matching documents");

        Ok(result.deleted_count)
    }

    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<Vec<Bson>> {
        Ok(
            self.get_collection(collection, settings)
                .find(doc! { "_id": { "$in": ids } })
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(|doc| self.restore_document(doc))
                .collect()
        )
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(doc! {
                sort.field.clone(): match sort.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                }
            })
        }

        let filter = MongoQueryTranslator::translate(query.filter.as_ref())?;
        tracing::trace!(collection, filter = %filter, "querying documents");

        Ok(
            self.get_collection(collection, settings)
                .find(filter)
                .with_options(options)
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(|doc| self.restore_document(doc))
                .collect()
        )
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
        settings: &CollectionSettings,
    ) -> DocumentStoreResult<u64> {
        self.get_collection(collection, settings)
            .count_documents(MongoQueryTranslator::translate(filter.as_ref())?)
            .await
            .map_err(backend_error)
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.client
            .database(&self.database)
            .create_collection(&KeySanitizer::sanitize_string(name))
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.admin_collection(name)
            .drop()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        Ok(
            self.client
                .database(&self.database)
                .list_collection_names()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(|name| KeySanitizer::restore_string(&name))
                .collect()
        )
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        self.admin_collection(collection)
            .create_index(
                IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(
                    IndexOptions::builder()
                    .name(field.to_string())
                    .unique(unique)
                    .build()
                )
                .build()
            )
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        self.admin_collection(collection)
            .drop_index(field)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        tracing::debug!(database = %self.database, "connecting to mongodb");

        Ok(MongoDbStore::new(
            Client::with_options(options)
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscoped_updates_select_by_id_only() {
        let id = Uuid::new();

        assert_eq!(scoped_filter(&id, &doc! {}), doc! { "_id": id });
        assert_eq!(
            scoped_filter(&id, &doc! { "_t": { "$in": ["Cat", "Lion"] } }),
            doc! { "$and": [{ "_id": id }, { "_t": { "$in": ["Cat", "Lion"] } }] },
        );
    }

    #[test]
    fn retained_fields_are_copied_and_pinned() {
        let id = Uuid::new();
        let mut replacement = doc! { "_id": id, "name": "Leo", "age": 10 };
        let stored = doc! { "_id": id, "name": "Leo", "age": 9, "_t": "Lion" };

        let filter = retain_fields(doc! { "_id": id }, &mut replacement, &stored, &["_t".to_string()]);

        assert_eq!(replacement.get_str("_t").unwrap(), "Lion");
        assert_eq!(
            filter,
            doc! { "$and": [{ "_id": id }, { "_t": { "$eq": "Lion" } }] },
        );
    }

    #[test]
    fn fields_the_replacement_carries_are_left_alone() {
        let id = Uuid::new();
        let mut replacement = doc! { "_id": id, "_t": "Cat" };
        let stored = doc! { "_id": id, "_t": "Lion" };

        let filter = retain_fields(doc! { "_id": id }, &mut replacement, &stored, &["_t".to_string()]);

        assert_eq!(replacement.get_str("_t").unwrap(), "Cat");
        assert_eq!(filter, doc! { "_id": id });
    }
}
