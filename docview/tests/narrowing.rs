use docview::{
    bson::{Bson, Document as BsonDocument, Uuid},
    memory::InMemoryStore,
    prelude::*,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Animal {
    id: Uuid,
    name: String,
    age: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Cat {
    id: Uuid,
    name: String,
    age: i32,
    lives: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Lion {
    id: Uuid,
    name: String,
    age: i32,
    lives: i32,
    pride: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Dog {
    id: Uuid,
    name: String,
    age: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Ghost {
    id: Uuid,
}

macro_rules! in_animals {
    ($($ty:ident),*) => {
        $(
            impl Document for $ty {
                fn id(&self) -> &Uuid {
                    &self.id
                }

                fn collection_name() -> &'static str {
                    "animals"
                }
            }
        )*
    };
}

in_animals!(Animal, Cat, Lion, Dog, Ghost);

impl Discriminated for Cat {
    fn discriminator() -> &'static str {
        "Cat"
    }

    fn discriminators() -> Vec<&'static str> {
        vec!["Cat", "Lion"]
    }
}

impl Discriminated for Lion {
    fn discriminator() -> &'static str {
        "Lion"
    }
}

impl Discriminated for Dog {
    fn discriminator() -> &'static str {
        "Dog"
    }
}

impl Discriminated for Ghost {
    fn discriminator_key() -> &'static str {
        " "
    }

    fn discriminator() -> &'static str {
        "Ghost"
    }
}

impl SubtypeOf<Animal> for Cat {}
impl SubtypeOf<Animal> for Lion {}
impl SubtypeOf<Animal> for Dog {}
impl SubtypeOf<Animal> for Ghost {}
impl SubtypeOf<Cat> for Lion {}

fn cat(name: &str, age: i32) -> Cat {
    Cat { id: Uuid::new(), name: name.into(), age, lives: 9 }
}

fn lion(name: &str, age: i32) -> Lion {
    Lion { id: Uuid::new(), name: name.into(), age, lives: 9, pride: "north".into() }
}

fn dog(name: &str, age: i32) -> Dog {
    Dog { id: Uuid::new(), name: name.into(), age }
}

async fn seeded_store() -> DocumentStore<InMemoryStore> {
    let store = DocumentStore::new(InMemoryStore::builder().build().await.unwrap());
    let animals = store.typed_collection::<Animal>();

    animals
        .of_type::<Cat>()
        .unwrap()
        .insert(vec![cat("Tom", 4), cat("Kit", 1)])
        .await
        .unwrap();
    animals
        .of_type::<Lion>()
        .unwrap()
        .insert(vec![lion("Leo", 9)])
        .await
        .unwrap();
    animals
        .of_type::<Dog>()
        .unwrap()
        .insert(vec![dog("Rex", 5)])
        .await
        .unwrap();

    store
}

fn by_name() -> FindOptions {
    FindOptions::new().sort("name", SortDirection::Asc)
}

fn tag(document: &Bson) -> &str {
    document
        .as_document()
        .and_then(|fields| fields.get_str("_t").ok())
        .unwrap_or("")
}

#[tokio::test]
async fn writes_through_a_view_are_tagged() {
    let store = seeded_store().await;

    let stored = store
        .typed_collection::<Animal>()
        .find_documents(None, by_name())
        .await
        .unwrap();

    let tags: Vec<&str> = stored.iter().map(tag).collect();
    assert_eq!(tags, vec!["Cat", "Lion", "Dog", "Cat"]);
}

#[tokio::test]
async fn reads_only_see_the_narrowed_type() {
    let store = seeded_store().await;
    let cats = store
        .typed_collection::<Animal>()
        .of_type::<Cat>()
        .unwrap();

    let names: Vec<String> = cats
        .find(None, by_name())
        .await
        .unwrap()
        .into_iter()
        .map(|cat| cat.name)
        .collect();
    assert_eq!(names, vec!["Kit", "Leo", "Tom"]);

    let grown = cats
        .find(Some(Filter::gte("age", 3)), by_name())
        .await
        .unwrap();
    assert_eq!(grown.len(), 2);

    assert_eq!(cats.count(None).await.unwrap(), 3);
    assert_eq!(cats.count(Some(Filter::lt("age", 2))).await.unwrap(), 1);

    let first = cats
        .find_one(Some(Filter::eq("name", "Tom")))
        .await
        .unwrap();
    assert_eq!(first.map(|cat| cat.age), Some(4));
}

#[tokio::test]
async fn deletes_are_scoped_to_the_narrowed_type() {
    let store = seeded_store().await;
    let animals = store.typed_collection::<Animal>();
    let dogs = animals.of_type::<Dog>().unwrap();

    assert_eq!(dogs.delete_many(None).await.unwrap(), 1);
    assert_eq!(animals.count(None).await.unwrap(), 3);
    assert_eq!(dogs.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn updates_go_through_the_view() {
    let store = seeded_store().await;
    let cats = store
        .typed_collection::<Animal>()
        .of_type::<Cat>()
        .unwrap();

    let mut tom = cats
        .find_one(Some(Filter::eq("name", "Tom")))
        .await
        .unwrap()
        .unwrap();
    tom.lives = 8;
    cats.update(vec![tom.clone()]).await.unwrap();

    let stored = store
        .typed_collection::<Cat>()
        .get(vec![tom.id])
        .await
        .unwrap();
    assert_eq!(stored[0].lives, 8);
    assert_eq!(cats.count(None).await.unwrap(), 3);
}

#[tokio::test]
async fn updates_cannot_reach_documents_outside_the_view() {
    let store = seeded_store().await;
    let animals = store.typed_collection::<Animal>();
    let cats = animals.of_type::<Cat>().unwrap();
    let dogs = animals.of_type::<Dog>().unwrap();

    let rex = dogs.find_one(None).await.unwrap().unwrap();
    let impostor = Cat { id: rex.id, name: "NotRex".into(), age: 1, lives: 9 };

    let err = cats.update(vec![impostor]).await.unwrap_err();
    assert!(matches!(
        err,
        DocumentStoreError::DocumentNotFound(id, collection)
            if id == rex.id.to_string() && collection == "animals"
    ));

    let stored = dogs.find(None, by_name()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Rex");
    assert_eq!(cats.count(None).await.unwrap(), 3);
}

#[tokio::test]
async fn updates_through_a_parent_view_keep_the_stored_tag() {
    let store = seeded_store().await;
    let animals = store.typed_collection::<Animal>();
    let cats = animals.of_type::<Cat>().unwrap();
    let lions = animals.of_type::<Lion>().unwrap();

    let mut leo = cats
        .find_one(Some(Filter::eq("name", "Leo")))
        .await
        .unwrap()
        .unwrap();
    leo.age = 10;
    cats.update(vec![leo.clone()]).await.unwrap();

    assert_eq!(lions.count(None).await.unwrap(), 1);
    assert_eq!(lions.count(Some(Filter::eq("age", 10))).await.unwrap(), 1);

    let stored = animals
        .filtered(Filter::eq("name", "Leo"))
        .find_documents(None, FindOptions::new())
        .await
        .unwrap();
    assert_eq!(tag(&stored[0]), "Lion");
}

#[tokio::test]
async fn updates_through_a_filtered_root_respect_its_filter() {
    let store = seeded_store().await;
    let grown_cats = store
        .typed_collection::<Animal>()
        .filtered(Filter::gte("age", 3))
        .of_type::<Cat>()
        .unwrap();

    let mut kit = store
        .typed_collection::<Animal>()
        .of_type::<Cat>()
        .unwrap()
        .find_one(Some(Filter::eq("name", "Kit")))
        .await
        .unwrap()
        .unwrap();
    kit.lives = 1;

    let err = grown_cats.update(vec![kit]).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::DocumentNotFound(_, _)));
}

#[tokio::test]
async fn narrowing_a_view_starts_again_from_the_root() {
    let store = seeded_store().await;
    let grown = store
        .typed_collection::<Animal>()
        .filtered(Filter::gte("age", 3));

    let cats = grown.of_type::<Cat>().unwrap();
    let lions = cats.of_type::<Lion>().unwrap();

    assert_eq!(
        lions.effective_filter(),
        Some(Filter::and([Filter::gte("age", 3), Lion::type_filter()])),
    );
    assert_eq!(lions.root().filter(), grown.filter());

    let found = lions.find(None, by_name()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].pride, "north");
}

#[tokio::test]
async fn raw_retrieval_is_refused_only_on_narrowed_views() {
    let store = seeded_store().await;
    let animals = store.typed_collection::<Animal>();

    let err = animals
        .of_type::<Cat>()
        .unwrap()
        .find_raw(Some(Filter::eq("name", "Tom")), FindOptions::new().limit(1))
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::NotSupported(_)));

    let raw = animals
        .filtered(Filter::eq("name", "Rex"))
        .find_raw(None, FindOptions::new())
        .await
        .unwrap();
    assert_eq!(raw.len(), 1);

    let decoded = BsonDocument::from_reader(&raw[0][..]).unwrap();
    assert_eq!(decoded.get_str("_t").unwrap(), "Dog");
}

#[tokio::test]
async fn reconfigured_views_keep_root_and_filter() {
    let store = seeded_store().await;
    let cats = store
        .typed_collection::<Animal>()
        .of_type::<Cat>()
        .unwrap();

    let majority = cats.with_read_concern(ReadConcern::Majority);
    let secondary = majority.with_read_preference(ReadPreference::Secondary);
    let journaled = secondary.with_write_concern(WriteConcern::majority().with_journal(true));

    for view in [&majority, &secondary, &journaled] {
        assert_eq!(view.filter(), cats.filter());
        assert_eq!(view.root().settings(), cats.root().settings());
        assert!(std::ptr::eq(view.root().backend(), cats.root().backend()));
    }

    assert_eq!(cats.settings(), &CollectionSettings::default());
    assert_eq!(majority.settings().read_preference, None);
    assert_eq!(
        journaled.settings(),
        &CollectionSettings::new()
            .with_read_concern(ReadConcern::Majority)
            .with_read_preference(ReadPreference::Secondary)
            .with_write_concern(WriteConcern::majority().with_journal(true)),
    );

    assert_eq!(journaled.count(None).await.unwrap(), 3);
}

#[tokio::test]
async fn views_inherit_store_settings_loaded_from_json() {
    let settings: CollectionSettings =
        serde_json::from_str(r#"{ "read_concern": "majority", "read_preference": "nearest" }"#).unwrap();
    let store = DocumentStore::new(InMemoryStore::new()).with_settings(settings.clone());

    let cats = store
        .typed_collection::<Animal>()
        .of_type::<Cat>()
        .unwrap();

    assert_eq!(cats.settings(), &settings);
    assert_eq!(cats.root().settings(), &settings);
}

#[tokio::test]
async fn foreign_documents_behind_a_loose_filter_are_a_type_mismatch() {
    let store = seeded_store().await;
    let animals = store.typed_collection::<Animal>();

    let loose = OfTypeCollection::narrow(
        animals.clone(),
        animals.retype::<Cat>(),
        Filter::gte("age", 3),
    )
    .unwrap();

    let err = loose.find(None, by_name()).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::TypeMismatch(expected, _) if expected == "Cat"));
}

#[tokio::test]
async fn types_without_a_usable_discriminator_cannot_be_narrowed_to() {
    let store = DocumentStore::new(InMemoryStore::new());

    let err = store
        .typed_collection::<Animal>()
        .of_type::<Ghost>()
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::TypeMismatch(_, _)));
}

#[tokio::test]
async fn backend_errors_pass_through_unchanged() {
    let store = seeded_store().await;
    let cats = store
        .typed_collection::<Animal>()
        .of_type::<Cat>()
        .unwrap();

    let tom = cats
        .find_one(Some(Filter::eq("name", "Tom")))
        .await
        .unwrap()
        .unwrap();

    let err = cats.insert(vec![tom.clone()]).await.unwrap_err();
    assert!(matches!(
        err,
        DocumentStoreError::DocumentAlreadyExists(id, collection)
            if id == tom.id.to_string() && collection == "animals"
    ));
}
