use super::*;
use serde_json::json;
use tempfile::TempDir;

const DIM: usize = 4;

fn record(id: &str, vector: [f32; DIM], document: &str, metadata: Option<Metadata>) -> CollectionRecord {
    CollectionRecord {
        id: id.to_string(),
        vector: vector.to_vec(),
        document: document.to_string(),
        metadata,
    }
}

fn page_metadata(page: u32) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), json!("sikkim.txt"));
    metadata.insert("page".to_string(), json!(page));
    metadata
}

async fn open_collection(temp_dir: &TempDir) -> Collection {
    VectorStore::open(temp_dir.path())
        .await
        .expect("should open vector store")
        .get_or_create_collection("Sikkim", DIM)
        .await
        .expect("should create collection")
}

#[tokio::test]
async fn creates_missing_collection() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::open(temp_dir.path())
        .await
        .expect("should open vector store");

    assert!(
        store
            .collection_names()
            .await
            .expect("should list collections")
            .is_empty()
    );

    let collection = store
        .get_or_create_collection("Sikkim", DIM)
        .await
        .expect("should create collection");
    assert_eq!(collection.name(), "Sikkim");
    assert_eq!(collection.dimension(), DIM);
    assert_eq!(collection.count().await.expect("should count rows"), 0);
    assert_eq!(
        store
            .collection_names()
            .await
            .expect("should list collections"),
        vec!["Sikkim".to_string()]
    );
}

#[tokio::test]
async fn reopening_keeps_existing_dimension() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let collection = open_collection(&temp_dir).await;
    collection
        .add(&[record("a", [1.0, 0.0, 0.0, 0.0], "alpha", None)])
        .await
        .expect("should store record");

    let reopened = VectorStore::open(temp_dir.path())
        .await
        .expect("should reopen store")
        .get_or_create_collection("Sikkim", 768)
        .await
        .expect("should open existing collection");

    assert_eq!(reopened.dimension(), DIM);
    assert_eq!(reopened.count().await.expect("should count rows"), 1);
}

#[tokio::test]
async fn query_returns_nearest_first() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let collection = open_collection(&temp_dir).await;

    collection
        .add(&[
            record("rumtek", [1.0, 0.0, 0.0, 0.0], "Rumtek Monastery", Some(page_metadata(1))),
            record("pemayangtse", [0.0, 1.0, 0.0, 0.0], "Pemayangtse Monastery", None),
            record("tsomgo", [0.0, 0.0, 1.0, 0.0], "Tsomgo Lake", Some(page_metadata(7))),
        ])
        .await
        .expect("should store records");

    let hits = collection
        .query(&[0.9, 0.1, 0.0, 0.0], 2)
        .await
        .expect("query should succeed");

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "rumtek");
    assert_eq!(hits[0].document, "Rumtek Monastery");
    assert_eq!(hits[0].metadata, Some(page_metadata(1)));
    assert_eq!(hits[1].id, "pemayangtse");
    assert_eq!(hits[1].metadata, None);
    assert!(hits[0].distance <= hits[1].distance);
}

#[tokio::test]
async fn query_on_empty_collection_returns_nothing() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let collection = open_collection(&temp_dir).await;

    let hits = collection
        .query(&[0.0, 0.0, 0.0, 1.0], 3)
        .await
        .expect("query should succeed");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn zero_k_returns_nothing() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let collection = open_collection(&temp_dir).await;
    collection
        .add(&[record("a", [1.0, 0.0, 0.0, 0.0], "alpha", None)])
        .await
        .expect("should store record");

    let hits = collection
        .query(&[1.0, 0.0, 0.0, 0.0], 0)
        .await
        .expect("query should succeed");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn adding_same_id_replaces_row() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let collection = open_collection(&temp_dir).await;

    collection
        .add(&[record("page-0", [1.0, 0.0, 0.0, 0.0], "old text", None)])
        .await
        .expect("should store record");
    collection
        .add(&[record("page-0", [1.0, 0.0, 0.0, 0.0], "new text", None)])
        .await
        .expect("should replace record");

    assert_eq!(collection.count().await.expect("should count rows"), 1);
    let hits = collection
        .query(&[1.0, 0.0, 0.0, 0.0], 1)
        .await
        .expect("query should succeed");
    assert_eq!(hits[0].document, "new text");
}

#[tokio::test]
async fn wrong_dimension_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let collection = open_collection(&temp_dir).await;

    let bad = CollectionRecord {
        id: "bad".to_string(),
        vector: vec![1.0, 2.0],
        document: "too short".to_string(),
        metadata: None,
    };
    assert!(matches!(
        collection.add(&[bad]).await,
        Err(Error::VectorStore(_))
    ));
    assert!(matches!(
        collection.query(&[1.0, 2.0], 3).await,
        Err(Error::VectorStore(_))
    ));
}

#[tokio::test]
async fn open_creates_nested_directories() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let nested = temp_dir.path().join("data").join("Sikkim_db");

    VectorStore::open(&nested)
        .await
        .expect("should open vector store");

    assert!(nested.is_dir());
}

#[tokio::test]
async fn open_collection_does_not_create() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::open(temp_dir.path())
        .await
        .expect("should open vector store");

    assert!(
        store
            .open_collection("Sikkim")
            .await
            .expect("lookup should succeed")
            .is_none()
    );
    assert!(
        store
            .collection_names()
            .await
            .expect("should list collections")
            .is_empty()
    );

    open_collection(&temp_dir).await;
    let opened = store
        .open_collection("Sikkim")
        .await
        .expect("lookup should succeed")
        .expect("collection should exist");
    assert_eq!(opened.dimension(), DIM);
}
