//! Integration tests against a real MongoDB server
//!
//! Each test starts its own container, so they need Docker:
//! `cargo test -p domain_inventory -- --ignored`

use domain_inventory::{
    GridFsImageStore, ImageStore, InventoryError, InventoryService, ItemRecord, MongoRecordStore,
    RecordFields, RecordStore, WriteMode,
};
use mongodb::bson::{Document, doc};
use test_utils::{TestDataBuilder, TestMongo};

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_add_and_decrement_round_trip() {
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("mongo_round_trip");
    let db = mongo.database(&builder.database_name());

    let service = InventoryService::new(
        MongoRecordStore::new(&db),
        GridFsImageStore::new(&db, "http://localhost:8080/api"),
    );

    let snapshot = service.add("apple", 3, None).await.unwrap();
    assert_eq!(snapshot.items(), &[ItemRecord::new("apple", 3)]);

    let snapshot = service.add("apple", 2, Some("u".into())).await.unwrap();
    assert_eq!(
        snapshot.items(),
        &[ItemRecord::new("apple", 5).with_image_url("u")]
    );

    for _ in 0..4 {
        service.decrement("apple").await.unwrap();
    }
    let snapshot = service.snapshot().await;
    assert_eq!(
        snapshot.items(),
        &[ItemRecord::new("apple", 1).with_image_url("u")]
    );

    let snapshot = service.decrement("apple").await.unwrap();
    assert!(snapshot.is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_merge_and_overwrite_semantics() {
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("mongo_write_modes");
    let db = mongo.database(&builder.database_name());
    let store = MongoRecordStore::new(&db);

    store
        .put(
            "pear",
            RecordFields {
                quantity: Some(2),
                image_url: Some("first".into()),
            },
            WriteMode::Overwrite,
        )
        .await
        .unwrap();

    store
        .put(
            "pear",
            RecordFields {
                quantity: Some(4),
                image_url: None,
            },
            WriteMode::Merge,
        )
        .await
        .unwrap();
    assert_eq!(
        store.get("pear").await.unwrap(),
        Some(ItemRecord::new("pear", 4).with_image_url("first"))
    );

    store
        .put(
            "pear",
            RecordFields {
                quantity: Some(1),
                image_url: None,
            },
            WriteMode::Overwrite,
        )
        .await
        .unwrap();
    assert_eq!(
        store.get("pear").await.unwrap(),
        Some(ItemRecord::new("pear", 1))
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_list_skips_malformed_documents() {
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("mongo_malformed");
    let db = mongo.database(&builder.database_name());
    let store = MongoRecordStore::new(&db);

    store
        .collection()
        .insert_many([
            doc! { "_id": "apple", "quantity": 2 },
            doc! { "_id": "ghost" },
            doc! { "_id": "text", "quantity": "three" },
        ])
        .await
        .unwrap();

    let records = store.list_all().await.unwrap();
    assert_eq!(records, vec![ItemRecord::new("apple", 2)]);

    assert!(matches!(
        store.get("ghost").await,
        Err(InventoryError::MalformedRecord { .. })
    ));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_gridfs_latest_upload_wins() {
    let mongo = TestMongo::new().await;
    let builder = TestDataBuilder::from_test_name("mongo_gridfs");
    let db = mongo.database(&builder.database_name());
    let images = GridFsImageStore::new(&db, "http://localhost:8080/api");
    let key = format!("images/{}", builder.file_name("apple", "png"));
    let missing = format!("images/{}", builder.file_name("pear", "png"));

    let first = images
        .upload(&key, vec![1, 2, 3], Some("image/png".into()))
        .await
        .unwrap();
    let second = images.upload(&key, vec![9], None).await.unwrap();

    assert_eq!(first, format!("http://localhost:8080/api/{key}"));
    assert_eq!(first, second);

    let stored = images.fetch(&key).await.unwrap().unwrap();
    assert_eq!(stored.bytes, vec![9]);
    assert!(stored.content_type.is_none());

    assert!(images.fetch(&missing).await.unwrap().is_none());

    let files = db
        .collection::<Document>("images.files")
        .count_documents(doc! {})
        .await
        .unwrap();
    assert_eq!(files, 2);
}
