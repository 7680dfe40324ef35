//! Elasticsearch integration tests
//!
//! These need a running cluster. Start one and run:
//! ES_URL=http://localhost:9200 cargo test -p geoconnect-search -- --ignored

use geoconnect_core::{
    BoundingBox, Credential, CredentialStore, GeoError, Location, Post, PostStore, SearchConfig,
};
use geoconnect_search::{ensure_indices, ElasticClient, EsCredentialStore, EsPostStore};
use std::sync::Arc;

fn test_config() -> SearchConfig {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    SearchConfig {
        url: std::env::var("ES_URL").unwrap_or_else(|_| "http://localhost:9200".to_string()),
        posts_index: format!("posts_test_{suffix}"),
        users_index: format!("users_test_{suffix}"),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore = "requires elasticsearch"]
async fn test_credential_roundtrip_and_conflict() {
    let config = test_config();
    let client = Arc::new(ElasticClient::new(&config).unwrap());
    ensure_indices(&client, &config).await.unwrap();

    let store = EsCredentialStore::new(client.clone(), &config.users_index);
    let credential = Credential {
        username: "carol".to_string(),
        password_hash: "digest".to_string(),
        age: 30,
        gender: "f".to_string(),
    };

    store.create(&credential).await.unwrap();
    assert!(matches!(
        store.create(&credential).await,
        Err(GeoError::Conflict(_))
    ));
    assert_eq!(
        store.get_by_username("carol").await.unwrap(),
        Some(credential)
    );
    assert!(store.get_by_username("dave").await.unwrap().is_none());
    assert!(store.delete("carol").await.unwrap());
}

#[tokio::test]
#[ignore = "requires elasticsearch"]
async fn test_geo_searches() {
    let config = test_config();
    let client = Arc::new(ElasticClient::new(&config).unwrap());
    ensure_indices(&client, &config).await.unwrap();

    let store = EsPostStore::new(client, &config.posts_index);
    let sf = Post::new("alice", "golden gate", Location::new(37.8199, -122.4783));
    let nyc = Post::new("bob", "times square", Location::new(40.758, -73.9855));
    store.create(&sf).await.unwrap();
    store.create(&nyc).await.unwrap();

    let near_sf = store
        .search_radius(Location::new(37.7749, -122.4194), 50.0, 10)
        .await
        .unwrap();
    assert_eq!(near_sf.len(), 1);
    assert_eq!(near_sf[0].id, sf.id);

    let east = BoundingBox::new(Location::new(45.0, -80.0), Location::new(35.0, -70.0)).unwrap();
    let in_box = store.search_area(east, 10).await.unwrap();
    assert_eq!(in_box.len(), 1);
    assert_eq!(in_box[0].user, "bob");

    assert!(store.delete(&sf.id).await.unwrap());
    assert!(store.get(&sf.id).await.unwrap().is_none());
}
