//! In-memory collaborators
//!
//! Process-local implementations of the store traits, used by tests and for
//! running the server without a search cluster or bucket.

use crate::{
    BlobStore, BoundingBox, Credential, CredentialStore, GeoError, Location, Post, PostStore,
    Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Credential store backed by a map keyed by username
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<Credential>> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn create(&self, credential: &Credential) -> Result<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&credential.username) {
            return Err(GeoError::Conflict(format!(
                "user {} already exists",
                credential.username
            )));
        }
        users.insert(credential.username.clone(), credential.clone());
        Ok(())
    }

    async fn delete(&self, username: &str) -> Result<bool> {
        Ok(self.users.write().await.remove(username).is_some())
    }
}

/// Post store with linear-scan geo filtering
#[derive(Default)]
pub struct InMemoryPostStore {
    posts: RwLock<HashMap<String, Post>>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn create(&self, post: &Post) -> Result<()> {
        self.posts
            .write()
            .await
            .insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Post>> {
        Ok(self.posts.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.posts.write().await.remove(id).is_some())
    }

    async fn search_radius(
        &self,
        center: Location,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Post>> {
        let posts = self.posts.read().await;
        let mut hits: Vec<(f64, Post)> = posts
            .values()
            .map(|p| (center.distance_km(&p.location), p))
            .filter(|(d, _)| *d <= radius_km)
            .map(|(d, p)| (d, p.clone()))
            .collect();

        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(hits.into_iter().take(limit).map(|(_, p)| p).collect())
    }

    async fn search_area(&self, area: BoundingBox, limit: usize) -> Result<Vec<Post>> {
        let posts = self.posts.read().await;
        let mut hits: Vec<Post> = posts
            .values()
            .filter(|p| area.contains(&p.location))
            .cloned()
            .collect();

        hits.sort_by(|a, b| a.id.cmp(&b.id));
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Blob store that keeps objects in memory and hands out `memory://` URLs
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<String, (String, Vec<u8>)>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Content type and bytes of a stored object
    pub async fn object(&self, name: &str) -> Option<(String, Vec<u8>)> {
        self.objects.read().await.get(name).cloned()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, object_name: &str, content_type: &str, data: Vec<u8>) -> Result<String> {
        self.objects
            .write()
            .await
            .insert(object_name.to_string(), (content_type.to_string(), data));
        Ok(format!("memory://{object_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(name: &str) -> Credential {
        Credential {
            username: name.to_string(),
            password_hash: "hash".to_string(),
            age: 20,
            gender: "f".to_string(),
        }
    }

    #[tokio::test]
    async fn test_credential_create_is_create_only() {
        let store = InMemoryCredentialStore::new();
        store.create(&credential("alice")).await.unwrap();

        let err = store.create(&credential("alice")).await.unwrap_err();
        assert!(matches!(err, GeoError::Conflict(_)));
        assert_eq!(store.len().await, 1);

        assert!(store.get_by_username("alice").await.unwrap().is_some());
        assert!(store.get_by_username("bob").await.unwrap().is_none());

        assert!(store.delete("alice").await.unwrap());
        assert!(!store.delete("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_radius_search_orders_by_distance() {
        let store = InMemoryPostStore::new();
        let sf = Post::new("a", "sf", Location::new(37.7749, -122.4194));
        let oakland = Post::new("b", "oak", Location::new(37.8044, -122.2712));
        let nyc = Post::new("c", "nyc", Location::new(40.7128, -74.0060));
        for p in [&nyc, &oakland, &sf] {
            store.create(p).await.unwrap();
        }

        let hits = store
            .search_radius(Location::new(37.7749, -122.4194), 200.0, 10)
            .await
            .unwrap();
        let messages: Vec<_> = hits.iter().map(|p| p.message.as_str()).collect();
        assert_eq!(messages, vec!["sf", "oak"]);

        let limited = store
            .search_radius(Location::new(37.7749, -122.4194), 10_000.0, 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_area_search() {
        let store = InMemoryPostStore::new();
        store
            .create(&Post::new("a", "inside", Location::new(35.0, -120.0)))
            .await
            .unwrap();
        store
            .create(&Post::new("a", "outside", Location::new(50.0, -120.0)))
            .await
            .unwrap();

        let area =
            BoundingBox::new(Location::new(40.0, -125.0), Location::new(30.0, -115.0)).unwrap();
        let hits = store.search_area(area, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message, "inside");
    }

    #[tokio::test]
    async fn test_blob_put() {
        let store = InMemoryBlobStore::new();
        let url = store
            .put("abc.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(url, "memory://abc.png");
        assert_eq!(
            store.object("abc.png").await,
            Some(("image/png".to_string(), vec![1, 2, 3]))
        );
    }
}
