//! Post service layer
//!
//! Creation, geo search and deletion of posts. The author of a post is
//! always the verified caller; deletion goes through the ownership policy.
//!
//! Author: hephaex@gmail.com

use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::auth::{can_delete, Identity};
use crate::error::AppError;
use geoconnect_blob::{content_type_for, object_name_for};
use geoconnect_core::{BlobStore, BoundingBox, Location, Post, PostConfig, PostStore};
use std::sync::Arc;

/// Image attached to a multipart post
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Client-supplied content of a new post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub message: String,
    pub location: Location,
    pub url: Option<String>,
    pub image: Option<ImageUpload>,
}

pub struct PostService {
    store: Arc<dyn PostStore>,
    blobs: Arc<dyn BlobStore>,
    config: PostConfig,
    filtered_words: Vec<String>,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>, blobs: Arc<dyn BlobStore>, config: PostConfig) -> Self {
        let filtered_words = config
            .filtered_words
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            store,
            blobs,
            config,
            filtered_words,
        }
    }

    /// Whether a message contains a filtered word (case-insensitive substring)
    pub fn is_filtered(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.filtered_words.iter().any(|w| message.contains(w))
    }

    /// Create a post authored by `author`
    pub async fn create(&self, author: &Identity, draft: NewPost) -> Result<Post, AppError> {
        draft.location.validate()?;
        if self.is_filtered(&draft.message) {
            tracing::info!(user = %author.username, "Post rejected by content filter");
            return Err(AppError::BadRequest(
                "message contains filtered content".to_string(),
            ));
        }

        let mut post = Post::new(author.username.as_str(), draft.message, draft.location);
        let mut uploaded = None;

        if let Some(image) = draft.image {
            let object_name = object_name_for(&image.filename);
            let url = self
                .blobs
                .put(&object_name, content_type_for(&image.filename), image.data)
                .await?;
            post = post.with_url(url);
            uploaded = Some(object_name);
        } else if let Some(url) = draft.url.filter(|u| !u.trim().is_empty()) {
            post = post.with_url(url);
        }

        if let Err(e) = self.store.create(&post).await {
            if let Some(object) = &uploaded {
                tracing::warn!(
                    object = %object,
                    id = %post.id,
                    "Post write failed after image upload; object is orphaned"
                );
            }
            return Err(e.into());
        }
        tracing::info!(id = %post.id, user = %post.user, "Post created");
        Ok(post)
    }

    /// Posts within `range_km` of `center`, nearest first
    pub async fn search_radius(
        &self,
        center: Location,
        range_km: Option<f64>,
    ) -> Result<Vec<Post>, AppError> {
        center.validate()?;
        let range_km = range_km.unwrap_or(self.config.default_range_km);
        if !range_km.is_finite() || range_km <= 0.0 {
            return Err(AppError::BadRequest(
                "range must be a positive number of kilometers".to_string(),
            ));
        }

        let posts = self
            .store
            .search_radius(center, range_km, self.config.search_limit)
            .await?;
        tracing::debug!(
            lat = center.lat,
            lon = center.lon,
            range_km,
            hits = posts.len(),
            "Radius search"
        );
        Ok(posts)
    }

    /// Posts inside a bounding box
    pub async fn search_area(&self, area: BoundingBox) -> Result<Vec<Post>, AppError> {
        let posts = self
            .store
            .search_area(area, self.config.search_limit)
            .await?;
        tracing::debug!(hits = posts.len(), "Area search");
        Ok(posts)
    }

    /// Delete a post if `caller` owns it or is an admin
    pub async fn delete(
        &self,
        caller: &Identity,
        id: &str,
        client: &ClientInfo,
    ) -> Result<(), AppError> {
        let post = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;

        if !can_delete(&post.user, caller) {
            audit_log(&AuditEvent::AccessDenied {
                username: caller.username.clone(),
                resource: format!("post:{id}"),
                owner: post.user.clone(),
                ip_address: client.ip_address.clone(),
            });
            return Err(AppError::Forbidden(
                "only the author or an admin may delete this post".to_string(),
            ));
        }

        if !self.store.delete(id).await? {
            return Err(AppError::NotFound(format!("post {id}")));
        }

        audit_log(&AuditEvent::PostDeleted {
            username: caller.username.clone(),
            post_id: id.to_string(),
            as_admin: caller.username != post.user,
            owner: post.user,
            ip_address: client.ip_address.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoconnect_core::memory::{InMemoryBlobStore, InMemoryPostStore};

    fn service() -> (PostService, Arc<InMemoryPostStore>, Arc<InMemoryBlobStore>) {
        let store = Arc::new(InMemoryPostStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let service = PostService::new(store.clone(), blobs.clone(), PostConfig::default());
        (service, store, blobs)
    }

    fn draft(message: &str) -> NewPost {
        NewPost {
            message: message.to_string(),
            location: Location::new(37.77, -122.42),
            url: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_create_uses_caller_as_author() {
        let (service, store, _) = service();
        let post = service
            .create(&Identity::new("carol", false), draft("hello"))
            .await
            .unwrap();

        let stored = store.get(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.user, "carol");
        assert_eq!(stored.message, "hello");
    }

    #[tokio::test]
    async fn test_content_filter() {
        let (service, store, _) = service();
        let err = service
            .create(&Identity::new("carol", false), draft("Cheap ADVERTISEMENT here"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        let nearby = store
            .search_radius(Location::new(37.77, -122.42), 10.0, 10)
            .await
            .unwrap();
        assert!(nearby.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_location_rejected() {
        let (service, _, _) = service();
        let mut bad = draft("hi");
        bad.location = Location::new(95.0, 0.0);

        let err = service
            .create(&Identity::new("carol", false), bad)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_image_upload_sets_url() {
        let (service, _, blobs) = service();
        let mut with_image = draft("look");
        with_image.image = Some(ImageUpload {
            filename: "Sunset.PNG".to_string(),
            data: vec![1, 2, 3],
        });

        let post = service
            .create(&Identity::new("carol", false), with_image)
            .await
            .unwrap();
        let url = post.url.unwrap();
        assert!(url.ends_with(".png"));

        let object = url.trim_start_matches("memory://");
        let (content_type, data) = blobs.object(object).await.unwrap();
        assert_eq!(content_type, "image/png");
        assert_eq!(data, vec![1, 2, 3]);
    }

    /// Post store whose writes always fail
    struct DownPostStore;

    #[axum::async_trait]
    impl PostStore for DownPostStore {
        async fn create(&self, _post: &Post) -> geoconnect_core::Result<()> {
            Err(geoconnect_core::GeoError::StorageError("index unavailable".into()))
        }

        async fn get(&self, _id: &str) -> geoconnect_core::Result<Option<Post>> {
            Ok(None)
        }

        async fn delete(&self, _id: &str) -> geoconnect_core::Result<bool> {
            Ok(false)
        }

        async fn search_radius(
            &self,
            _center: Location,
            _radius_km: f64,
            _limit: usize,
        ) -> geoconnect_core::Result<Vec<Post>> {
            Ok(vec![])
        }

        async fn search_area(
            &self,
            _area: BoundingBox,
            _limit: usize,
        ) -> geoconnect_core::Result<Vec<Post>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_store_failure_after_upload() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let service =
            PostService::new(Arc::new(DownPostStore), blobs.clone(), PostConfig::default());

        let mut with_image = draft("look");
        with_image.image = Some(ImageUpload {
            filename: "view.jpg".to_string(),
            data: vec![1, 2, 3],
        });

        let err = service
            .create(&Identity::new("carol", false), with_image)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(blobs.len().await, 1);
    }

    #[tokio::test]
    async fn test_search_radius_default_and_invalid_range() {
        let (service, _, _) = service();
        let carol = Identity::new("carol", false);
        service.create(&carol, draft("sf")).await.unwrap();

        // Oakland is ~13km away
        let hits = service
            .search_radius(Location::new(37.80, -122.27), None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let hits = service
            .search_radius(Location::new(37.80, -122.27), Some(5.0))
            .await
            .unwrap();
        assert!(hits.is_empty());

        for range in [0.0, -3.0, f64::NAN] {
            assert!(matches!(
                service
                    .search_radius(Location::new(0.0, 0.0), Some(range))
                    .await,
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_delete_policy() {
        let (service, store, _) = service();
        let alice = Identity::new("alice", false);
        let client = ClientInfo::default();

        let first = service.create(&alice, draft("one")).await.unwrap();
        let second = service.create(&alice, draft("two")).await.unwrap();

        let err = service
            .delete(&Identity::new("bob", false), &first.id, &client)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(store.get(&first.id).await.unwrap().is_some());

        service.delete(&alice, &first.id, &client).await.unwrap();
        assert!(store.get(&first.id).await.unwrap().is_none());

        service
            .delete(&Identity::new("root", true), &second.id, &client)
            .await
            .unwrap();
        assert!(store.get(&second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_post() {
        let (service, _, _) = service();
        let err = service
            .delete(&Identity::new("root", true), "nope", &ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
