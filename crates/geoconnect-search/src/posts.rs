//! Post store on the posts index

use crate::query::{geo_bounding_box_query, geo_distance_query};
use crate::{ElasticClient, Hit};
use async_trait::async_trait;
use geoconnect_core::{BoundingBox, Location, Post, PostStore, Result};
use std::sync::Arc;

pub struct EsPostStore {
    client: Arc<ElasticClient>,
    index: String,
}

impl EsPostStore {
    pub fn new(client: Arc<ElasticClient>, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
        }
    }
}

fn into_post(hit: Hit<Post>) -> Post {
    Post {
        id: hit.id,
        ..hit.source
    }
}

#[async_trait]
impl PostStore for EsPostStore {
    async fn create(&self, post: &Post) -> Result<()> {
        self.client
            .index_document(&self.index, &post.id, post)
            .await?;
        tracing::debug!(index = %self.index, id = %post.id, "Post indexed");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Post>> {
        let post = self.client.get_source::<Post>(&self.index, id).await?;
        Ok(post.map(|p| Post {
            id: id.to_string(),
            ..p
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.client.delete_document(&self.index, id).await
    }

    async fn search_radius(
        &self,
        center: Location,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Post>> {
        let hits = self
            .client
            .search::<Post>(&self.index, &geo_distance_query(&center, radius_km, limit))
            .await?;
        Ok(hits.into_iter().map(into_post).collect())
    }

    async fn search_area(&self, area: BoundingBox, limit: usize) -> Result<Vec<Post>> {
        let hits = self
            .client
            .search::<Post>(&self.index, &geo_bounding_box_query(&area, limit))
            .await?;
        Ok(hits.into_iter().map(into_post).collect())
    }
}
