//! GeoConnect Search - Elasticsearch collaborator
//!
//! Provides a thin REST client for Elasticsearch and the post/credential
//! store implementations built on it. Geo queries are expressed in the
//! engine's query DSL; distance computation and ranking stay in the cluster.
//!
//! Author: hephaex@gmail.com

pub mod credentials;
pub mod posts;
pub mod query;

pub use credentials::EsCredentialStore;
pub use posts::EsPostStore;

use geoconnect_core::{GeoError, Result, SearchConfig};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// A search hit: document id plus its source
#[derive(Debug, Clone, Deserialize)]
pub struct Hit<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source")]
    pub source: T,
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    hits: HitsEnvelope<T>,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope<T> {
    hits: Vec<Hit<T>>,
}

#[derive(Debug, Deserialize)]
struct GetResponse<T> {
    found: bool,
    #[serde(rename = "_source")]
    source: Option<T>,
}

/// Elasticsearch REST client
pub struct ElasticClient {
    client: Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticClient {
    /// Create a client from config; no request is made until first use
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| GeoError::ConfigError(format!("Invalid ES_URL {}: {e}", config.url)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GeoError::StorageError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Build an endpoint URL with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                GeoError::ConfigError(format!("ES_URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| GeoError::StorageError(format!("Elasticsearch request failed: {e}")))
    }

    /// Turn a non-success response into a storage error carrying the body
    async fn error_for(response: Response) -> GeoError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        GeoError::StorageError(format!("Elasticsearch returned {status}: {text}"))
    }

    /// Check whether an index exists
    pub async fn index_exists(&self, index: &str) -> Result<bool> {
        let url = self.endpoint(&[index])?;
        let response = self.send(self.request(Method::HEAD, url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            _ => Err(Self::error_for(response).await),
        }
    }

    /// Create an index with the given settings/mappings body
    pub async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        let url = self.endpoint(&[index])?;
        let response = self.send(self.request(Method::PUT, url).json(body)).await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let ack: Value = response
            .json()
            .await
            .map_err(|e| GeoError::StorageError(format!("Failed to parse response: {e}")))?;
        if ack.get("acknowledged").and_then(Value::as_bool) != Some(true) {
            tracing::warn!(index, "Create index not acknowledged by Elasticsearch");
        }
        Ok(())
    }

    /// Create the index if missing; returns true when it was created
    pub async fn ensure_index(&self, index: &str, body: &Value) -> Result<bool> {
        if self.index_exists(index).await? {
            return Ok(false);
        }
        self.create_index(index, body).await?;
        tracing::info!(index, "Created index");
        Ok(true)
    }

    /// Fetch a document source by id
    pub async fn get_source<T: DeserializeOwned>(
        &self,
        index: &str,
        id: &str,
    ) -> Result<Option<T>> {
        let url = self.endpoint(&[index, "_doc", id])?;
        let response = self.send(self.request(Method::GET, url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let doc: GetResponse<T> = response.json().await.map_err(|e| {
                    GeoError::StorageError(format!("Failed to decode document {id}: {e}"))
                })?;
                Ok(if doc.found { doc.source } else { None })
            }
            _ => Err(Self::error_for(response).await),
        }
    }

    /// Write a document only if its id is unused; 409 becomes `GeoError::Conflict`
    pub async fn create_document<T: Serialize + ?Sized>(
        &self,
        index: &str,
        id: &str,
        doc: &T,
    ) -> Result<()> {
        let mut url = self.endpoint(&[index, "_create", id])?;
        url.query_pairs_mut().append_pair("refresh", "true");
        let response = self.send(self.request(Method::PUT, url).json(doc)).await?;

        match response.status() {
            StatusCode::CONFLICT => Err(GeoError::Conflict(format!("{index}/{id}"))),
            s if s.is_success() => Ok(()),
            _ => Err(Self::error_for(response).await),
        }
    }

    /// Write (or overwrite) a document under an id
    pub async fn index_document<T: Serialize + ?Sized>(
        &self,
        index: &str,
        id: &str,
        doc: &T,
    ) -> Result<()> {
        let mut url = self.endpoint(&[index, "_doc", id])?;
        // immediately searchable after the write
        url.query_pairs_mut().append_pair("refresh", "true");
        let response = self.send(self.request(Method::PUT, url).json(doc)).await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        Ok(())
    }

    /// Delete a document; returns false if it did not exist
    pub async fn delete_document(&self, index: &str, id: &str) -> Result<bool> {
        let mut url = self.endpoint(&[index, "_doc", id])?;
        url.query_pairs_mut().append_pair("refresh", "true");
        let response = self.send(self.request(Method::DELETE, url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            _ => Err(Self::error_for(response).await),
        }
    }

    /// Run a search request body against an index
    pub async fn search<T: DeserializeOwned>(
        &self,
        index: &str,
        body: &Value,
    ) -> Result<Vec<Hit<T>>> {
        let url = self.endpoint(&[index, "_search"])?;
        let response = self.send(self.request(Method::POST, url).json(body)).await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let result: SearchResponse<T> = response
            .json()
            .await
            .map_err(|e| GeoError::StorageError(format!("Failed to decode search hits: {e}")))?;
        Ok(result.hits.hits)
    }
}

/// Create the posts and users indices when they are missing
pub async fn ensure_indices(client: &ElasticClient, config: &SearchConfig) -> Result<()> {
    client
        .ensure_index(&config.posts_index, &query::posts_mapping())
        .await?;
    client
        .ensure_index(&config.users_index, &query::users_mapping())
        .await?;
    Ok(())
}
