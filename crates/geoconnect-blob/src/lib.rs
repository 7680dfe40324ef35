//! GeoConnect Blob - Cloud Storage collaborator
//!
//! Uploads post images to a Google Cloud Storage bucket through the JSON
//! API and returns their public URL. The bucket is expected to grant public
//! read access; this crate does not manage ACLs.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use geoconnect_core::{BlobStore, GeoError, Result, StorageConfig};
use reqwest::{Client, Url};
use std::path::Path;
use std::time::Duration;

/// Cloud Storage client for a single bucket
pub struct GcsBlobStore {
    client: Client,
    bucket: String,
    upload_base_url: String,
    public_base_url: String,
    access_token: Option<String>,
}

impl GcsBlobStore {
    /// Create from config
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(GeoError::ConfigError("GCS_BUCKET is required".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GeoError::StorageError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    fn upload_url(&self, object_name: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/b/{}/o", self.upload_base_url, self.bucket))
            .map_err(|e| GeoError::ConfigError(format!("Invalid upload URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", object_name);
        Ok(url)
    }

    /// Public URL of an object in this bucket
    pub fn public_url(&self, object_name: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, object_name)
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn put(&self, object_name: &str, content_type: &str, data: Vec<u8>) -> Result<String> {
        let size = data.len();
        let mut request = self
            .client
            .post(self.upload_url(object_name)?)
            .header("Content-Type", content_type)
            .body(data);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GeoError::StorageError(format!("Upload request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeoError::StorageError(format!(
                "Cloud Storage returned {status}: {error_text}"
            )));
        }

        tracing::info!(bucket = %self.bucket, object = object_name, size, "Image uploaded");
        Ok(self.public_url(object_name))
    }
}

/// Random object name that keeps the upload's extension, lowercased
pub fn object_name_for(original_filename: &str) -> String {
    let id = uuid::Uuid::new_v4();
    match extension_of(original_filename) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
}

/// Content type inferred from a file name's extension
pub fn content_type_for(filename: &str) -> &'static str {
    match extension_of(filename).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("heic") => "image/heic",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}
