//! GeoConnect Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout GeoConnect:
//! - Post and credential models
//! - Geographic primitives (points, bounding boxes, distances)
//! - Common error types
//! - Collaborator traits for the search engine, blob store and clock
//! - Configuration management

pub mod config;
pub mod memory;

pub use config::{
    AppConfig, AuthConfig, ConfigError, HashingConfig, PostConfig, SearchConfig, StorageConfig,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for GeoConnect operations
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GeoError>;

// ============================================================================
// Geography
// ============================================================================

/// Mean Earth radius used for great-circle distances
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A WGS84 coordinate, serialized the way the search engine stores geo points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check that both coordinates are finite and in range
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(GeoError::ValidationError(format!(
                "latitude out of range: {}",
                self.lat
            )));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(GeoError::ValidationError(format!(
                "longitude out of range: {}",
                self.lon
            )));
        }
        Ok(())
    }

    /// Great-circle distance in kilometres (haversine)
    pub fn distance_km(&self, other: &Location) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// Rectangular search area given by its top-left and bottom-right corners
///
/// A top-left longitude greater than the bottom-right longitude describes a
/// box crossing the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top_left: Location,
    pub bottom_right: Location,
}

impl BoundingBox {
    pub fn new(top_left: Location, bottom_right: Location) -> Result<Self> {
        top_left.validate()?;
        bottom_right.validate()?;
        if top_left.lat < bottom_right.lat {
            return Err(GeoError::ValidationError(
                "top_left latitude must not be south of bottom_right".to_string(),
            ));
        }
        Ok(Self {
            top_left,
            bottom_right,
        })
    }

    pub fn contains(&self, point: &Location) -> bool {
        let in_lat = point.lat <= self.top_left.lat && point.lat >= self.bottom_right.lat;
        let in_lon = if self.top_left.lon <= self.bottom_right.lon {
            point.lon >= self.top_left.lon && point.lon <= self.bottom_right.lon
        } else {
            point.lon >= self.top_left.lon || point.lon <= self.bottom_right.lon
        };
        in_lat && in_lon
    }
}

// ============================================================================
// Posts
// ============================================================================

/// A geotagged post as stored in the search engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Document id, not part of the stored source
    #[serde(skip)]
    pub id: String,

    /// Author, always taken from the verified caller identity
    pub user: String,

    pub message: String,

    pub location: Location,

    /// Public image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Post {
    /// Build a post with a fresh id
    pub fn new(user: impl Into<String>, message: impl Into<String>, location: Location) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user: user.into(),
            message: message.into(),
            location,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Stored user credential, keyed by normalized username
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,

    /// Argon2 PHC digest; the field name matches documents written by earlier deployments
    #[serde(rename = "password")]
    pub password_hash: String,

    #[serde(default)]
    pub age: i32,

    #[serde(default)]
    pub gender: String,
}

impl Credential {
    /// Canonical form of a username: trimmed and lowercased
    pub fn normalize_username(raw: &str) -> String {
        raw.trim().to_lowercase()
    }

    /// Usernames are non-empty and limited to `[a-z0-9_]`
    pub fn is_valid_username(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Credential collection in the search engine
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a credential by normalized username
    async fn get_by_username(&self, username: &str) -> Result<Option<Credential>>;

    /// Insert a credential; fails with `GeoError::Conflict` if the username exists
    async fn create(&self, credential: &Credential) -> Result<()>;

    /// Remove a credential, returning whether it existed
    async fn delete(&self, username: &str) -> Result<bool>;
}

/// Post collection in the search engine
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Index a post under its id
    async fn create(&self, post: &Post) -> Result<()>;

    /// Fetch a post by id
    async fn get(&self, id: &str) -> Result<Option<Post>>;

    /// Delete a post by id, returning whether it existed
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Posts within `radius_km` of `center`
    async fn search_radius(
        &self,
        center: Location,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Post>>;

    /// Posts inside a bounding box
    async fn search_area(&self, area: BoundingBox, limit: usize) -> Result<Vec<Post>>;
}

/// Object storage for post images
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `object_name` and return its public URL
    async fn put(&self, object_name: &str, content_type: &str, data: Vec<u8>) -> Result<String>;
}

/// Wall-clock source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
