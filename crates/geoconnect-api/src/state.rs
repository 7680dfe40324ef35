//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::AuthService;
use crate::error::AppError;
use crate::posts::PostService;
use geoconnect_core::config::AppConfig;
use geoconnect_core::{BlobStore, Clock, CredentialStore, PostStore, SystemClock};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Signup, login and token verification
    pub auth: AuthService,
    /// Post creation, search and deletion
    pub posts: PostService,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Wire the services over the given collaborators
    pub fn new(
        config: AppConfig,
        credentials: Arc<dyn CredentialStore>,
        posts: Arc<dyn PostStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Result<Self, AppError> {
        Self::with_clock(config, credentials, posts, blobs, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: AppConfig,
        credentials: Arc<dyn CredentialStore>,
        posts: Arc<dyn PostStore>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let auth = AuthService::from_config(&config.auth, credentials, clock)?;
        let posts = PostService::new(posts, blobs, config.posts.clone());

        tracing::info!(admins = auth.admins().len(), "Application state initialized");

        Ok(Self {
            config,
            auth,
            posts,
            start_time: Instant::now(),
        })
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
