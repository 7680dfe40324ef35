//! Credential store on the users index
//!
//! Documents are keyed by normalized username. Older deployments indexed
//! some users under generated ids, so a miss on the id falls back to a term
//! query on the `username` field; both paths return the same record.

use crate::query::term_query;
use crate::ElasticClient;
use async_trait::async_trait;
use geoconnect_core::{Credential, CredentialStore, Result};
use std::sync::Arc;

pub struct EsCredentialStore {
    client: Arc<ElasticClient>,
    index: String,
}

impl EsCredentialStore {
    pub fn new(client: Arc<ElasticClient>, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
        }
    }
}

#[async_trait]
impl CredentialStore for EsCredentialStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<Credential>> {
        if let Some(credential) = self
            .client
            .get_source::<Credential>(&self.index, username)
            .await?
        {
            return Ok(Some(credential));
        }

        let hits = self
            .client
            .search::<Credential>(&self.index, &term_query("username", username, 1))
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| hit.source)
            .find(|c| c.username == username))
    }

    async fn create(&self, credential: &Credential) -> Result<()> {
        self.client
            .create_document(&self.index, &credential.username, credential)
            .await
    }

    async fn delete(&self, username: &str) -> Result<bool> {
        self.client.delete_document(&self.index, username).await
    }
}
