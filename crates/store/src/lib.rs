//! Keyed ephemeral storage for the url and tags behind each rendered summary.
//!
//! Button and form interactions only carry a short id, so everything needed to regenerate or
//! edit a summary is written here when the summary is first rendered.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use curabot_core::config::{StoreBackend, StoreConfig};
use curabot_core::{ReferenceId, StoredReference};

pub mod memory;
pub mod rest;

pub use memory::InMemoryReferenceStore;
pub use rest::{RestKvConfig, RestKvReferenceStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("store rejected command ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("store response could not be decoded: {0}")]
    Decode(String),
    #[error("store is misconfigured: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Stores a url and its tags and returns an id that no earlier call returned.
    async fn put(&self, url: &str, tags: &str) -> Result<ReferenceId, StoreError>;

    /// Returns `None` for unknown or expired ids.
    async fn get(&self, id: &str) -> Result<Option<StoredReference>, StoreError>;

    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl<T> ReferenceStore for Arc<T>
where
    T: ReferenceStore + ?Sized,
{
    async fn put(&self, url: &str, tags: &str) -> Result<ReferenceId, StoreError> {
        (**self).put(url, tags).await
    }

    async fn get(&self, id: &str) -> Result<Option<StoredReference>, StoreError> {
        (**self).get(id).await
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}

pub fn build_reference_store(config: &StoreConfig) -> Result<Arc<dyn ReferenceStore>, StoreError> {
    let ttl = Duration::from_secs(config.ttl_secs);

    match config.backend() {
        StoreBackend::Memory => Ok(Arc::new(InMemoryReferenceStore::with_ttl(ttl))),
        StoreBackend::RestKv => {
            let (Some(url), Some(token)) = (config.url.clone(), config.token.clone()) else {
                return Err(StoreError::Configuration(
                    "store.url and store.token must both be set for the REST backing".to_owned(),
                ));
            };
            let store = RestKvReferenceStore::new(RestKvConfig::new(url, token, ttl))?;
            Ok(Arc::new(store))
        }
    }
}
