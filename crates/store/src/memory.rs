use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use curabot_core::{ReferenceId, StoredReference};

use crate::{ReferenceStore, StoreError};

#[derive(Clone, Debug)]
struct Entry {
    url: String,
    tags: String,
    stored_at: Instant,
}

/// Process-local store with numeric ids counting up from zero.
#[derive(Default)]
pub struct InMemoryReferenceStore {
    entries: RwLock<HashMap<u64, Entry>>,
    next_id: AtomicU64,
    ttl: Option<Duration>,
}

impl InMemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl), ..Self::default() }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.ttl.map(|ttl| entry.stored_at.elapsed() >= ttl).unwrap_or(false)
    }
}

#[async_trait]
impl ReferenceStore for InMemoryReferenceStore {
    async fn put(&self, url: &str, tags: &str) -> Result<ReferenceId, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let entry = Entry { url: url.to_owned(), tags: tags.to_owned(), stored_at: Instant::now() };

        let mut entries = self.entries.write().await;
        // Entries that are never read again would otherwise live until restart.
        if self.ttl.is_some() {
            entries.retain(|_, existing| !self.is_expired(existing));
        }
        entries.insert(id, entry);
        Ok(ReferenceId(id.to_string()))
    }

    async fn get(&self, id: &str) -> Result<Option<StoredReference>, StoreError> {
        let Ok(key) = id.parse::<u64>() else {
            return Ok(None);
        };

        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                None => return Ok(None),
                Some(entry) if !self.is_expired(entry) => {
                    return Ok(Some(StoredReference {
                        id: ReferenceId(id.to_owned()),
                        url: entry.url.clone(),
                        tags: entry.tags.clone(),
                    }));
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(&key).is_some_and(|entry| self.is_expired(entry)) {
            entries.remove(&key);
        }
        Ok(None)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
