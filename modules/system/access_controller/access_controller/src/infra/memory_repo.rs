//! In-memory [`Repository`] implementation.

use access_controller_sdk::{Repository, RepositoryError};
use async_trait::async_trait;
use dashmap::DashMap;

/// Process-local key/value store. Last write wins.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    entries: DashMap<String, Vec<u8>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn save(&self, key: &str, value: Vec<u8>) -> Result<(), RepositoryError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }
}
