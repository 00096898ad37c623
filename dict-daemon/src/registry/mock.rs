//! Mock registry for testing.
//!
//! Reports a fixed existence answer and counts calls.

use super::{Registry, RegistryError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Mock registry for testing.
#[derive(Debug, Default)]
pub struct MockRegistry {
    inner: Arc<Mutex<MockRegistryInner>>,
}

#[derive(Debug, Default)]
struct MockRegistryInner {
    exists: bool,
    collection_id: Option<String>,
    fail_next_exists: Option<String>,
    exists_calls: usize,
    restarts: usize,
}

impl MockRegistry {
    /// Create a mock registry that answers `exists` to every check.
    pub fn new(exists: bool) -> Self {
        let registry = Self::default();
        registry.set_exists(exists);
        registry
    }

    /// Change the existence answer.
    pub fn set_exists(&self, exists: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.exists = exists;
    }

    /// Set the identifier reported by `collection_id()`.
    pub fn set_collection_id(&self, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.collection_id = Some(id.to_string());
    }

    /// Cause the next existence check to fail with the given error.
    pub fn fail_next_exists(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_exists = Some(error.to_string());
    }

    /// Number of existence checks performed.
    pub fn exists_calls(&self) -> usize {
        self.inner.lock().unwrap().exists_calls
    }

    /// Number of `restart()` calls.
    pub fn restarts(&self) -> usize {
        self.inner.lock().unwrap().restarts
    }
}

impl Clone for MockRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn collection_exists(&self) -> Result<bool, RegistryError> {
        let mut inner = self.inner.lock().unwrap();
        inner.exists_calls += 1;

        if let Some(error) = inner.fail_next_exists.take() {
            return Err(RegistryError::Unavailable(error));
        }

        Ok(inner.exists)
    }

    async fn collection_id(&self) -> Result<Option<String>, RegistryError> {
        Ok(self.inner.lock().unwrap().collection_id.clone())
    }

    fn restart(&self) {
        self.inner.lock().unwrap().restarts += 1;
    }
}
