// In-memory implementation of the verdict session store.
//
// DashMap keeps lookups lock-free from the caller's point of view while
// the service stays the single logical writer per request id.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::core::moderation::{AnalysisResult, ModerationError, ResultStore};

/// Session store mapping request id -> latest completed verdict.
pub struct InMemoryResultStore {
    results: DashMap<String, AnalysisResult>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self {
            results: DashMap::new(),
        }
    }
}

impl Default for InMemoryResultStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn put(&self, result: AnalysisResult) -> Result<(), ModerationError> {
        // Last write wins: re-analyzing an id replaces the stored verdict.
        self.results.insert(result.id.clone(), result);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<AnalysisResult>, ModerationError> {
        Ok(self.results.get(id).map(|entry| entry.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{verdict, AnalysisRequest};

    #[tokio::test]
    async fn get_returns_none_for_unknown_id() {
        let store = InMemoryResultStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_then_get_roundtrips_and_overwrites() {
        let store = InMemoryResultStore::new();

        let first = verdict::compose(&AnalysisRequest::new("m1", "hello"), "test");
        store.put(first).await.unwrap();
        let second = verdict::compose(&AnalysisRequest::new("m1", "you stupid idiot"), "test");
        store.put(second).await.unwrap();

        let stored = store.get("m1").await.unwrap().unwrap();
        assert!(stored.should_flag);
        assert_eq!(stored.content, "you stupid idiot");
    }
}
