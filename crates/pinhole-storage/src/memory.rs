use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use pinhole_core::repository::{Repository, Result, UrlMapping};
use pinhole_core::{ShortCode, StorageError};
use tracing::trace;

/// In-memory implementation of the Repository trait using DashMap.
///
/// Codes are unique: inserts go through the entry API so two concurrent
/// writers of the same code cannot both succeed. The long URL index keeps the
/// first mapping stored for each URL.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    by_code: DashMap<String, UrlMapping>,
    by_long_url: DashMap<String, ShortCode>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_code: DashMap::with_capacity(capacity),
            by_long_url: DashMap::with_capacity(capacity),
        }
    }

    /// Number of stored mappings.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn save_mapping(&self, code: &ShortCode, long_url: &str) -> Result<()> {
        match self.by_code.entry(code.as_str().to_owned()) {
            Entry::Occupied(_) => return Err(StorageError::Duplicate(code.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(UrlMapping {
                    short_code: code.clone(),
                    long_url: long_url.to_owned(),
                    created_at: Timestamp::now(),
                    clicks: 0,
                });
            }
        }

        self.by_long_url
            .entry(long_url.to_owned())
            .or_insert_with(|| code.clone());

        trace!(code = %code, "stored url mapping");
        Ok(())
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<UrlMapping>> {
        let Some(code) = self.by_long_url.get(long_url).map(|code| code.clone()) else {
            return Ok(None);
        };

        Ok(self
            .by_code
            .get(code.as_str())
            .map(|mapping| mapping.clone()))
    }

    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<UrlMapping>> {
        Ok(self
            .by_code
            .get(code.as_str())
            .map(|mapping| mapping.clone()))
    }

    async fn increment_clicks(&self, code: &ShortCode) -> Result<()> {
        match self.by_code.get_mut(code.as_str()) {
            Some(mut mapping) => {
                mapping.clicks += 1;
                Ok(())
            }
            None => Err(StorageError::NotFound(code.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    #[tokio::test]
    async fn save_and_find_by_short_code() {
        let repo = InMemoryRepository::new();

        repo.save_mapping(&code("abc123"), "https://example.com")
            .await
            .unwrap();

        let mapping = repo
            .find_by_short_code(&code("abc123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mapping.short_code, code("abc123"));
        assert_eq!(mapping.long_url, "https://example.com");
        assert_eq!(mapping.clicks, 0);
    }

    #[tokio::test]
    async fn find_missing_returns_none() {
        let repo = InMemoryRepository::new();

        assert!(repo.find_by_short_code(&code("nope")).await.unwrap().is_none());
        assert!(repo
            .find_by_long_url("https://nope.example")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let repo = InMemoryRepository::new();

        repo.save_mapping(&code("abc123"), "https://example.com")
            .await
            .unwrap();

        let err = repo
            .save_mapping(&code("abc123"), "https://other.com")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Duplicate(_)));
        let mapping = repo
            .find_by_short_code(&code("abc123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mapping.long_url, "https://example.com");
    }

    #[tokio::test]
    async fn find_by_long_url_returns_first_mapping() {
        let repo = InMemoryRepository::new();

        repo.save_mapping(&code("first"), "https://example.com")
            .await
            .unwrap();
        repo.save_mapping(&code("second"), "https://example.com")
            .await
            .unwrap();

        let mapping = repo
            .find_by_long_url("https://example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mapping.short_code, code("first"));
    }

    #[tokio::test]
    async fn increment_clicks_counts_and_rejects_unknown_codes() {
        let repo = InMemoryRepository::new();
        repo.save_mapping(&code("abc123"), "https://example.com")
            .await
            .unwrap();

        repo.increment_clicks(&code("abc123")).await.unwrap();
        repo.increment_clicks(&code("abc123")).await.unwrap();

        let mapping = repo
            .find_by_short_code(&code("abc123"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mapping.clicks, 2);

        let err = repo.increment_clicks(&code("nope")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn codes_and_urls_differing_in_case_are_distinct() {
        let repo = InMemoryRepository::new();

        repo.save_mapping(&code("abcDEF"), "https://x.com/page")
            .await
            .unwrap();
        repo.save_mapping(&code("ABCdef"), "https://x.com/Page")
            .await
            .unwrap();

        let mapping = repo.find_by_long_url("https://x.com/Page").await.unwrap().unwrap();
        assert_eq!(mapping.short_code, code("ABCdef"));
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_writers_of_one_code_have_a_single_winner() {
        let repo = Arc::new(InMemoryRepository::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    repo.save_mapping(&code("contested"), &format!("https://example{i}.com"))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(err) => assert!(matches!(err, StorageError::Duplicate(_))),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(repo.len(), 1);
    }
}
