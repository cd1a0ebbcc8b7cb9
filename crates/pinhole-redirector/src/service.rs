use crate::clicks::{ClickRecorder, ClickRecorderSettings};
use async_trait::async_trait;
use pinhole_core::{
    Redirector, Repository, ShortCode, ShortenerError, StorageError, UrlCache,
    DEFAULT_REQUEST_TIMEOUT,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct RedirectorSettings {
    /// Deadline for the repository lookup on a cache miss.
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,
    #[builder(default)]
    pub clicks: ClickRecorderSettings,
}

/// Service for handling URL redirects.
///
/// Looks codes up in the cache first and falls back to the repository,
/// populating the cache on the way out. Every successful resolution is
/// handed to a [`ClickRecorder`].
pub struct RedirectorService<R, C> {
    repository: Arc<R>,
    cache: Arc<C>,
    clicks: ClickRecorder,
    settings: RedirectorSettings,
}

impl<R: Repository, C: UrlCache> RedirectorService<R, C> {
    /// Creates the service and starts its click recorder.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(repository: Arc<R>, cache: Arc<C>, settings: RedirectorSettings) -> Self {
        let clicks = ClickRecorder::spawn(Arc::clone(&repository), settings.clicks.clone());
        Self {
            repository,
            cache,
            clicks,
            settings,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    async fn lookup(&self, code: &ShortCode) -> Result<Option<String>, ShortenerError> {
        let timeout = self.settings.request_timeout;
        let found = tokio::time::timeout(timeout, self.repository.find_by_short_code(code))
            .await
            .map_err(|_| StorageError::Timeout(format!("find_by_short_code exceeded {timeout:?}")))
            .and_then(|result| result)
            .map_err(|err| {
                error!(code = %code, error = %err, "failed to look up short code");
                ShortenerError::from(err)
            })?;

        Ok(found.map(|mapping| mapping.long_url))
    }
}

#[async_trait]
impl<R: Repository, C: UrlCache> Redirector for RedirectorService<R, C> {
    async fn resolve(&self, code: &str) -> Result<String, ShortenerError> {
        if code.is_empty() {
            return Err(ShortenerError::InvalidInput(
                "short code is required".to_string(),
            ));
        }

        // Nothing outside the short code alphabet or length is ever stored.
        let Ok(code) = ShortCode::new(code) else {
            debug!(code, "short code cannot exist");
            return Err(ShortenerError::NotFound(code.to_string()));
        };
        trace!(code = %code, "resolving short code");

        if let Some(long_url) = self.cache.get_url(&code) {
            self.clicks.record(&code);
            return Ok(long_url);
        }

        let Some(long_url) = self.lookup(&code).await? else {
            debug!(code = %code, "short code not found");
            return Err(ShortenerError::NotFound(code.to_string()));
        };

        self.cache.set_url(&code, &long_url);
        self.clicks.record(&code);
        debug!(code = %code, url = %long_url, "resolved short code");
        Ok(long_url)
    }
}
