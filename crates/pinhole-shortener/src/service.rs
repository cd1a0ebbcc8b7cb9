use async_trait::async_trait;
use pinhole_core::{
    Repository, Shortener, ShortenerError, StorageError, UrlCache, DEFAULT_REQUEST_TIMEOUT,
};
use pinhole_generator::{Generator, Seed};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;
use url::Url;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Configures a [`ShortenerService`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerSettings {
    /// Public base URL the short code is appended to.
    #[builder(setter(into))]
    pub base_url: String,
    /// Upper bound on generate-then-persist cycles per request.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
    /// Deadline applied to every repository call.
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,
}

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `Repository`, a `Generator` and a `UrlCache` to handle:
/// - URL validation
/// - Idempotent re-shortening of already known URLs
/// - Collision retries against the repository's uniqueness check
/// - Cache population for freshly stored codes
pub struct ShortenerService<R, G, C> {
    repository: Arc<R>,
    generator: G,
    cache: Arc<C>,
    settings: ShortenerSettings,
}

impl<R: Repository, G: Generator, C: UrlCache> ShortenerService<R, G, C> {
    pub fn new(repository: Arc<R>, generator: G, cache: Arc<C>, settings: ShortenerSettings) -> Self {
        Self {
            repository,
            generator,
            cache,
            settings,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn settings(&self) -> &ShortenerSettings {
        &self.settings
    }

    /// Validates that the URL is absolute with a scheme and a host.
    fn validate_url(long_url: &str) -> Result<(), ShortenerError> {
        if long_url.is_empty() {
            return Err(ShortenerError::InvalidInput(
                "URL cannot be empty".to_string(),
            ));
        }

        let parsed = Url::parse(long_url).map_err(|e| {
            ShortenerError::InvalidInput(format!("URL is not well formed: {long_url}: {e}"))
        })?;

        if parsed.scheme().is_empty() || parsed.host_str().is_none_or(str::is_empty) {
            return Err(ShortenerError::InvalidInput(format!(
                "URL must have a valid scheme and host: {long_url}"
            )));
        }

        Ok(())
    }

    /// Runs a repository call under the request deadline.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        let timeout = self.settings.request_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| StorageError::Timeout(format!("{operation} exceeded {timeout:?}")))?
    }
}

#[async_trait]
impl<R: Repository, G: Generator, C: UrlCache> Shortener for ShortenerService<R, G, C> {
    async fn shorten(&self, long_url: &str) -> Result<String, ShortenerError> {
        Self::validate_url(long_url)?;

        let existing = self
            .bounded("find_by_long_url", self.repository.find_by_long_url(long_url))
            .await
            .map_err(storage_to_shortener_error)?;
        if let Some(mapping) = existing {
            debug!(code = %mapping.short_code, "url already shortened");
            return Ok(mapping.short_code.to_url(&self.settings.base_url));
        }

        for attempt in 0..self.settings.max_attempts {
            let code = self.generator.generate(Seed::new(long_url, attempt))?;

            match self
                .bounded("save_mapping", self.repository.save_mapping(&code, long_url))
                .await
            {
                Ok(()) => {
                    self.cache.set_url(&code, long_url);
                    info!(code = %code, attempt, "created short code");
                    return Ok(code.to_url(&self.settings.base_url));
                }
                Err(StorageError::Duplicate(_)) => {
                    warn!(code = %code, attempt, "short code collision, retrying");
                }
                Err(err) => return Err(storage_to_shortener_error(err)),
            }
        }

        Err(ShortenerError::GenerationExhausted {
            attempts: self.settings.max_attempts,
        })
    }
}

fn storage_to_shortener_error(err: StorageError) -> ShortenerError {
    error!(error = %err, "storage call failed");
    ShortenerError::StorageUnavailable(err.to_string())
}
