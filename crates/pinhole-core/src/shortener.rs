use crate::error::ShortenerError;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, ShortenerError>;

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens `long_url` and returns the full short URL.
    ///
    /// Shortening a URL that already has a mapping returns the existing
    /// short URL without minting a new code.
    async fn shorten(&self, long_url: &str) -> Result<String>;
}

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a short code to its long URL.
    async fn resolve(&self, code: &str) -> Result<String>;
}
