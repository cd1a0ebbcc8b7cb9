use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deadline the services put on each repository call unless configured
/// otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A stored short code to long URL mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlMapping {
    /// The unique short code.
    pub short_code: ShortCode,
    /// The original URL the code resolves to.
    pub long_url: String,
    /// When the mapping was first stored.
    pub created_at: Timestamp,
    /// How many times the code has been resolved.
    pub clicks: u64,
}

/// The persistence contract used by the shortening and resolution services.
///
/// The store is the single source of truth for code uniqueness. Callers bound
/// each call with their own deadline by wrapping the returned future
/// ([`DEFAULT_REQUEST_TIMEOUT`] by default).
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Stores a new mapping. Returns `Err(Duplicate)` if the code already exists.
    async fn save_mapping(&self, code: &ShortCode, long_url: &str) -> Result<()>;

    /// Finds an existing mapping for a long URL.
    /// Returns `None` if the URL has never been shortened.
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<UrlMapping>>;

    /// Finds the mapping for a short code.
    /// Returns `None` if the code does not exist.
    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<UrlMapping>>;

    /// Adds one to the click counter of a code.
    /// Returns `Err(NotFound)` if the code does not exist.
    async fn increment_clicks(&self, code: &ShortCode) -> Result<()>;
}
