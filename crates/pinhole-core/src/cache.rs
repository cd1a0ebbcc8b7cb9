use crate::shortcode::ShortCode;

/// A process-local cache of short code to long URL mappings.
///
/// The cache is a best-effort read accelerator in front of the
/// [`Repository`](crate::Repository); none of its operations can fail.
pub trait UrlCache: Send + Sync + 'static {
    /// Returns the cached long URL if present and not expired.
    fn get_url(&self, code: &ShortCode) -> Option<String>;

    /// Inserts or overwrites the mapping for `code`.
    fn set_url(&self, code: &ShortCode, long_url: &str);

    /// Removes the mapping for `code`.
    /// It is not an error if the key does not exist.
    fn del(&self, code: &ShortCode);

    /// Number of stored entries, including expired ones not yet swept.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
