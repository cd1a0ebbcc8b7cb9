//! Short code generation strategies.
//!
//! Two interchangeable implementations of [`Generator`] are provided:
//! [`HashGenerator`] derives codes from an MD5 digest (of the long URL or of
//! fresh random bytes), and [`Snowflake`] produces time-ordered ids encoded
//! as base-62.

pub mod error;
pub mod hash;

pub use error::GeneratorError;
pub use hash::{HashGenerator, HashSeed};
pub use pinhole_snowflake::{Snowflake, SnowflakeSettings};

use pinhole_core::{base62, ShortCode};
use pinhole_snowflake::Clock;

/// Input handed to a [`Generator`] on each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed<'a> {
    /// The long URL being shortened.
    pub long_url: &'a str,
    /// Zero-based attempt number within one shortening request.
    pub attempt: u32,
}

impl<'a> Seed<'a> {
    pub fn new(long_url: &'a str, attempt: u32) -> Self {
        Self { long_url, attempt }
    }
}

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage;
/// uniqueness is arbitrated by the repository.
pub trait Generator: Send + Sync + 'static {
    /// Generates a candidate short code for `seed`.
    fn generate(&self, seed: Seed<'_>) -> Result<ShortCode, GeneratorError>;
}

impl<C: Clock + 'static> Generator for Snowflake<C> {
    fn generate(&self, _seed: Seed<'_>) -> Result<ShortCode, GeneratorError> {
        let id = self.next_id()?;
        Ok(ShortCode::new_unchecked(base62::encode(id.as_u64())))
    }
}
