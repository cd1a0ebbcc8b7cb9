use crate::{Generator, GeneratorError, Seed};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use md5::{Digest, Md5};
use pinhole_core::ShortCode;
use rand::rngs::OsRng;
use rand::TryRngCore;

/// What the digest of a [`HashGenerator`] is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashSeed {
    /// The long URL itself, salted with the attempt number on retries.
    #[default]
    Content,
    /// Fresh random bytes from the operating system.
    Random,
}

/// Content-derived short code generator.
///
/// Computes an MD5 digest, base-64 encodes it, keeps the first `length`
/// characters and maps `/` to `_`, `+` to `-` and drops `=`.
///
/// MD5 is used as a fingerprint here, not as a security token. Truncation
/// makes collisions possible, so codes still go through the repository's
/// uniqueness check.
#[derive(Debug, Clone)]
pub struct HashGenerator {
    length: usize,
    seed: HashSeed,
}

impl HashGenerator {
    pub const DEFAULT_LENGTH: usize = 7;
    /// An MD5 digest encodes to 22 base-64 characters before padding.
    pub const MAX_LENGTH: usize = 22;

    pub fn new(length: usize, seed: HashSeed) -> Result<Self, GeneratorError> {
        if !(1..=Self::MAX_LENGTH).contains(&length) {
            return Err(GeneratorError::InvalidLength {
                length,
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self { length, seed })
    }

    /// Generator seeded by the long URL.
    pub fn content(length: usize) -> Result<Self, GeneratorError> {
        Self::new(length, HashSeed::Content)
    }

    /// Generator seeded by random bytes.
    pub fn random(length: usize) -> Result<Self, GeneratorError> {
        Self::new(length, HashSeed::Random)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    fn encode(&self, digest: &[u8]) -> ShortCode {
        let encoded = STANDARD.encode(digest);
        let code: String = encoded
            .chars()
            .take(self.length)
            .filter_map(|c| match c {
                '/' => Some('_'),
                '+' => Some('-'),
                '=' => None,
                other => Some(other),
            })
            .collect();
        ShortCode::new_unchecked(code)
    }
}

impl Default for HashGenerator {
    fn default() -> Self {
        Self {
            length: Self::DEFAULT_LENGTH,
            seed: HashSeed::Content,
        }
    }
}

impl Generator for HashGenerator {
    fn generate(&self, seed: Seed<'_>) -> Result<ShortCode, GeneratorError> {
        let digest = match self.seed {
            HashSeed::Content => {
                let mut hasher = Md5::new().chain_update(seed.long_url.as_bytes());
                if seed.attempt > 0 {
                    hasher.update(seed.attempt.to_be_bytes());
                }
                hasher.finalize()
            }
            HashSeed::Random => {
                let mut bytes = vec![0u8; self.length];
                OsRng
                    .try_fill_bytes(&mut bytes)
                    .map_err(|e| GeneratorError::RandomSource(e.to_string()))?;
                Md5::digest(&bytes)
            }
        };

        Ok(self.encode(&digest))
    }
}
