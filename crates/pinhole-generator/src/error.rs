use pinhole_core::ShortenerError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("random source failed: {0}")]
    RandomSource(String),
    #[error("sequence generator failed: {0}")]
    Sequence(#[from] pinhole_snowflake::Error),
    #[error("invalid short code length {length}; expected 1..={max}")]
    InvalidLength { length: usize, max: usize },
}

impl From<GeneratorError> for ShortenerError {
    fn from(value: GeneratorError) -> Self {
        ShortenerError::Generator(value.to_string())
    }
}
