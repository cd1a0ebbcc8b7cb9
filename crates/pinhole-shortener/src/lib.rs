//! URL shortening service.
//!
//! [`ShortenerService`] turns long URLs into short codes: it reuses an
//! existing mapping when one exists, otherwise it drives a
//! [`Generator`](pinhole_generator::Generator) through a bounded
//! generate-then-persist loop and lets the repository arbitrate collisions.

pub mod service;

pub use service::{ShortenerService, ShortenerSettings};
