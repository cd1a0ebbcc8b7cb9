//! Redirector service library.
//!
//! This crate provides a [`RedirectorService`] that resolves short codes to
//! their original URLs through a read-through [`UrlCache`](pinhole_core::UrlCache)
//! in front of a [`Repository`](pinhole_core::Repository), and a
//! [`ClickRecorder`] that counts resolutions off the request path.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pinhole_cache::ExpiringCache;
//! use pinhole_core::Redirector;
//! use pinhole_redirector::{RedirectorService, RedirectorSettings};
//! use pinhole_storage::InMemoryRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = Arc::new(InMemoryRepository::new());
//! let cache = Arc::new(ExpiringCache::new(Duration::from_secs(3600)));
//! let service = RedirectorService::new(
//!     repository,
//!     cache,
//!     RedirectorSettings::builder().build(),
//! );
//!
//! let long_url = service.resolve("abc123").await?;
//! println!("Redirect to: {long_url}");
//! # Ok(())
//! # }
//! ```

pub mod clicks;
pub mod service;

pub use clicks::{ClickRecorder, ClickRecorderSettings};
pub use service::{RedirectorService, RedirectorSettings};
