//! Core types and traits for the Pinhole URL shortener.
//!
//! This crate provides the types shared by the shortening and resolution
//! services: short codes, stored mappings, the persistence and cache
//! contracts, and the error taxonomy.

pub mod base62;
pub mod cache;
pub mod error;
pub mod repository;
pub mod shortcode;
pub mod shortener;

pub use cache::UrlCache;
pub use error::{ShortenerError, StorageError};
pub use repository::{Repository, UrlMapping, DEFAULT_REQUEST_TIMEOUT};
pub use shortcode::ShortCode;
pub use shortener::{Redirector, Shortener};
