//! Process-local expiring cache for short code lookups.

pub mod expiring;

pub use expiring::ExpiringCache;
