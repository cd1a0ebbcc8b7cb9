//! Repository implementations backing the persistence contract.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use pinhole_core::repository::{Repository, Result, UrlMapping};
pub use pinhole_core::StorageError;
