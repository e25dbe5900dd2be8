//! Storage module for the API.
//!
//! Provides PostgreSQL and in-memory storage backends plus local media storage.

pub mod error;
pub mod media;
pub mod traits;

// Storage backend implementations
pub mod memory;
pub mod postgres;

pub use error::StorageError;
pub use media::{LocalMediaStore, MediaStore};
pub use memory::MemoryStorageBackend;
pub use postgres::PostgresStorageBackend;
pub use traits::{AdFilter, StorageBackend};
