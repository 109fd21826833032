//! In-Memory Store Implementations
//!
//! Thread-safe in-memory implementations of domain repository interfaces.
//! The reference backend; any store honouring the append contract can replace it.

mod revision_repository;

pub use revision_repository::InMemoryRevisionStore;
