//! djiki Persistence Layer
//!
//! Infrastructure layer providing revision store implementations.
//! This crate implements the `RevisionStore` interface defined in `djiki-domain`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │           Infrastructure Layer           │
//! │  memory/                                 │
//! │  InMemoryRevisionStore                   │
//! └──────────────────────────────────────────┘
//!                     ▲
//!                     │ implements
//!                     ▼
//! ┌──────────────────────────────────────────┐
//! │              Domain Layer                │
//! │  RevisionStore                           │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```
//! use djiki_domain::RevisionStore;
//! use djiki_persistence::InMemoryRevisionStore;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn RevisionStore> = Arc::new(InMemoryRevisionStore::new());
//! ```

pub mod memory;

pub use memory::InMemoryRevisionStore;
