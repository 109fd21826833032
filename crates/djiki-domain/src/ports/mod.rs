//! Port interfaces for external collaborators
//!
//! The core consumes these; the surrounding application implements them.
//!
//! ## Modules
//!
//! - `auth`: authorization predicates checked before every operation
//! - `title`: title/slug normalization

pub mod auth;
pub mod title;

pub use auth::*;
pub use title::*;
