//! Domain layer for djiki
//!
//! Content entities (pages and images), their immutable revisions, the
//! revision store contract and the ports the core consumes from the
//! surrounding application (authorization and title normalization).

pub mod entities;
pub mod errors;
pub mod ports;
pub mod repositories;
pub mod value_objects;

// Re-export public API
pub use entities::{
    Actor, AuthorRef, ContentEntity, ImageBlob, NewRevision, Revision, RevisionContent,
};
pub use errors::{DomainError, DomainResult};
pub use ports::{
    AllowAll, AuthBackend, DefaultTitleNormalizer, PermissionPolicy, PolicyAuthBackend,
    TitleNormalizer,
};
pub use repositories::RevisionStore;
pub use value_objects::{EntityKey, EntityKind, EntityName, RevisionId};
