//! Repository interfaces for revision persistence
//!
//! The domain layer defines only the contract; backends live in
//! infrastructure crates.

use chrono::{DateTime, Utc};

use crate::{
    entities::{ContentEntity, NewRevision, Revision},
    errors::DomainResult,
    value_objects::{EntityKey, EntityKind, RevisionId},
};

/// Append-only revision history, one ordered sequence per entity
///
/// Backends must make `append` an atomic compare-and-append per entity:
/// checking the base head and the timestamp order and pushing the revision
/// happen under one critical section. Different entities are independent.
pub trait RevisionStore: Send + Sync {
    /// Append a revision, creating the entity when `base` is `None`
    ///
    /// Fails with `ConcurrentModification` when `base` is not the current
    /// head or an explicit timestamp is not newer than the head.
    fn append(&self, key: &EntityKey, revision: NewRevision) -> DomainResult<Revision>;

    /// Revision with the greatest timestamp
    fn latest(&self, key: &EntityKey) -> DomainResult<Revision>;

    /// Revision by id; `NotFound` if it belongs to another entity
    fn get(&self, key: &EntityKey, id: &RevisionId) -> DomainResult<Revision>;

    /// All revisions, newest first
    fn history(&self, key: &EntityKey) -> DomainResult<Vec<Revision>>;

    /// Latest revision strictly older than `timestamp`
    fn before(&self, key: &EntityKey, timestamp: DateTime<Utc>) -> DomainResult<Option<Revision>>;

    /// Whether the entity has any revision
    fn exists(&self, key: &EntityKey) -> DomainResult<bool>;

    /// Entity summary
    fn entity(&self, key: &EntityKey) -> DomainResult<ContentEntity>;

    /// All entities of a kind, ordered by slug
    fn list(&self, kind: EntityKind) -> DomainResult<Vec<ContentEntity>>;
}
