//! In-Memory Revision Store Implementation
//!
//! Memory backend, reference implementation of the append contract

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use djiki_domain::{
    entities::{ContentEntity, NewRevision, Revision},
    errors::{DomainError, DomainResult},
    repositories::RevisionStore,
    value_objects::{EntityKey, EntityKind, RevisionId},
};

/// Revisions of one entity, oldest first
#[derive(Debug)]
struct EntityLog {
    key: EntityKey,
    revisions: Vec<Revision>,
}

impl EntityLog {
    fn head(&self) -> Option<&Revision> {
        self.revisions.last()
    }

    fn summary(&self) -> Option<ContentEntity> {
        let first = self.revisions.first()?;
        let head = self.revisions.last()?;
        Some(ContentEntity {
            key: self.key.clone(),
            created_at: first.created_at,
            updated_at: head.created_at,
            revision_count: self.revisions.len(),
        })
    }
}

/// Thread-safe in-memory implementation of RevisionStore
///
/// The outer RwLock only guards the entity map. Each entity has its own
/// Mutex so appends to different entities never contend, while the head
/// check and the push of one append happen under a single lock.
#[derive(Debug, Default)]
pub struct InMemoryRevisionStore {
    entities: RwLock<HashMap<EntityKey, Arc<Mutex<EntityLog>>>>,
}

impl InMemoryRevisionStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entities with at least one revision (for testing)
    pub fn count(&self) -> usize {
        self.entities
            .read()
            .values()
            .filter(|log| !log.lock().revisions.is_empty())
            .count()
    }

    /// Drop every entity (for testing)
    pub fn clear(&self) {
        self.entities.write().clear();
    }

    fn log(&self, key: &EntityKey) -> Option<Arc<Mutex<EntityLog>>> {
        self.entities.read().get(key).cloned()
    }

    /// Admit `revision` against the head of `log` and push it
    fn push(key: &EntityKey, log: &mut EntityLog, revision: NewRevision) -> DomainResult<Revision> {
        let created_at = match admit(key, log.head(), &revision) {
            Ok(at) => at,
            Err(err) => {
                warn!(entity = %key, error = %err, "Rejected revision append");
                return Err(err);
            }
        };

        let stored = Revision {
            id: RevisionId::new(),
            entity: key.clone(),
            created_at,
            author: revision.author,
            content: revision.content,
            description: revision.description,
        };
        log.revisions.push(stored.clone());

        debug!(
            entity = %key,
            revision = %stored.id,
            count = log.revisions.len(),
            "Appended revision"
        );
        Ok(stored)
    }

    fn with_revisions<T>(
        &self,
        key: &EntityKey,
        f: impl FnOnce(&[Revision]) -> DomainResult<T>,
    ) -> DomainResult<T> {
        let log = self
            .log(key)
            .ok_or_else(|| DomainError::entity_not_found(key))?;
        let log = log.lock();
        if log.revisions.is_empty() {
            return Err(DomainError::entity_not_found(key));
        }
        f(&log.revisions)
    }
}

/// Check an append request against the current head and pick its timestamp
fn admit(
    key: &EntityKey,
    head: Option<&Revision>,
    request: &NewRevision,
) -> DomainResult<DateTime<Utc>> {
    if request.content.kind() != key.kind {
        return Err(DomainError::invalid_content(
            key,
            format!(
                "expected {} content, got {}",
                key.kind,
                request.content.kind()
            ),
        ));
    }

    match (head, request.base) {
        (None, None) => {}
        (None, Some(base)) => {
            return Err(DomainError::concurrent_modification(
                key,
                format!("entity does not exist, expected head {}", base),
            ));
        }
        (Some(head), None) => {
            return Err(DomainError::concurrent_modification(
                key,
                format!("entity already exists with head {}", head.id),
            ));
        }
        (Some(head), Some(base)) if head.id != base => {
            return Err(DomainError::concurrent_modification(
                key,
                format!("head moved from {} to {}", base, head.id),
            ));
        }
        (Some(_), Some(_)) => {}
    }

    let floor = head.map(|h| h.created_at);
    match (request.created_at, floor) {
        (Some(at), Some(floor)) if at <= floor => Err(DomainError::concurrent_modification(
            key,
            format!("timestamp {} is not after head timestamp {}", at, floor),
        )),
        (Some(at), _) => Ok(at),
        (None, Some(floor)) => Ok(Utc::now().max(floor + Duration::microseconds(1))),
        (None, None) => Ok(Utc::now()),
    }
}

impl RevisionStore for InMemoryRevisionStore {
    fn append(&self, key: &EntityKey, revision: NewRevision) -> DomainResult<Revision> {
        if let Some(log) = self.log(key) {
            return Self::push(key, &mut log.lock(), revision);
        }

        // Entities enter the map only with an admitted first revision
        let mut entities = self.entities.write();
        let existing = entities.get(key).cloned();
        if let Some(log) = existing {
            drop(entities);
            return Self::push(key, &mut log.lock(), revision);
        }
        let mut log = EntityLog {
            key: key.clone(),
            revisions: Vec::new(),
        };
        let stored = Self::push(key, &mut log, revision)?;
        entities.insert(key.clone(), Arc::new(Mutex::new(log)));
        Ok(stored)
    }

    fn latest(&self, key: &EntityKey) -> DomainResult<Revision> {
        self.with_revisions(key, |revisions| {
            revisions
                .last()
                .cloned()
                .ok_or_else(|| DomainError::entity_not_found(key))
        })
    }

    fn get(&self, key: &EntityKey, id: &RevisionId) -> DomainResult<Revision> {
        let log = self
            .log(key)
            .ok_or_else(|| DomainError::revision_not_found(id))?;
        let log = log.lock();
        log.revisions
            .iter()
            .find(|r| r.id == *id)
            .cloned()
            .ok_or_else(|| DomainError::revision_not_found(id))
    }

    fn history(&self, key: &EntityKey) -> DomainResult<Vec<Revision>> {
        self.with_revisions(key, |revisions| Ok(revisions.iter().rev().cloned().collect()))
    }

    fn before(&self, key: &EntityKey, timestamp: DateTime<Utc>) -> DomainResult<Option<Revision>> {
        self.with_revisions(key, |revisions| {
            Ok(revisions
                .iter()
                .rev()
                .find(|r| r.created_at < timestamp)
                .cloned())
        })
    }

    fn exists(&self, key: &EntityKey) -> DomainResult<bool> {
        Ok(self
            .log(key)
            .map(|log| !log.lock().revisions.is_empty())
            .unwrap_or(false))
    }

    fn entity(&self, key: &EntityKey) -> DomainResult<ContentEntity> {
        let log = self
            .log(key)
            .ok_or_else(|| DomainError::entity_not_found(key))?;
        let summary = log.lock().summary();
        summary.ok_or_else(|| DomainError::entity_not_found(key))
    }

    fn list(&self, kind: EntityKind) -> DomainResult<Vec<ContentEntity>> {
        let logs: Vec<Arc<Mutex<EntityLog>>> = self
            .entities
            .read()
            .iter()
            .filter(|(key, _)| key.kind == kind)
            .map(|(_, log)| log.clone())
            .collect();

        let mut entities: Vec<ContentEntity> =
            logs.iter().filter_map(|log| log.lock().summary()).collect();
        entities.sort_by_key(|e| e.key.name.slug().to_lowercase());
        Ok(entities)
    }
}
