//! Authorization port

use serde::{Deserialize, Serialize};

use crate::entities::Actor;
use crate::value_objects::EntityKey;

/// Authorization predicates consulted before every state-changing or
/// history-revealing operation
pub trait AuthBackend: Send + Sync {
    /// May the actor read the current content
    fn can_view(&self, actor: &Actor, entity: &EntityKey) -> bool;

    /// May the actor append revisions to an existing entity
    fn can_edit(&self, actor: &Actor, entity: &EntityKey) -> bool;

    /// May the actor create the entity
    fn can_create(&self, actor: &Actor, entity: &EntityKey) -> bool;

    /// May the actor see past revisions and diffs
    fn can_view_history(&self, actor: &Actor, entity: &EntityKey) -> bool;
}

/// Backend that grants everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AuthBackend for AllowAll {
    fn can_view(&self, _actor: &Actor, _entity: &EntityKey) -> bool {
        true
    }

    fn can_edit(&self, _actor: &Actor, _entity: &EntityKey) -> bool {
        true
    }

    fn can_create(&self, _actor: &Actor, _entity: &EntityKey) -> bool {
        true
    }

    fn can_view_history(&self, _actor: &Actor, _entity: &EntityKey) -> bool {
        true
    }
}

fn default_true() -> bool {
    true
}

/// What anonymous visitors may do; authenticated users may do everything
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPolicy {
    /// Anonymous read access
    #[serde(default = "default_true")]
    pub anonymous_can_view: bool,
    /// Anonymous edits of existing entities
    #[serde(default = "default_true")]
    pub anonymous_can_edit: bool,
    /// Anonymous creation of entities
    #[serde(default = "default_true")]
    pub anonymous_can_create: bool,
    /// Anonymous access to history and diffs
    #[serde(default = "default_true")]
    pub anonymous_can_view_history: bool,
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self {
            anonymous_can_view: true,
            anonymous_can_edit: true,
            anonymous_can_create: true,
            anonymous_can_view_history: true,
        }
    }
}

impl PermissionPolicy {
    /// Read-only wiki for anonymous visitors
    pub fn read_only_anonymous() -> Self {
        Self {
            anonymous_can_edit: false,
            anonymous_can_create: false,
            ..Self::default()
        }
    }
}

/// Config-driven backend
#[derive(Debug, Clone, Default)]
pub struct PolicyAuthBackend {
    policy: PermissionPolicy,
}

impl PolicyAuthBackend {
    /// Create a backend enforcing the given policy
    pub fn new(policy: PermissionPolicy) -> Self {
        Self { policy }
    }

    fn check(actor: &Actor, anonymous_allowed: bool) -> bool {
        !actor.is_anonymous() || anonymous_allowed
    }
}

impl AuthBackend for PolicyAuthBackend {
    fn can_view(&self, actor: &Actor, _entity: &EntityKey) -> bool {
        Self::check(actor, self.policy.anonymous_can_view)
    }

    fn can_edit(&self, actor: &Actor, _entity: &EntityKey) -> bool {
        Self::check(actor, self.policy.anonymous_can_edit)
    }

    fn can_create(&self, actor: &Actor, _entity: &EntityKey) -> bool {
        Self::check(actor, self.policy.anonymous_can_create)
    }

    fn can_view_history(&self, actor: &Actor, _entity: &EntityKey) -> bool {
        Self::check(actor, self.policy.anonymous_can_view_history)
    }
}
