//! Revision coordinator
//!
//! Stateless service over a [`RevisionStore`]: every call names the acting
//! user and the entity, checks permission, reads what it needs from the
//! store and either returns a draft, appends a revision or reports a
//! conflict.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use djiki_diff::DiffEngine;
use djiki_domain::{
    Actor, AuthBackend, ContentEntity, DefaultTitleNormalizer, DomainError, DomainResult,
    EntityKey, EntityKind, EntityName, NewRevision, PolicyAuthBackend, Revision,
    RevisionContent, RevisionId, RevisionStore, TitleNormalizer,
};
use tracing::{debug, info, warn};

use crate::config::{CoordinatorConfig, WikiConfig, DEFAULT_TIMESTAMP_FORMAT};
use crate::models::{PatchConflict, RevisionDiff, RevisionDraft, UndoCommitOutcome, UndoOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    View,
    ViewHistory,
    Edit,
    Create,
}

impl Action {
    fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::ViewHistory => "view history of",
            Action::Edit => "edit",
            Action::Create => "create",
        }
    }
}

/// Coordinates revision reads, edits, reverts and undos
pub struct RevisionCoordinator {
    store: Arc<dyn RevisionStore>,
    auth: Arc<dyn AuthBackend>,
    titles: Arc<dyn TitleNormalizer>,
    engine: DiffEngine,
    config: CoordinatorConfig,
}

impl RevisionCoordinator {
    /// Create a coordinator with default configuration
    pub fn new(
        store: Arc<dyn RevisionStore>,
        auth: Arc<dyn AuthBackend>,
        titles: Arc<dyn TitleNormalizer>,
    ) -> Self {
        Self::with_config(store, auth, titles, &WikiConfig::default())
    }

    /// Create a coordinator with explicit collaborators and configuration
    pub fn with_config(
        store: Arc<dyn RevisionStore>,
        auth: Arc<dyn AuthBackend>,
        titles: Arc<dyn TitleNormalizer>,
        config: &WikiConfig,
    ) -> Self {
        Self {
            store,
            auth,
            titles,
            engine: DiffEngine::with_config(config.diff.clone()),
            config: config.coordinator.clone(),
        }
    }

    /// Create a coordinator whose permissions come from the config policy
    pub fn from_config(store: Arc<dyn RevisionStore>, config: &WikiConfig) -> Self {
        Self::with_config(
            store,
            Arc::new(PolicyAuthBackend::new(config.permissions.clone())),
            Arc::new(DefaultTitleNormalizer),
            config,
        )
    }

    /// Diff engine in use
    pub fn engine(&self) -> &DiffEngine {
        &self.engine
    }

    /// Coordinator settings in use
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Normalize a title into an entity key
    pub fn key(&self, kind: EntityKind, title: &str) -> DomainResult<EntityKey> {
        let name = EntityName::new(title, self.titles.as_ref())?;
        Ok(EntityKey::new(kind, name))
    }

    /// Current content, or a specific revision
    ///
    /// Viewing a specific revision also requires history access.
    pub fn view(
        &self,
        actor: &Actor,
        kind: EntityKind,
        title: &str,
        revision: Option<&RevisionId>,
    ) -> DomainResult<Revision> {
        let key = self.existing(kind, title)?;
        self.authorize(actor, &key, Action::View)?;
        match revision {
            Some(id) => {
                self.authorize(actor, &key, Action::ViewHistory)?;
                self.store.get(&key, id)
            }
            None => self.store.latest(&key),
        }
    }

    /// Entities of a kind the actor may view, ordered by slug
    pub fn list(&self, actor: &Actor, kind: EntityKind) -> DomainResult<Vec<ContentEntity>> {
        Ok(self
            .store
            .list(kind)?
            .into_iter()
            .filter(|entity| self.auth.can_view(actor, &entity.key))
            .collect())
    }

    /// All revisions, newest first
    pub fn history(
        &self,
        actor: &Actor,
        kind: EntityKind,
        title: &str,
    ) -> DomainResult<Vec<Revision>> {
        let key = self.existing(kind, title)?;
        self.authorize(actor, &key, Action::ViewHistory)?;
        self.store.history(&key)
    }

    /// Display diff between two revisions of the same entity
    pub fn diff(
        &self,
        actor: &Actor,
        kind: EntityKind,
        title: &str,
        from: &RevisionId,
        to: &RevisionId,
    ) -> DomainResult<RevisionDiff> {
        let key = self.existing(kind, title)?;
        self.authorize(actor, &key, Action::ViewHistory)?;
        let from = self.store.get(&key, from)?;
        let to = self.store.get(&key, to)?;
        let diff = self
            .engine
            .compute_diff(&from.content.diff_text(), &to.content.diff_text());
        Ok(RevisionDiff { from, to, diff })
    }

    /// Prefilled draft for the edit form
    ///
    /// Carries the head content of an existing entity, or empty content for
    /// one about to be created.
    pub fn edit_draft(
        &self,
        actor: &Actor,
        kind: EntityKind,
        title: &str,
    ) -> DomainResult<RevisionDraft> {
        let key = self.key(kind, title)?;
        if self.store.exists(&key)? {
            self.authorize(actor, &key, Action::Edit)?;
            let head = self.store.latest(&key)?;
            Ok(RevisionDraft {
                entity: key,
                content: head.content,
                description: String::new(),
                author: actor.author(),
                base: Some(head.id),
            })
        } else {
            self.authorize(actor, &key, Action::Create)?;
            Ok(RevisionDraft {
                entity: key,
                content: RevisionContent::empty(kind),
                description: String::new(),
                author: actor.author(),
                base: None,
            })
        }
    }

    /// Append new content on top of `base`
    ///
    /// `base` must be the head the caller edited, `None` to create the entity.
    pub fn edit(
        &self,
        actor: &Actor,
        kind: EntityKind,
        title: &str,
        content: RevisionContent,
        description: &str,
        base: Option<RevisionId>,
    ) -> DomainResult<Revision> {
        let draft = RevisionDraft {
            entity: self.key(kind, title)?,
            content,
            description: description.to_string(),
            author: actor.author(),
            base,
        };
        self.commit(actor, draft)
    }

    /// Draft restoring the content of `target`
    pub fn revert_draft(
        &self,
        actor: &Actor,
        kind: EntityKind,
        title: &str,
        target: &RevisionId,
    ) -> DomainResult<RevisionDraft> {
        let key = self.existing(kind, title)?;
        self.authorize(actor, &key, Action::Edit)?;
        let target = self.store.get(&key, target)?;
        let head = self.store.latest(&key)?;

        Ok(RevisionDraft {
            description: self.describe("Reverted to", &target),
            entity: key,
            content: target.content,
            author: actor.author(),
            base: Some(head.id),
        })
    }

    /// Append a revision restoring the content of `target`
    ///
    /// Reverting never conflicts, so a lost race is retried against the new
    /// head up to `max_commit_retries` times.
    pub fn revert(
        &self,
        actor: &Actor,
        kind: EntityKind,
        title: &str,
        target: &RevisionId,
    ) -> DomainResult<Revision> {
        let mut attempt = 0;
        loop {
            let draft = self.revert_draft(actor, kind, title, target)?;
            match self.commit(actor, draft) {
                Ok(revision) => {
                    info!("Reverted {} to revision {}", revision.entity, target);
                    return Ok(revision);
                }
                Err(err) if err.is_retryable() && attempt < self.config.max_commit_retries => {
                    attempt += 1;
                    debug!(attempt, error = %err, "Retrying revert against new head");
                }
                Err(err) => {
                    if err.is_retryable() {
                        warn!(attempts = attempt + 1, "Revert gave up after losing every race");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Compute the undo of `target` against the current head
    ///
    /// The patch from `target` back to its predecessor is applied to the
    /// head. When every hunk applies the result is returned as a draft;
    /// otherwise nothing is written and the conflict is reported.
    pub fn undo(
        &self,
        actor: &Actor,
        kind: EntityKind,
        title: &str,
        target: &RevisionId,
    ) -> DomainResult<UndoOutcome> {
        let key = self.existing(kind, title)?;
        self.authorize(actor, &key, Action::Edit)?;
        let target = self.store.get(&key, target)?;
        let predecessor = self.store.before(&key, target.created_at)?;
        let head = self.store.latest(&key)?;

        let outcome = match key.kind {
            EntityKind::Page => self.undo_text(actor, &key, &target, predecessor.as_ref(), &head),
            EntityKind::Image => {
                self.undo_image(actor, &key, &target, predecessor.as_ref(), &head)
            }
        };

        match &outcome {
            UndoOutcome::Draft(_) => info!("Prepared undo of revision {} on {}", target.id, key),
            UndoOutcome::Conflict(conflict) => warn!(
                entity = %key,
                target = %target.id,
                failed = ?conflict.failed_hunks,
                total = conflict.total_hunks,
                "Undo conflicts with current content"
            ),
        }
        Ok(outcome)
    }

    /// Append a draft on top of its base
    ///
    /// The revision is authored by `actor`. A head that moved since the
    /// draft was computed yields `ConcurrentModification`.
    pub fn commit(&self, actor: &Actor, draft: RevisionDraft) -> DomainResult<Revision> {
        let RevisionDraft {
            entity,
            content,
            description,
            base,
            ..
        } = draft;

        if content.kind() != entity.kind {
            return Err(DomainError::invalid_content(
                &entity,
                format!("expected {} content, got {}", entity.kind, content.kind()),
            ));
        }
        let action = if self.store.exists(&entity)? {
            Action::Edit
        } else {
            Action::Create
        };
        self.authorize(actor, &entity, action)?;

        let revision = self.store.append(
            &entity,
            NewRevision::new(content, description, actor.author(), base),
        )?;
        info!("Appended revision {} to {} by {}", revision.id, entity, actor);
        Ok(revision)
    }

    /// Undo `target` and commit the result
    ///
    /// A lost race re-runs the undo against the new head, up to
    /// `max_commit_retries` times. Conflicts are returned without writing.
    pub fn undo_and_commit(
        &self,
        actor: &Actor,
        kind: EntityKind,
        title: &str,
        target: &RevisionId,
    ) -> DomainResult<UndoCommitOutcome> {
        let mut attempt = 0;
        loop {
            let draft = match self.undo(actor, kind, title, target)? {
                UndoOutcome::Draft(draft) => draft,
                UndoOutcome::Conflict(conflict) => return Ok(UndoCommitOutcome::Conflict(conflict)),
            };
            match self.commit(actor, draft) {
                Ok(revision) => return Ok(UndoCommitOutcome::Committed(revision)),
                Err(err) if err.is_retryable() && attempt < self.config.max_commit_retries => {
                    attempt += 1;
                    debug!(attempt, error = %err, "Retrying undo against new head");
                }
                Err(err) => {
                    if err.is_retryable() {
                        warn!(attempts = attempt + 1, "Undo gave up after losing every race");
                    }
                    return Err(err);
                }
            }
        }
    }

    fn undo_text(
        &self,
        actor: &Actor,
        key: &EntityKey,
        target: &Revision,
        predecessor: Option<&Revision>,
        head: &Revision,
    ) -> UndoOutcome {
        let previous = predecessor
            .map(|p| p.content.diff_text())
            .unwrap_or_default();
        let patch = self.engine.make_patch(&target.content.diff_text(), &previous);
        let result = self.engine.apply_patch(&patch, &head.content.diff_text());

        if result.all_applied() {
            UndoOutcome::Draft(RevisionDraft {
                entity: key.clone(),
                content: RevisionContent::Text(result.text),
                description: self.describe("Undid", target),
                author: actor.author(),
                base: Some(head.id),
            })
        } else {
            UndoOutcome::Conflict(PatchConflict {
                target: target.id,
                predecessor: predecessor.map(|p| p.id),
                failed_hunks: result.failed_hunks(),
                total_hunks: patch.len(),
            })
        }
    }

    // Binary content cannot be patched: undo only while the target is still the head content
    fn undo_image(
        &self,
        actor: &Actor,
        key: &EntityKey,
        target: &Revision,
        predecessor: Option<&Revision>,
        head: &Revision,
    ) -> UndoOutcome {
        if head.content != target.content {
            return UndoOutcome::Conflict(PatchConflict {
                target: target.id,
                predecessor: predecessor.map(|p| p.id),
                failed_hunks: vec![0],
                total_hunks: 1,
            });
        }
        UndoOutcome::Draft(RevisionDraft {
            entity: key.clone(),
            content: predecessor
                .map(|p| p.content.clone())
                .unwrap_or_else(|| RevisionContent::empty(EntityKind::Image)),
            description: self.describe("Undid", target),
            author: actor.author(),
            base: Some(head.id),
        })
    }

    fn existing(&self, kind: EntityKind, title: &str) -> DomainResult<EntityKey> {
        let key = self.key(kind, title)?;
        if !self.store.exists(&key)? {
            return Err(DomainError::entity_not_found(&key));
        }
        Ok(key)
    }

    fn authorize(&self, actor: &Actor, key: &EntityKey, action: Action) -> DomainResult<()> {
        let anonymous_ok = self.config.allow_anonymous_edits || !actor.is_anonymous();
        let allowed = match action {
            Action::View => self.auth.can_view(actor, key),
            Action::ViewHistory => self.auth.can_view_history(actor, key),
            Action::Edit => anonymous_ok && self.auth.can_edit(actor, key),
            Action::Create => anonymous_ok && self.auth.can_create(actor, key),
        };
        if allowed {
            Ok(())
        } else {
            warn!("Permission denied: {} cannot {} {}", actor, action.as_str(), key);
            Err(DomainError::permission_denied(action.as_str(), key))
        }
    }

    fn describe(&self, verb: &str, revision: &Revision) -> String {
        let time = self.format_time(revision.created_at);
        match revision.author_name() {
            Some(user) => format!("{} revision of {} by {}.", verb, time, user),
            None => format!("{} anonymous revision of {}.", verb, time),
        }
    }

    fn format_time(&self, at: DateTime<Utc>) -> String {
        let mut out = String::new();
        if write!(out, "{}", at.format(&self.config.timestamp_format)).is_err() {
            out.clear();
            let _ = write!(out, "{}", at.format(DEFAULT_TIMESTAMP_FORMAT));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use djiki_domain::{AllowAll, AuthorRef, ImageBlob, PermissionPolicy};
    use djiki_persistence::InMemoryRevisionStore;

    const PAGE: EntityKind = EntityKind::Page;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    struct Fixture {
        store: Arc<InMemoryRevisionStore>,
        coordinator: RevisionCoordinator,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with(Arc::new(AllowAll), WikiConfig::default())
        }

        fn with(auth: Arc<dyn AuthBackend>, config: WikiConfig) -> Self {
            let store = Arc::new(InMemoryRevisionStore::new());
            let coordinator = RevisionCoordinator::with_config(
                store.clone(),
                auth,
                Arc::new(DefaultTitleNormalizer),
                &config,
            );
            Self { store, coordinator }
        }

        fn key(&self, title: &str) -> EntityKey {
            self.coordinator.key(PAGE, title).unwrap()
        }

        /// Seed a page with texts at consecutive seconds from 1_700_000_000
        fn seed(&self, title: &str, texts: &[&str]) -> Vec<Revision> {
            let key = self.key(title);
            let mut base = None;
            let mut out = Vec::new();
            for (i, text) in texts.iter().enumerate() {
                let rev = self
                    .store
                    .append(&key, NewRevision::text(*text, base).at(ts(1_700_000_000 + i as i64)))
                    .unwrap();
                base = Some(rev.id);
                out.push(rev);
            }
            out
        }

        fn push(&self, title: &str, text: &str) -> Revision {
            let key = self.key(title);
            let head = self.store.latest(&key).unwrap();
            self.store
                .append(&key, NewRevision::text(text, Some(head.id)))
                .unwrap()
        }
    }

    fn alice() -> Actor {
        Actor::user("u1", "alice")
    }

    #[test]
    fn test_undo_latest_revision() {
        let fx = Fixture::new();
        let revs = fx.seed("Main", &["", "hello", "hello world"]);

        let outcome = fx.coordinator.undo(&alice(), PAGE, "Main", &revs[2].id).unwrap();
        let draft = outcome.draft().unwrap();
        assert_eq!(draft.content, RevisionContent::Text("hello".into()));
        assert_eq!(draft.base, Some(revs[2].id));
        assert_eq!(draft.author, Some(AuthorRef::new("u1", "alice")));
        assert_eq!(
            draft.description,
            "Undid anonymous revision of 2023-11-14 22:13:22."
        );
        // undo alone writes nothing
        assert_eq!(fx.store.history(&fx.key("Main")).unwrap().len(), 3);
    }

    #[test]
    fn test_undo_applies_over_later_edit() {
        let fx = Fixture::new();
        let revs = fx.seed("Main", &["", "hello", "hello world"]);
        let head = fx.push("Main", "hello world!");

        let outcome = fx.coordinator.undo(&alice(), PAGE, "Main", &revs[2].id).unwrap();
        let draft = outcome.draft().unwrap();
        assert_eq!(draft.content.as_text(), Some("hello!"));
        assert_eq!(draft.base, Some(head.id));
    }

    #[test]
    fn test_undo_conflict() {
        let fx = Fixture::new();
        let revs = fx.seed("Main", &["", "hello", "hello world"]);
        fx.push("Main", "xyz");

        let outcome = fx.coordinator.undo(&alice(), PAGE, "Main", &revs[2].id).unwrap();
        assert_eq!(
            outcome.conflict(),
            Some(&PatchConflict {
                target: revs[2].id,
                predecessor: Some(revs[1].id),
                failed_hunks: vec![0],
                total_hunks: 1,
            })
        );
        assert!(!outcome.is_draft());
    }

    #[test]
    fn test_undo_of_no_op_revision_is_trivial() {
        let fx = Fixture::new();
        let revs = fx.seed("Main", &["same", "same"]);
        fx.push("Main", "changed since");

        let outcome = fx.coordinator.undo(&alice(), PAGE, "Main", &revs[1].id).unwrap();
        assert_eq!(
            outcome.draft().unwrap().content.as_text(),
            Some("changed since")
        );
    }

    #[test]
    fn test_undo_describes_named_author() {
        let fx = Fixture::new();
        let key = fx.key("Main");
        let first = fx
            .store
            .append(&key, NewRevision::text("a", None).at(ts(1_700_000_000)))
            .unwrap();
        let second = fx
            .store
            .append(
                &key,
                NewRevision::text("a b", Some(first.id))
                    .with_author(Some(AuthorRef::new("u2", "bob")))
                    .at(ts(1_700_000_060)),
            )
            .unwrap();

        let outcome = fx.coordinator.undo(&alice(), PAGE, "Main", &second.id).unwrap();
        assert_eq!(
            outcome.draft().unwrap().description,
            "Undid revision of 2023-11-14 22:14:20 by bob."
        );
    }

    #[test]
    fn test_undo_unknown_target() {
        let fx = Fixture::new();
        fx.seed("Main", &["x"]);
        let other = fx.seed("Other", &["y"]);

        let err = fx
            .coordinator
            .undo(&alice(), PAGE, "Main", &other[0].id)
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));

        let err = fx
            .coordinator
            .undo(&alice(), PAGE, "Missing", &other[0].id)
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[test]
    fn test_commit_and_stale_commit() {
        let fx = Fixture::new();
        let revs = fx.seed("Main", &["", "hello", "hello world"]);
        let draft = fx
            .coordinator
            .undo(&alice(), PAGE, "Main", &revs[2].id)
            .unwrap()
            .draft()
            .cloned()
            .unwrap();

        let committed = fx.coordinator.commit(&alice(), draft.clone()).unwrap();
        assert_eq!(committed.content.as_text(), Some("hello"));
        assert_eq!(committed.author_name(), Some("alice"));

        let err = fx.coordinator.commit(&alice(), draft).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_undo_and_commit() {
        let fx = Fixture::new();
        let revs = fx.seed("Main", &["", "hello", "hello world"]);
        let outcome = fx
            .coordinator
            .undo_and_commit(&alice(), PAGE, "Main", &revs[2].id)
            .unwrap();
        match outcome {
            UndoCommitOutcome::Committed(rev) => assert_eq!(rev.content.as_text(), Some("hello")),
            other => panic!("expected commit, got {:?}", other),
        }

        fx.push("Main", "xyz");
        let outcome = fx
            .coordinator
            .undo_and_commit(&alice(), PAGE, "Main", &revs[2].id)
            .unwrap();
        assert!(matches!(outcome, UndoCommitOutcome::Conflict(_)));
        assert_eq!(fx.store.latest(&fx.key("Main")).unwrap().content.as_text(), Some("xyz"));
    }

    #[test]
    fn test_revert() {
        let fx = Fixture::new();
        let revs = fx.seed("Main", &["", "hello", "hello world"]);

        let draft = fx
            .coordinator
            .revert_draft(&alice(), PAGE, "Main", &revs[1].id)
            .unwrap();
        assert_eq!(
            draft.description,
            "Reverted to anonymous revision of 2023-11-14 22:13:21."
        );

        let rev = fx.coordinator.revert(&alice(), PAGE, "Main", &revs[1].id).unwrap();
        assert_eq!(rev.content.as_text(), Some("hello"));
        assert_eq!(rev.description, draft.description);
        assert_eq!(rev.author_name(), Some("alice"));
        assert_eq!(fx.store.history(&fx.key("Main")).unwrap().len(), 4);
    }

    #[test]
    fn test_revert_restores_any_content() {
        let fx = Fixture::new();
        let revs = fx.seed("Main", &["original text", "something\nelse\nentirely"]);
        fx.push("Main", "xyz");

        let rev = fx.coordinator.revert(&alice(), PAGE, "Main", &revs[0].id).unwrap();
        assert_eq!(rev.content, revs[0].content);
    }

    #[test]
    fn test_view_and_history() {
        let fx = Fixture::new();
        let revs = fx.seed("Main Page", &["one", "two"]);

        let head = fx.coordinator.view(&Actor::Anonymous, PAGE, "main page", None).unwrap();
        assert_eq!(head.id, revs[1].id);
        let old = fx
            .coordinator
            .view(&Actor::Anonymous, PAGE, "Main_Page", Some(&revs[0].id))
            .unwrap();
        assert_eq!(old.content.as_text(), Some("one"));

        let history = fx.coordinator.history(&alice(), PAGE, "Main Page").unwrap();
        assert_eq!(history.iter().map(|r| r.id).collect::<Vec<_>>(), vec![revs[1].id, revs[0].id]);

        let err = fx.coordinator.view(&alice(), PAGE, "Nowhere", None).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[test]
    fn test_diff() {
        let fx = Fixture::new();
        let revs = fx.seed("Main", &["hello", "hello world"]);
        let diff = fx
            .coordinator
            .diff(&alice(), PAGE, "Main", &revs[0].id, &revs[1].id)
            .unwrap();
        assert_eq!(diff.from.id, revs[0].id);
        assert_eq!(diff.diff.source_text(), "hello");
        assert_eq!(diff.diff.target_text(), "hello world");
        assert_eq!(diff.diff.stats().additions, 6);
    }

    #[test]
    fn test_edit_creates_then_updates() {
        let fx = Fixture::new();
        let draft = fx.coordinator.edit_draft(&alice(), PAGE, "New Page").unwrap();
        assert_eq!(draft.content.as_text(), Some(""));
        assert_eq!(draft.base, None);

        let first = fx
            .coordinator
            .edit(&alice(), PAGE, "New Page", RevisionContent::Text("v1".into()), "created", None)
            .unwrap();
        assert_eq!(first.description, "created");

        let draft = fx.coordinator.edit_draft(&alice(), PAGE, "new_page").unwrap();
        assert_eq!(draft.content.as_text(), Some("v1"));
        assert_eq!(draft.base, Some(first.id));

        let err = fx
            .coordinator
            .edit(&alice(), PAGE, "New Page", RevisionContent::Text("v2".into()), "", None)
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_edit_rejects_wrong_content_kind() {
        let fx = Fixture::new();
        let blob = ImageBlob {
            file_name: "a.png".into(),
            mime_type: "image/png".into(),
            width: 1,
            height: 1,
            bytes: vec![1, 2, 3],
        };
        let err = fx
            .coordinator
            .edit(&alice(), PAGE, "Main", RevisionContent::Image(blob), "", None)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidContent { .. }));
    }

    #[test]
    fn test_invalid_title() {
        let fx = Fixture::new();
        let err = fx.coordinator.view(&alice(), PAGE, "  __ ", None).unwrap_err();
        assert!(matches!(err, DomainError::InvalidName { .. }));
    }

    #[test]
    fn test_policy_denies_anonymous_edits() {
        let policy = PermissionPolicy::read_only_anonymous();
        let fx = Fixture::with(
            Arc::new(PolicyAuthBackend::new(policy)),
            WikiConfig::default(),
        );
        let revs = fx.seed("Main", &["a", "b"]);

        let err = fx
            .coordinator
            .undo(&Actor::Anonymous, PAGE, "Main", &revs[1].id)
            .unwrap_err();
        assert_eq!(err, DomainError::permission_denied("edit", "page:Main"));
        assert!(fx.coordinator.undo(&alice(), PAGE, "Main", &revs[1].id).is_ok());
        assert!(fx.coordinator.view(&Actor::Anonymous, PAGE, "Main", None).is_ok());

        let err = fx
            .coordinator
            .edit_draft(&Actor::Anonymous, PAGE, "Brand New")
            .unwrap_err();
        assert!(matches!(err, DomainError::PermissionDenied { .. }));
    }

    #[test]
    fn test_anonymous_edits_switch() {
        let mut config = WikiConfig::default();
        config.coordinator.allow_anonymous_edits = false;
        let fx = Fixture::with(Arc::new(AllowAll), config);
        let revs = fx.seed("Main", &["a", "b"]);

        let err = fx
            .coordinator
            .revert(&Actor::Anonymous, PAGE, "Main", &revs[0].id)
            .unwrap_err();
        assert!(matches!(err, DomainError::PermissionDenied { .. }));
        assert!(fx.coordinator.revert(&alice(), PAGE, "Main", &revs[0].id).is_ok());
    }

    #[test]
    fn test_history_permission() {
        let policy = PermissionPolicy {
            anonymous_can_view_history: false,
            ..PermissionPolicy::default()
        };
        let fx = Fixture::with(Arc::new(PolicyAuthBackend::new(policy)), WikiConfig::default());
        let revs = fx.seed("Main", &["a", "b"]);

        assert!(fx.coordinator.view(&Actor::Anonymous, PAGE, "Main", None).is_ok());
        assert!(fx
            .coordinator
            .view(&Actor::Anonymous, PAGE, "Main", Some(&revs[0].id))
            .is_err());
        assert!(fx.coordinator.history(&Actor::Anonymous, PAGE, "Main").is_err());
        assert!(fx
            .coordinator
            .diff(&Actor::Anonymous, PAGE, "Main", &revs[0].id, &revs[1].id)
            .is_err());
    }

    #[test]
    fn test_custom_timestamp_format() {
        let mut config = WikiConfig::default();
        config.coordinator.timestamp_format = "%d.%m.%Y".to_string();
        let fx = Fixture::with(Arc::new(AllowAll), config);
        let revs = fx.seed("Main", &["a", "b"]);

        let draft = fx
            .coordinator
            .revert_draft(&alice(), PAGE, "Main", &revs[0].id)
            .unwrap();
        assert_eq!(draft.description, "Reverted to anonymous revision of 14.11.2023.");
    }

    #[test]
    fn test_list_entities() {
        let fx = Fixture::new();
        fx.seed("Beta", &["b"]);
        fx.seed("Alpha", &["a"]);
        let listed: Vec<String> = fx
            .coordinator
            .list(&Actor::Anonymous, PAGE)
            .unwrap()
            .into_iter()
            .map(|e| e.key.name.title().to_string())
            .collect();
        assert_eq!(listed, vec!["Alpha", "Beta"]);
    }

    fn blob(byte: u8) -> RevisionContent {
        RevisionContent::Image(ImageBlob {
            file_name: "logo.png".into(),
            mime_type: "image/png".into(),
            width: 16,
            height: 16,
            bytes: vec![byte; 8],
        })
    }

    #[test]
    fn test_image_undo() {
        let fx = Fixture::new();
        let key = fx.coordinator.key(EntityKind::Image, "Logo").unwrap();
        let first = fx
            .store
            .append(&key, NewRevision::new(blob(1), "upload", None, None))
            .unwrap();
        let second = fx
            .store
            .append(&key, NewRevision::new(blob(2), "reupload", None, Some(first.id)))
            .unwrap();

        let outcome = fx
            .coordinator
            .undo(&alice(), EntityKind::Image, "Logo", &second.id)
            .unwrap();
        assert_eq!(outcome.draft().unwrap().content, blob(1));

        fx.store
            .append(&key, NewRevision::new(blob(3), "third", None, Some(second.id)))
            .unwrap();
        let outcome = fx
            .coordinator
            .undo(&alice(), EntityKind::Image, "Logo", &second.id)
            .unwrap();
        let conflict = outcome.conflict().unwrap();
        assert_eq!(conflict.predecessor, Some(first.id));
        assert_eq!(conflict.total_hunks, 1);
    }

    #[test]
    fn test_image_diff_is_textual() {
        let fx = Fixture::new();
        let key = fx.coordinator.key(EntityKind::Image, "Logo").unwrap();
        let first = fx
            .store
            .append(&key, NewRevision::new(blob(1), "upload", None, None))
            .unwrap();
        let second = fx
            .store
            .append(&key, NewRevision::new(blob(2), "reupload", None, Some(first.id)))
            .unwrap();

        let diff = fx
            .coordinator
            .diff(&alice(), EntityKind::Image, "Logo", &first.id, &second.id)
            .unwrap();
        assert!(!diff.diff.is_unchanged());
        assert!(diff.diff.source_text().contains("file: logo.png"));
    }
}
