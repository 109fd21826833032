//! Shared fixtures for the djiki end-to-end tests and benches

use std::sync::Arc;

use chrono::{DateTime, Utc};
use djiki_domain::{
    AllowAll, DefaultTitleNormalizer, EntityKey, EntityKind, NewRevision, Revision, RevisionStore,
};
use djiki_persistence::InMemoryRevisionStore;
use djiki_revisions::{RevisionCoordinator, WikiConfig};
use tracing::debug;

/// Timestamp of the first seeded revision (2023-11-14 22:13:20 UTC)
pub const SEED_EPOCH: i64 = 1_700_000_000;

/// Install a test-writer subscriber once per process, capturing debug and above
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// UTC timestamp from seconds since the epoch
pub fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// In-memory wiki: a store plus a coordinator over it
pub struct TestWiki {
    /// Backing store, shared with the coordinator
    pub store: Arc<InMemoryRevisionStore>,
    /// Coordinator under test
    pub coordinator: RevisionCoordinator,
}

impl TestWiki {
    /// Wiki that allows everything, with default tuning
    pub fn new() -> Self {
        init_test_tracing();
        let store = Arc::new(InMemoryRevisionStore::new());
        let coordinator = RevisionCoordinator::with_config(
            store.clone(),
            Arc::new(AllowAll),
            Arc::new(DefaultTitleNormalizer),
            &WikiConfig::default(),
        );
        Self { store, coordinator }
    }

    /// Wiki whose permissions and tuning come from `config`
    pub fn from_config(config: &WikiConfig) -> Self {
        init_test_tracing();
        let store = Arc::new(InMemoryRevisionStore::new());
        let coordinator = RevisionCoordinator::from_config(store.clone(), config);
        Self { store, coordinator }
    }

    /// Key of a page
    pub fn page(&self, title: &str) -> EntityKey {
        self.coordinator
            .key(EntityKind::Page, title)
            .unwrap_or_else(|err| panic!("bad test title {:?}: {}", title, err))
    }

    /// Append anonymous page revisions one second apart from [`SEED_EPOCH`]
    pub fn seed_page(&self, title: &str, texts: &[&str]) -> Vec<Revision> {
        let key = self.page(title);
        let mut base = None;
        let mut revisions = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            let request = NewRevision::text(*text, base).at(timestamp(SEED_EPOCH + i as i64));
            let revision = self
                .store
                .append(&key, request)
                .unwrap_or_else(|err| panic!("seeding {} failed: {}", key, err));
            base = Some(revision.id);
            revisions.push(revision);
        }
        debug!("Seeded {} with {} revisions", key, revisions.len());
        revisions
    }

    /// Append an anonymous revision on top of the current head
    pub fn push_page(&self, title: &str, text: &str) -> Revision {
        let key = self.page(title);
        let base = self.store.latest(&key).ok().map(|head| head.id);
        self.store
            .append(&key, NewRevision::text(text, base))
            .unwrap_or_else(|err| panic!("append to {} failed: {}", key, err))
    }

    /// Current text of a page
    pub fn head_text(&self, title: &str) -> String {
        let key = self.page(title);
        self.store
            .latest(&key)
            .ok()
            .and_then(|head| head.content.as_text().map(str::to_string))
            .unwrap_or_default()
    }
}

impl Default for TestWiki {
    fn default() -> Self {
        Self::new()
    }
}
