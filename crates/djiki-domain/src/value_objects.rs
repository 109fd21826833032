//! Value objects representing immutable domain concepts

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::ports::TitleNormalizer;

/// Revision identifier - a UUID-based identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevisionId(uuid::Uuid);

impl RevisionId {
    /// Generate a new random revision ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Create from string representation
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(uuid::Uuid::parse_str(s)?))
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for RevisionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of content entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Wiki page with text revisions
    Page,
    /// Uploaded image with binary revisions
    Image,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Page => write!(f, "page"),
            EntityKind::Image => write!(f, "image"),
        }
    }
}

/// Normalized entity name
///
/// Holds both the URL slug and the display title. Two names are equal when
/// their slugs match case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityName {
    slug: String,
    title: String,
}

impl EntityName {
    /// Normalize a raw title or slug into an entity name
    pub fn new(raw: &str, normalizer: &dyn TitleNormalizer) -> DomainResult<Self> {
        let slug = normalizer.urlize(raw);
        if slug.is_empty() {
            return Err(DomainError::InvalidName {
                name: raw.to_string(),
                reason: "name is empty after normalization".to_string(),
            });
        }
        let title = normalizer.deurlize(&slug);
        Ok(Self { slug, title })
    }

    /// URL-safe form
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Human-readable form
    pub fn title(&self) -> &str {
        &self.title
    }

    fn folded(&self) -> String {
        self.slug.to_lowercase()
    }
}

impl PartialEq for EntityName {
    fn eq(&self, other: &Self) -> bool {
        self.folded() == other.folded()
    }
}

impl Eq for EntityName {}

impl Hash for EntityName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded().hash(state);
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug)
    }
}

/// Unique key of a content entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    /// Page or image
    pub kind: EntityKind,
    /// Normalized name
    pub name: EntityName,
}

impl EntityKey {
    /// Create a key from an already normalized name
    pub fn new(kind: EntityKind, name: EntityName) -> Self {
        Self { kind, name }
    }

    /// Key for a page
    pub fn page(name: EntityName) -> Self {
        Self::new(EntityKind::Page, name)
    }

    /// Key for an image
    pub fn image(name: EntityName) -> Self {
        Self::new(EntityKind::Image, name)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}
