//! Content entities and their revisions

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::value_objects::{EntityKey, EntityKind, RevisionId};

/// Weak reference to a user account
///
/// The username is snapshotted when the revision is written so history keeps
/// rendering after the account is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    /// Stable user identifier in the identity provider
    pub user_id: String,
    /// Username at the time of writing
    pub username: String,
}

impl AuthorRef {
    /// Create a new author reference
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }
}

/// Principal performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    /// Unauthenticated visitor
    Anonymous,
    /// Authenticated user
    User(AuthorRef),
}

impl Actor {
    /// Shorthand for an authenticated user
    pub fn user(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Actor::User(AuthorRef::new(user_id, username))
    }

    /// Whether this is the anonymous marker
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Actor::Anonymous)
    }

    /// Author recorded on revisions written by this actor
    pub fn author(&self) -> Option<AuthorRef> {
        match self {
            Actor::Anonymous => None,
            Actor::User(author) => Some(author.clone()),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Anonymous => write!(f, "anonymous"),
            Actor::User(author) => write!(f, "{}", author.username),
        }
    }
}

/// Uploaded image payload with its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlob {
    /// Original file name
    pub file_name: String,
    /// MIME type reported at upload
    pub mime_type: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Raw file bytes
    pub bytes: Vec<u8>,
}

impl ImageBlob {
    /// Hex-encoded SHA256 of the file bytes
    pub fn checksum(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }
}

/// Payload of a revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum RevisionContent {
    /// Page markup
    Text(String),
    /// Image file
    Image(ImageBlob),
}

impl RevisionContent {
    /// Empty content of the given kind, used as the predecessor of a first revision
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Page => RevisionContent::Text(String::new()),
            EntityKind::Image => RevisionContent::Image(ImageBlob {
                file_name: String::new(),
                mime_type: String::new(),
                width: 0,
                height: 0,
                bytes: Vec::new(),
            }),
        }
    }

    /// Entity kind this payload belongs to
    pub fn kind(&self) -> EntityKind {
        match self {
            RevisionContent::Text(_) => EntityKind::Page,
            RevisionContent::Image(_) => EntityKind::Image,
        }
    }

    /// Page text, if this is a text payload
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RevisionContent::Text(text) => Some(text),
            RevisionContent::Image(_) => None,
        }
    }

    /// Text rendering used for diff display
    ///
    /// Images render as a metadata summary plus a content checksum.
    pub fn diff_text(&self) -> String {
        match self {
            RevisionContent::Text(text) => text.clone(),
            RevisionContent::Image(blob) if blob.bytes.is_empty() && blob.file_name.is_empty() => {
                String::new()
            }
            RevisionContent::Image(blob) => format!(
                "file: {}\ntype: {}\nsize: {}x{}\nbytes: {}\nsha256: {}\n",
                blob.file_name,
                blob.mime_type,
                blob.width,
                blob.height,
                blob.bytes.len(),
                blob.checksum()
            ),
        }
    }
}

/// Immutable content snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// Unique identifier
    pub id: RevisionId,
    /// Owning entity
    pub entity: EntityKey,
    /// Creation time, strictly increasing within an entity
    pub created_at: DateTime<Utc>,
    /// Author, `None` for anonymous edits
    pub author: Option<AuthorRef>,
    /// Payload
    pub content: RevisionContent,
    /// Edit summary
    pub description: String,
}

impl Revision {
    /// Author name for messages, `None` for anonymous revisions
    pub fn author_name(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.username.as_str())
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} by {} ({})",
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
            self.entity,
            self.author_name().unwrap_or("anonymous"),
            self.description
        )
    }
}

/// Request to append a revision to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRevision {
    /// Payload
    pub content: RevisionContent,
    /// Edit summary
    pub description: String,
    /// Author, `None` for anonymous edits
    pub author: Option<AuthorRef>,
    /// Head the caller based this revision on, `None` to create the entity
    pub base: Option<RevisionId>,
    /// Explicit timestamp; the store stamps one when absent
    pub created_at: Option<DateTime<Utc>>,
}

impl NewRevision {
    /// Create a request with store-assigned timestamp
    pub fn new(
        content: RevisionContent,
        description: impl Into<String>,
        author: Option<AuthorRef>,
        base: Option<RevisionId>,
    ) -> Self {
        Self {
            content,
            description: description.into(),
            author,
            base,
            created_at: None,
        }
    }

    /// Page text request
    pub fn text(content: impl Into<String>, base: Option<RevisionId>) -> Self {
        Self::new(RevisionContent::Text(content.into()), "", None, base)
    }

    /// Set the edit summary
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the author
    pub fn with_author(mut self, author: Option<AuthorRef>) -> Self {
        self.author = author;
        self
    }

    /// Pin the creation timestamp
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Summary of a content entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntity {
    /// Kind and normalized name
    pub key: EntityKey,
    /// Timestamp of the first revision
    pub created_at: DateTime<Utc>,
    /// Timestamp of the head revision
    pub updated_at: DateTime<Utc>,
    /// Number of revisions
    pub revision_count: usize,
}
