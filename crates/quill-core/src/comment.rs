//! Comment types and the threaded read model.
//!
//! Comments are never edited in place: they exist or they don't. Threading
//! is exactly one level deep — a reply always points at a top-level comment
//! of the same post, and replies to replies are rejected at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A stored comment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
  pub id:         Uuid,
  pub post_id:    Uuid,
  /// Always the authenticated author — never taken from the request body.
  pub user_id:    Uuid,
  /// `None` marks a top-level comment.
  pub parent_id:  Option<Uuid>,
  pub content:    String,
  pub created_at: DateTime<Utc>,
}

impl Comment {
  pub fn is_top_level(&self) -> bool { self.parent_id.is_none() }
}

/// Display fields of the comment author, joined from the profile row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentAuthor {
  pub name:  String,
  pub email: String,
}

/// A comment bundled with its author's display fields.
///
/// The author is `None` only when the profile row has gone missing — the
/// comment itself is still rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
  #[serde(flatten)]
  pub comment: Comment,
  pub author:  Option<CommentAuthor>,
}

/// A top-level comment with its direct replies — the threaded read model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThread {
  #[serde(flatten)]
  pub comment: CommentWithAuthor,
  /// Direct replies, oldest first. Never nested further.
  pub replies: Vec<CommentWithAuthor>,
}

/// Summary of the owning post, joined onto moderation listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
  pub id:    Uuid,
  pub title: String,
  pub slug:  String,
}

/// A comment as shown in the admin moderation view.
///
/// `post` is `None` when the referenced post has been deleted — the comment
/// survives post deletion rather than cascading away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationComment {
  #[serde(flatten)]
  pub comment: CommentWithAuthor,
  pub post:    Option<PostSummary>,
}

/// Input for comment creation. Carries no author field by construction.
#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
  pub post_id:   Uuid,
  pub parent_id: Option<Uuid>,
  pub content:   String,
}

impl NewComment {
  /// Validate the content: it must be non-blank after trimming.
  pub fn validated(self) -> Result<Self> {
    if self.content.trim().is_empty() {
      return Err(Error::EmptyComment);
    }
    Ok(self)
  }
}
