//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Booleans use SQLite's INTEGER 0/1.

use chrono::{DateTime, Utc};
use quill_core::{
  comment::{
    Comment, CommentAuthor, CommentWithAuthor, ModerationComment, PostSummary,
  },
  identity::{Profile, Role},
  post::Post,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── Role ────────────────────────────────────────────────────────────────────

pub fn encode_role(role: Role) -> String { role.to_string() }

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown role: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `posts` row.
pub struct RawPost {
  pub id:         String,
  pub title:      String,
  pub slug:       String,
  pub content:    String,
  pub excerpt:    String,
  pub category:   Option<String>,
  pub image_url:  Option<String>,
  pub published:  bool,
  pub featured:   bool,
  pub upvotes:    i64,
  pub author_id:  String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawPost {
  /// Column list matching the field order of [`RawPost::from_row`].
  pub const COLUMNS: &'static str = "id, title, slug, content, excerpt, \
     category, image_url, published, featured, upvotes, author_id, \
     created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      title:      row.get(1)?,
      slug:       row.get(2)?,
      content:    row.get(3)?,
      excerpt:    row.get(4)?,
      category:   row.get(5)?,
      image_url:  row.get(6)?,
      published:  row.get(7)?,
      featured:   row.get(8)?,
      upvotes:    row.get(9)?,
      author_id:  row.get(10)?,
      created_at: row.get(11)?,
      updated_at: row.get(12)?,
    })
  }

  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      id:         decode_uuid(&self.id)?,
      title:      self.title,
      slug:       self.slug,
      content:    self.content,
      excerpt:    self.excerpt,
      category:   self.category,
      image_url:  self.image_url,
      published:  self.published,
      featured:   self.featured,
      upvotes:    self.upvotes,
      author_id:  decode_uuid(&self.author_id)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings from a `comments` row left-joined with the author profile.
pub struct RawComment {
  pub id:           String,
  pub post_id:      String,
  pub user_id:      String,
  pub parent_id:    Option<String>,
  pub content:      String,
  pub created_at:   String,
  pub author_name:  Option<String>,
  pub author_email: Option<String>,
}

impl RawComment {
  /// Column list for `comments c LEFT JOIN profiles pr ON pr.id = c.user_id`.
  pub const COLUMNS: &'static str = "c.id, c.post_id, c.user_id, \
     c.parent_id, c.content, c.created_at, pr.name, pr.email";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      post_id:      row.get(1)?,
      user_id:      row.get(2)?,
      parent_id:    row.get(3)?,
      content:      row.get(4)?,
      created_at:   row.get(5)?,
      author_name:  row.get(6)?,
      author_email: row.get(7)?,
    })
  }

  pub fn into_comment(self) -> Result<CommentWithAuthor> {
    let author = match (self.author_name, self.author_email) {
      (Some(name), Some(email)) => Some(CommentAuthor { name, email }),
      _ => None,
    };

    Ok(CommentWithAuthor {
      comment: Comment {
        id:         decode_uuid(&self.id)?,
        post_id:    decode_uuid(&self.post_id)?,
        user_id:    decode_uuid(&self.user_id)?,
        parent_id:  self
          .parent_id
          .as_deref()
          .map(decode_uuid)
          .transpose()?,
        content:    self.content,
        created_at: decode_dt(&self.created_at)?,
      },
      author,
    })
  }
}

/// A comment row joined with both its author and a summary of the owning
/// post. The post columns are all-or-nothing: a deleted post leaves them
/// NULL and the linkage decodes to `None`.
pub struct RawModerationComment {
  pub comment:    RawComment,
  pub post_id:    Option<String>,
  pub post_title: Option<String>,
  pub post_slug:  Option<String>,
}

impl RawModerationComment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment:    RawComment::from_row(row)?,
      post_id:    row.get(8)?,
      post_title: row.get(9)?,
      post_slug:  row.get(10)?,
    })
  }

  pub fn into_moderation(self) -> Result<ModerationComment> {
    let post = match (self.post_id, self.post_title, self.post_slug) {
      (Some(id), Some(title), Some(slug)) => Some(PostSummary {
        id: decode_uuid(&id)?,
        title,
        slug,
      }),
      _ => None,
    };

    Ok(ModerationComment { comment: self.comment.into_comment()?, post })
  }
}

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub id:         String,
  pub email:      String,
  pub name:       String,
  pub role:       String,
  pub created_at: String,
}

impl RawProfile {
  pub const COLUMNS: &'static str = "id, email, name, role, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      email:      row.get(1)?,
      name:       row.get(2)?,
      role:       row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      id:         decode_uuid(&self.id)?,
      email:      self.email,
      name:       self.name,
      role:       decode_role(&self.role)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
