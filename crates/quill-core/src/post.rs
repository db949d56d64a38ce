//! Post types and write inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A stored blog post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
  pub id:         Uuid,
  pub title:      String,
  /// Unique across all posts; normalised by [`crate::slug::normalize`].
  pub slug:       String,
  /// HTML body; plain text is wrapped in paragraph markup before storage.
  pub content:    String,
  pub excerpt:    String,
  pub category:   Option<String>,
  pub image_url:  Option<String>,
  pub published:  bool,
  pub featured:   bool,
  /// Non-negative; the store clamps decrements at zero.
  pub upvotes:    i64,
  pub author_id:  Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Fields written on post creation. The store assigns `id`, timestamps,
/// zero upvotes, and an unfeatured state.
#[derive(Debug, Clone)]
pub struct NewPost {
  pub title:     String,
  pub slug:      String,
  pub content:   String,
  pub excerpt:   String,
  pub category:  Option<String>,
  pub image_url: Option<String>,
  pub published: bool,
  pub author_id: Uuid,
}

/// Fields written on post update. `created_at`, `author_id`, `upvotes`, and
/// `featured` are preserved; `updated_at` is refreshed by the store.
#[derive(Debug, Clone)]
pub struct PostChanges {
  pub title:     String,
  pub slug:      String,
  pub content:   String,
  pub excerpt:   String,
  pub category:  Option<String>,
  pub image_url: Option<String>,
  pub published: bool,
}

impl NewPost {
  /// Require the fields that must be present after normalisation.
  pub fn validated(self) -> Result<Self> {
    require(&self.title, "title")?;
    require(&self.slug, "slug")?;
    require(&self.content, "content")?;
    require(&self.excerpt, "excerpt")?;
    Ok(self)
  }
}

impl PostChanges {
  pub fn validated(self) -> Result<Self> {
    require(&self.title, "title")?;
    require(&self.slug, "slug")?;
    require(&self.content, "content")?;
    require(&self.excerpt, "excerpt")?;
    Ok(self)
  }
}

fn require(value: &str, field: &'static str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::MissingField(field));
  }
  Ok(())
}

/// Filter for post listings.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
  pub published_only: bool,
  pub featured_only:  bool,
  pub category:       Option<String>,
}

impl PostFilter {
  /// Listings for the public site: published posts only.
  pub fn published() -> Self {
    Self { published_only: true, ..Self::default() }
  }
}
