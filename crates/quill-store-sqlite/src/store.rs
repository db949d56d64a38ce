//! [`SqliteStore`] — the SQLite implementation of [`BlogStore`].

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use quill_core::{
  comment::{
    Comment, CommentAuthor, CommentThread, CommentWithAuthor,
    ModerationComment, NewComment,
  },
  identity::{OtpCode, Profile},
  post::{NewPost, Post, PostChanges, PostFilter},
  store::{BlogStore, PostWrite},
};

use crate::{
  encode::{
    RawComment, RawModerationComment, RawPost, RawProfile, encode_dt,
    encode_role, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Quill blog store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Detect a UNIQUE constraint failure naming `needle` (e.g. `posts.slug`).
fn is_unique_violation(err: &rusqlite::Error, needle: &str) -> bool {
  match err {
    rusqlite::Error::SqliteFailure(e, Some(msg)) => {
      e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(needle)
    }
    _ => false,
  }
}

/// Closure-side outcome of a post write; decoded into [`PostWrite`] after
/// the call returns.
enum WriteRow {
  Saved(RawPost),
  SlugTaken,
  NotFound,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch a single comment joined with its author's display fields.
  async fn comment_with_author(
    &self,
    id: Uuid,
  ) -> Result<Option<CommentWithAuthor>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawComment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM comments c
                 LEFT JOIN profiles pr ON pr.id = c.user_id
                 WHERE c.id = ?1",
                RawComment::COLUMNS
              ),
              rusqlite::params![id_str],
              RawComment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawComment::into_comment).transpose()
  }
}

// ─── BlogStore impl ──────────────────────────────────────────────────────────

impl BlogStore for SqliteStore {
  type Error = Error;

  // ── Posts ─────────────────────────────────────────────────────────────────

  async fn create_post(&self, input: NewPost) -> Result<PostWrite> {
    let now = Utc::now();
    let post = Post {
      id:         Uuid::new_v4(),
      title:      input.title,
      slug:       input.slug,
      content:    input.content,
      excerpt:    input.excerpt,
      category:   input.category,
      image_url:  input.image_url,
      published:  input.published,
      featured:   false,
      upvotes:    0,
      author_id:  input.author_id,
      created_at: now,
      updated_at: now,
    };

    let id_str        = encode_uuid(post.id);
    let title         = post.title.clone();
    let slug          = post.slug.clone();
    let content       = post.content.clone();
    let excerpt       = post.excerpt.clone();
    let category      = post.category.clone();
    let image_url     = post.image_url.clone();
    let published     = post.published;
    let author_id_str = encode_uuid(post.author_id);
    let at_str        = encode_dt(now);

    let saved: bool = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO posts (
             id, title, slug, content, excerpt, category, image_url,
             published, featured, upvotes, author_id, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, ?9, ?10, ?10)",
          rusqlite::params![
            id_str, title, slug, content, excerpt, category, image_url,
            published, author_id_str, at_str,
          ],
        );
        match result {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e, "posts.slug") => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(if saved { PostWrite::Saved(post) } else { PostWrite::SlugTaken })
  }

  async fn update_post(
    &self,
    id: Uuid,
    changes: PostChanges,
  ) -> Result<PostWrite> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let row: WriteRow = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "UPDATE posts SET
             title = ?1, slug = ?2, content = ?3, excerpt = ?4,
             category = ?5, image_url = ?6, published = ?7, updated_at = ?8
           WHERE id = ?9",
          rusqlite::params![
            changes.title, changes.slug, changes.content, changes.excerpt,
            changes.category, changes.image_url, changes.published,
            at_str, id_str,
          ],
        );
        match result {
          Ok(0) => Ok(WriteRow::NotFound),
          Ok(_) => {
            let raw = conn.query_row(
              &format!("SELECT {} FROM posts WHERE id = ?1", RawPost::COLUMNS),
              rusqlite::params![id_str],
              RawPost::from_row,
            )?;
            Ok(WriteRow::Saved(raw))
          }
          Err(e) if is_unique_violation(&e, "posts.slug") => {
            Ok(WriteRow::SlugTaken)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(match row {
      WriteRow::Saved(raw) => PostWrite::Saved(raw.into_post()?),
      WriteRow::SlugTaken => PostWrite::SlugTaken,
      WriteRow::NotFound => PostWrite::NotFound,
    })
  }

  async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPost> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM posts WHERE id = ?1", RawPost::COLUMNS),
              rusqlite::params![id_str],
              RawPost::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
    let slug = slug.to_owned();

    let raw: Option<RawPost> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM posts WHERE slug = ?1",
                RawPost::COLUMNS
              ),
              rusqlite::params![slug],
              RawPost::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
    let category = filter.category.clone();
    let published_only = filter.published_only;
    let featured_only = filter.featured_only;

    let raws: Vec<RawPost> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<&'static str> = vec![];
        if published_only {
          conds.push("published = 1");
        }
        if featured_only {
          conds.push("featured = 1");
        }
        if category.is_some() {
          conds.push("category = ?1");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {} FROM posts {where_clause} ORDER BY created_at DESC",
          RawPost::COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = if let Some(cat) = category {
          stmt
            .query_map(rusqlite::params![cat], RawPost::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          stmt
            .query_map([], RawPost::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPost::into_post).collect()
  }

  async fn delete_post(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM posts WHERE id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn toggle_published(&self, id: Uuid) -> Result<Option<bool>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let published: Option<bool> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "UPDATE posts SET published = NOT published, updated_at = ?1
               WHERE id = ?2 RETURNING published",
              rusqlite::params![at_str, id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(published)
  }

  async fn toggle_featured(&self, id: Uuid) -> Result<Option<bool>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let featured: Option<bool> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "UPDATE posts SET featured = NOT featured, updated_at = ?1
               WHERE id = ?2 RETURNING featured",
              rusqlite::params![at_str, id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(featured)
  }

  async fn adjust_upvotes(&self, id: Uuid, delta: i64) -> Result<Option<i64>> {
    let id_str = encode_uuid(id);

    // Single conditional UPDATE: concurrent adjustments serialise in the
    // database instead of racing through a read-then-write window.
    let count: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "UPDATE posts SET upvotes = MAX(0, upvotes + ?1)
               WHERE id = ?2 RETURNING upvotes",
              rusqlite::params![delta, id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(count)
  }

  async fn list_categories(&self) -> Result<Vec<String>> {
    let categories: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT category FROM posts
           WHERE category IS NOT NULL AND published = 1
           ORDER BY category",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(categories)
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn add_comment(
    &self,
    input: NewComment,
    user_id: Uuid,
  ) -> Result<CommentWithAuthor> {
    let comment = Comment {
      id:         Uuid::new_v4(),
      post_id:    input.post_id,
      user_id,
      parent_id:  input.parent_id,
      content:    input.content,
      created_at: Utc::now(),
    };

    let id_str      = encode_uuid(comment.id);
    let post_id_str = encode_uuid(comment.post_id);
    let user_id_str = encode_uuid(comment.user_id);
    let parent_str  = comment.parent_id.map(encode_uuid);
    let content     = comment.content.clone();
    let at_str      = encode_dt(comment.created_at);

    let author: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO comments (id, post_id, user_id, parent_id, content, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str, post_id_str, user_id_str, parent_str, content, at_str,
          ],
        )?;

        Ok(
          conn
            .query_row(
              "SELECT name, email FROM profiles WHERE id = ?1",
              rusqlite::params![user_id_str],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(CommentWithAuthor {
      comment,
      author: author.map(|(name, email)| CommentAuthor { name, email }),
    })
  }

  async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
    Ok(self.comment_with_author(id).await?.map(|c| c.comment))
  }

  async fn delete_comment(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    // Direct replies go with the parent via ON DELETE CASCADE.
    let deleted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM comments WHERE id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn threaded_comments(
    &self,
    post_id: Uuid,
  ) -> Result<Vec<CommentThread>> {
    let post_id_str = encode_uuid(post_id);

    let (top_raws, reply_raws): (Vec<RawComment>, Vec<RawComment>) = self
      .conn
      .call(move |conn| {
        let mut top_stmt = conn.prepare(&format!(
          "SELECT {} FROM comments c
           LEFT JOIN profiles pr ON pr.id = c.user_id
           WHERE c.post_id = ?1 AND c.parent_id IS NULL
           ORDER BY c.created_at DESC",
          RawComment::COLUMNS
        ))?;
        let tops = top_stmt
          .query_map(rusqlite::params![post_id_str], RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut reply_stmt = conn.prepare(&format!(
          "SELECT {} FROM comments c
           LEFT JOIN profiles pr ON pr.id = c.user_id
           WHERE c.post_id = ?1 AND c.parent_id IS NOT NULL
           ORDER BY c.created_at ASC",
          RawComment::COLUMNS
        ))?;
        let replies = reply_stmt
          .query_map(rusqlite::params![post_id_str], RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((tops, replies))
      })
      .await?;

    let mut threads: Vec<CommentThread> = top_raws
      .into_iter()
      .map(|raw| {
        Ok(CommentThread { comment: raw.into_comment()?, replies: vec![] })
      })
      .collect::<Result<_>>()?;

    let index: HashMap<Uuid, usize> = threads
      .iter()
      .enumerate()
      .map(|(i, t)| (t.comment.comment.id, i))
      .collect();

    for raw in reply_raws {
      let reply = raw.into_comment()?;
      if let Some(parent_id) = reply.comment.parent_id
        && let Some(&i) = index.get(&parent_id)
      {
        threads[i].replies.push(reply);
      }
    }

    Ok(threads)
  }

  async fn all_comments(&self) -> Result<Vec<ModerationComment>> {
    let raws: Vec<RawModerationComment> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {}, p.id, p.title, p.slug FROM comments c
           LEFT JOIN profiles pr ON pr.id = c.user_id
           LEFT JOIN posts p ON p.id = c.post_id
           ORDER BY c.created_at DESC",
          RawComment::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawModerationComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawModerationComment::into_moderation)
      .collect()
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM profiles WHERE id = ?1",
                RawProfile::COLUMNS
              ),
              rusqlite::params![id_str],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn get_profile_by_email(&self, email: &str) -> Result<Option<Profile>> {
    let email = email.to_owned();

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM profiles WHERE email = ?1",
                RawProfile::COLUMNS
              ),
              rusqlite::params![email],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn upsert_profile(&self, profile: Profile) -> Result<()> {
    let id_str   = encode_uuid(profile.id);
    let email    = profile.email;
    let name     = profile.name;
    let role_str = encode_role(profile.role);
    let at_str   = encode_dt(profile.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (id, email, name, role, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(id) DO UPDATE SET
             email = excluded.email,
             name  = excluded.name,
             role  = excluded.role",
          rusqlite::params![id_str, email, name, role_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  // ── OTP codes ─────────────────────────────────────────────────────────────

  async fn put_otp(
    &self,
    email: &str,
    code: &str,
    expires_at: DateTime<Utc>,
  ) -> Result<()> {
    let email  = email.to_owned();
    let code   = code.to_owned();
    let at_str = encode_dt(expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO auth_email_otps (email, code, expires_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(email) DO UPDATE SET
             code       = excluded.code,
             expires_at = excluded.expires_at",
          rusqlite::params![email, code, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  async fn take_otp(&self, email: &str) -> Result<Option<OtpCode>> {
    let email = email.to_owned();

    let row: Option<(String, String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "DELETE FROM auth_email_otps WHERE email = ?1
               RETURNING email, code, expires_at",
              rusqlite::params![email],
              |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?,
        )
      })
      .await?;

    row
      .map(|(email, code, expires_at)| {
        Ok(OtpCode {
          email,
          code,
          expires_at: crate::encode::decode_dt(&expires_at)?,
        })
      })
      .transpose()
  }
}
