//! The `BlogStore` trait and supporting write-outcome types.
//!
//! The trait is implemented by storage backends (e.g. `quill-store-sqlite`).
//! Higher layers (`quill-api`, `quill-server`) depend on this abstraction,
//! not on any concrete backend. Availability is decided once, when the
//! backend is opened — there is no per-call "maybe there" state.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  comment::{Comment, CommentThread, CommentWithAuthor, ModerationComment, NewComment},
  identity::{OtpCode, Profile},
  post::{NewPost, Post, PostChanges, PostFilter},
};

// ─── Write outcomes ──────────────────────────────────────────────────────────

/// Outcome of a post write that can collide on the slug UNIQUE constraint.
///
/// Slug conflicts are detected by the database, not by a pre-check, so two
/// concurrent writers can never both succeed with the same slug.
#[derive(Debug)]
pub enum PostWrite {
  Saved(Post),
  /// Another post already owns the requested slug.
  SlugTaken,
  /// Update target does not exist.
  NotFound,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the Quill persistence gateway.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait BlogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Posts ─────────────────────────────────────────────────────────────

  /// Insert a new post. The store assigns the id and timestamps.
  fn create_post(
    &self,
    input: NewPost,
  ) -> impl Future<Output = Result<PostWrite, Self::Error>> + Send + '_;

  /// Rewrite an existing post's editable fields and refresh `updated_at`.
  fn update_post(
    &self,
    id: Uuid,
    changes: PostChanges,
  ) -> impl Future<Output = Result<PostWrite, Self::Error>> + Send + '_;

  /// Retrieve a post by id. Returns `None` if not found.
  fn get_post(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// Retrieve a post by its (already normalised) slug.
  fn get_post_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + 'a;

  /// List posts matching `filter`, newest first.
  fn list_posts<'a>(
    &'a self,
    filter: &'a PostFilter,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + 'a;

  /// Delete a post row. Comments referencing it are left in place.
  /// Returns `false` if the post did not exist.
  fn delete_post(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Atomically flip the published flag; returns the new value, or `None`
  /// if the post does not exist.
  fn toggle_published(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<bool>, Self::Error>> + Send + '_;

  /// Atomically flip the featured flag; returns the new value, or `None`
  /// if the post does not exist.
  fn toggle_featured(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<bool>, Self::Error>> + Send + '_;

  /// Atomically adjust the upvote counter by `delta`, clamped at zero.
  /// Returns the new count, or `None` if the post does not exist.
  fn adjust_upvotes(
    &self,
    id: Uuid,
    delta: i64,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + '_;

  /// Distinct categories of published posts, sorted.
  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  // ── Comments ──────────────────────────────────────────────────────────

  /// Insert a comment authored by `user_id` and return it joined with the
  /// author's display fields. The store assigns the id and timestamp.
  fn add_comment(
    &self,
    input: NewComment,
    user_id: Uuid,
  ) -> impl Future<Output = Result<CommentWithAuthor, Self::Error>> + Send + '_;

  /// Retrieve a comment by id. Returns `None` if not found.
  fn get_comment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  /// Delete a comment and (via cascade) its direct replies.
  /// Returns `false` if the comment did not exist.
  fn delete_comment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Top-level comments for a post, newest first, each with its direct
  /// replies oldest first. Exactly one level of nesting.
  fn threaded_comments(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CommentThread>, Self::Error>> + Send + '_;

  /// Every comment, newest first, joined with author display fields and an
  /// optional summary of the owning post (absent when the post has been
  /// deleted).
  fn all_comments(
    &self,
  ) -> impl Future<Output = Result<Vec<ModerationComment>, Self::Error>> + Send + '_;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Retrieve a profile by id.
  fn get_profile(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Retrieve a profile by normalised email.
  fn get_profile_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  /// Insert or rewrite the profile row keyed by `profile.id`. Idempotent:
  /// repeated upserts of the same identity leave exactly one row.
  fn upsert_profile(
    &self,
    profile: Profile,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── OTP codes ─────────────────────────────────────────────────────────

  /// Store a sign-in code for `email`, replacing any outstanding one.
  fn put_otp<'a>(
    &'a self,
    email: &'a str,
    code: &'a str,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove and return the stored code for `email`, if any. Consuming on
  /// read means a code can be checked at most once.
  fn take_otp<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<OtpCode>, Self::Error>> + Send + 'a;
}
