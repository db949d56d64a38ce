//! Comment operations and `/comments` handlers.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/api/comments` | `?post_id` required; public, returns threads |
//! | `POST`   | `/api/comments` | Body: [`NewCommentBody`]; requires a session |
//! | `DELETE` | `/api/comments/:id` | Author or admin only |
//! | `GET`    | `/api/admin/comments` | Admin only; all comments, site-wide |
//!
//! Threading is single-level: a comment either stands alone or replies to a
//! top-level comment on the same post. Both rules are enforced here at
//! creation, so the store never holds a deeper chain.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use quill_core::{
  comment::{CommentThread, CommentWithAuthor, ModerationComment, NewComment},
  store::BlogStore,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  identity::{IdentityResolver, require_admin},
  session::{Caller, Session},
};

// ─── Operations ──────────────────────────────────────────────────────────────

/// Add a comment as the sessioned caller.
///
/// The caller's profile is provisioned first so the stored row always joins
/// back to a display name. Replies must target a top-level comment on the
/// same post.
pub async fn add_comment<S: BlogStore>(
  store: &S,
  resolver: &IdentityResolver,
  caller: Option<&Session>,
  input: NewComment,
) -> Result<CommentWithAuthor, ApiError> {
  let session = caller.ok_or(ApiError::Unauthorized)?;
  let input =
    input.validated().map_err(|e| ApiError::Validation(e.to_string()))?;

  resolver.ensure_profile(store, session).await?;

  store
    .get_post(input.post_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

  if let Some(parent_id) = input.parent_id {
    let parent = store
      .get_comment(parent_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| {
        ApiError::Validation("Parent comment not found".to_string())
      })?;
    if parent.post_id != input.post_id {
      return Err(ApiError::Validation(
        "Parent comment belongs to a different post".to_string(),
      ));
    }
    if !parent.is_top_level() {
      return Err(ApiError::Validation(
        "Replies can only target top-level comments".to_string(),
      ));
    }
  }

  store.add_comment(input, session.id).await.map_err(ApiError::store)
}

/// Delete a comment. Allowed for the comment's author and for admins;
/// everyone else gets a forbidden error whether or not they are signed in
/// with some other account. Direct replies go with it.
pub async fn delete_comment<S: BlogStore>(
  store: &S,
  resolver: &IdentityResolver,
  caller: Option<&Session>,
  comment_id: Uuid,
) -> Result<(), ApiError> {
  let session = caller.ok_or(ApiError::Unauthorized)?;

  let comment = store
    .get_comment(comment_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

  let is_author = comment.user_id == session.id;
  if !is_author && !resolver.is_admin(store, session).await {
    return Err(ApiError::Forbidden(
      "You do not have permission to delete this comment".to_string(),
    ));
  }

  store.delete_comment(comment_id).await.map_err(ApiError::store)?;
  Ok(())
}

/// Threaded comments for one post's public page. Store failures degrade to
/// an empty thread list so the page still renders.
pub async fn threaded<S: BlogStore>(
  store: &S,
  post_id: Uuid,
) -> Vec<CommentThread> {
  match store.threaded_comments(post_id).await {
    Ok(threads) => threads,
    Err(e) => {
      tracing::warn!(error = %e, %post_id, "comment listing failed, rendering empty");
      Vec::new()
    }
  }
}

/// Every comment site-wide with its post linkage, for the moderation view.
/// Admin only; the gate sits here, not in the HTTP layer, so no caller of
/// the operation can skip it.
pub async fn all_comments<S: BlogStore>(
  store: &S,
  resolver: &IdentityResolver,
  caller: Option<&Session>,
) -> Result<Vec<ModerationComment>, ApiError> {
  require_admin(
    store,
    resolver,
    caller,
    "You do not have permission to moderate comments",
  )
  .await?;
  store.all_comments().await.map_err(ApiError::store)
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub post_id: Uuid,
}

/// `GET /api/comments?post_id=<id>`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Json<Vec<CommentThread>>
where
  S: BlogStore + 'static,
{
  Json(threaded(state.store.as_ref(), params.post_id).await)
}

/// JSON body accepted by `POST /api/comments`.
#[derive(Debug, Deserialize)]
pub struct NewCommentBody {
  pub post_id:   Uuid,
  pub parent_id: Option<Uuid>,
  pub content:   String,
}

/// `POST /api/comments` — returns 201 + the stored comment with author.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(session): Caller,
  Json(body): Json<NewCommentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: BlogStore + 'static,
{
  let comment = add_comment(
    state.store.as_ref(),
    &state.resolver,
    session.as_ref(),
    NewComment {
      post_id:   body.post_id,
      parent_id: body.parent_id,
      content:   body.content,
    },
  )
  .await?;
  Ok((StatusCode::CREATED, Json(comment)))
}

/// `DELETE /api/comments/:id`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Caller(session): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: BlogStore + 'static,
{
  delete_comment(state.store.as_ref(), &state.resolver, session.as_ref(), id)
    .await?;
  Ok(Json(json!({ "success": true })))
}

/// `GET /api/admin/comments`
pub async fn list_all<S>(
  State(state): State<AppState<S>>,
  Caller(session): Caller,
) -> Result<Json<Vec<ModerationComment>>, ApiError>
where
  S: BlogStore + 'static,
{
  let comments =
    all_comments(state.store.as_ref(), &state.resolver, session.as_ref())
      .await?;
  Ok(Json(comments))
}
