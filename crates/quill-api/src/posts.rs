//! Post operations and `/posts` handlers.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/api/posts` | Public; published posts, optional `?category`, `?featured=true` |
//! | `GET`    | `/api/posts/:slug` | Public; single published post |
//! | `POST`   | `/api/upvotes/:id` | Public; toggles this browser's upvote via cookie |
//! | `GET`    | `/api/categories` | Public; distinct categories of published posts |
//! | `GET`    | `/api/admin/posts` | Admin; all posts including drafts |
//! | `POST`   | `/api/admin/posts` | Admin; create, 201 |
//! | `PUT`    | `/api/admin/posts/:id` | Admin; full update |
//! | `DELETE` | `/api/admin/posts/:id` | Admin |
//! | `POST`   | `/api/admin/posts/:id/publish` | Admin; flips the flag |
//! | `POST`   | `/api/admin/posts/:id/feature` | Admin; flips the flag |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use quill_core::{
  post::{NewPost, Post, PostChanges, PostFilter},
  slug,
  store::{BlogStore, PostWrite},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  identity::{IdentityResolver, require_admin},
  session::{Caller, Session},
};

const MANAGE_DENIED: &str = "You do not have permission to manage posts";

// ─── Operations ──────────────────────────────────────────────────────────────

/// Editor-facing payload for both create and update. The slug may be blank;
/// it is derived from the title in that case.
#[derive(Debug, Clone, Deserialize)]
pub struct PostInput {
  pub title:     String,
  #[serde(default)]
  pub slug:      String,
  pub content:   String,
  #[serde(default)]
  pub excerpt:   String,
  #[serde(default)]
  pub category:  Option<String>,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub published: bool,
}

fn clean_optional(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Create (`id == None`) or update a post. Admin only. The slug is
/// normalised and plain-text content is wrapped in paragraph markup before
/// it reaches the store; slug collisions surface as [`ApiError::SlugTaken`]
/// straight from the store's atomic write.
pub async fn save_post<S: BlogStore>(
  store: &S,
  resolver: &IdentityResolver,
  caller: Option<&Session>,
  id: Option<Uuid>,
  input: PostInput,
) -> Result<Post, ApiError> {
  let session =
    require_admin(store, resolver, caller, MANAGE_DENIED).await?;

  let slug = slug::normalize(&input.slug, &input.title);
  let content = slug::format_content(&input.content);
  let title = input.title.trim().to_string();
  let excerpt = input.excerpt.trim().to_string();
  let category = clean_optional(input.category);
  let image_url = clean_optional(input.image_url);

  let write = match id {
    None => {
      let new_post = NewPost {
        title,
        slug,
        content,
        excerpt,
        category,
        image_url,
        published: input.published,
        author_id: session.id,
      }
      .validated()
      .map_err(|e| ApiError::Validation(e.to_string()))?;
      store.create_post(new_post).await.map_err(ApiError::store)?
    }
    Some(id) => {
      let changes = PostChanges {
        title,
        slug,
        content,
        excerpt,
        category,
        image_url,
        published: input.published,
      }
      .validated()
      .map_err(|e| ApiError::Validation(e.to_string()))?;
      store.update_post(id, changes).await.map_err(ApiError::store)?
    }
  };

  match write {
    PostWrite::Saved(post) => Ok(post),
    PostWrite::SlugTaken => Err(ApiError::SlugTaken),
    PostWrite::NotFound => {
      Err(ApiError::NotFound("Post not found".to_string()))
    }
  }
}

pub async fn delete_post<S: BlogStore>(
  store: &S,
  resolver: &IdentityResolver,
  caller: Option<&Session>,
  id: Uuid,
) -> Result<(), ApiError> {
  require_admin(store, resolver, caller, MANAGE_DENIED).await?;
  if !store.delete_post(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound("Post not found".to_string()));
  }
  Ok(())
}

pub async fn toggle_publish<S: BlogStore>(
  store: &S,
  resolver: &IdentityResolver,
  caller: Option<&Session>,
  id: Uuid,
) -> Result<bool, ApiError> {
  require_admin(store, resolver, caller, MANAGE_DENIED).await?;
  store
    .toggle_published(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

pub async fn toggle_feature<S: BlogStore>(
  store: &S,
  resolver: &IdentityResolver,
  caller: Option<&Session>,
  id: Uuid,
) -> Result<bool, ApiError> {
  require_admin(store, resolver, caller, MANAGE_DENIED).await?;
  store
    .toggle_featured(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

/// Published posts for the public site, newest first. Store failures
/// degrade to an empty listing.
pub async fn list_published<S: BlogStore>(
  store: &S,
  category: Option<String>,
  featured_only: bool,
) -> Vec<Post> {
  let filter = PostFilter {
    category: clean_optional(category),
    featured_only,
    ..PostFilter::published()
  };
  match store.list_posts(&filter).await {
    Ok(posts) => posts,
    Err(e) => {
      tracing::warn!(error = %e, "post listing failed, rendering empty");
      Vec::new()
    }
  }
}

/// A single published post looked up by (normalised) slug. Drafts stay
/// invisible on the public route; missing and unpublished look identical.
pub async fn get_published_by_slug<S: BlogStore>(
  store: &S,
  raw_slug: &str,
) -> Option<Post> {
  let slug = raw_slug.trim().to_lowercase();
  match store.get_post_by_slug(&slug).await {
    Ok(post) => post.filter(|p| p.published),
    Err(e) => {
      tracing::warn!(error = %e, %slug, "post lookup failed");
      None
    }
  }
}

/// Distinct categories across published posts. Degrades to empty.
pub async fn list_categories<S: BlogStore>(store: &S) -> Vec<String> {
  match store.list_categories().await {
    Ok(categories) => categories,
    Err(e) => {
      tracing::warn!(error = %e, "category listing failed, rendering empty");
      Vec::new()
    }
  }
}

/// Every post including drafts, for the admin dashboard. Admin only.
pub async fn list_all_posts<S: BlogStore>(
  store: &S,
  resolver: &IdentityResolver,
  caller: Option<&Session>,
) -> Result<Vec<Post>, ApiError> {
  require_admin(store, resolver, caller, MANAGE_DENIED).await?;
  store.list_posts(&PostFilter::default()).await.map_err(ApiError::store)
}

/// Outcome of an upvote toggle: the new total and whether this browser now
/// counts among the upvoters.
#[derive(Debug, Serialize)]
pub struct UpvoteStatus {
  pub upvotes:     i64,
  pub has_upvoted: bool,
}

/// Flip an anonymous upvote. `currently_upvoted` is what the caller's
/// cookie claims; the counter moves the opposite way, atomically, clamped
/// at zero.
pub async fn toggle_upvote<S: BlogStore>(
  store: &S,
  post_id: Uuid,
  currently_upvoted: bool,
) -> Result<UpvoteStatus, ApiError> {
  let delta = if currently_upvoted { -1 } else { 1 };
  let upvotes = store
    .adjust_upvotes(post_id, delta)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
  Ok(UpvoteStatus { upvotes, has_upvoted: !currently_upvoted })
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub category: Option<String>,
  #[serde(default)]
  pub featured: bool,
}

/// `GET /api/posts[?category=...][&featured=true]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Json<Vec<Post>>
where
  S: BlogStore + 'static,
{
  Json(
    list_published(state.store.as_ref(), params.category, params.featured)
      .await,
  )
}

/// `GET /api/posts/:slug`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(slug): Path<String>,
) -> Result<Json<Post>, ApiError>
where
  S: BlogStore + 'static,
{
  get_published_by_slug(state.store.as_ref(), &slug)
    .await
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

/// `GET /api/categories`
pub async fn categories<S>(
  State(state): State<AppState<S>>,
) -> Json<Vec<String>>
where
  S: BlogStore + 'static,
{
  Json(list_categories(state.store.as_ref()).await)
}

/// `POST /api/upvotes/:id`
///
/// The per-post cookie is the only record of this browser's vote; the
/// response jar sets it on upvote and clears it on un-vote.
pub async fn upvote<S>(
  State(state): State<AppState<S>>,
  jar: CookieJar,
  Path(id): Path<Uuid>,
) -> Result<(CookieJar, Json<UpvoteStatus>), ApiError>
where
  S: BlogStore + 'static,
{
  let cookie_name = format!("upvote-{id}");
  let currently_upvoted =
    jar.get(&cookie_name).map(|c| c.value() == "true").unwrap_or(false);

  let status =
    toggle_upvote(state.store.as_ref(), id, currently_upvoted).await?;

  let jar = if status.has_upvoted {
    jar.add(
      Cookie::build((cookie_name, "true")).path("/").permanent().build(),
    )
  } else {
    jar.remove(Cookie::build(cookie_name).path("/").build())
  };
  Ok((jar, Json(status)))
}

/// `GET /api/admin/posts`
pub async fn list_all<S>(
  State(state): State<AppState<S>>,
  Caller(session): Caller,
) -> Result<Json<Vec<Post>>, ApiError>
where
  S: BlogStore + 'static,
{
  let posts =
    list_all_posts(state.store.as_ref(), &state.resolver, session.as_ref())
      .await?;
  Ok(Json(posts))
}

/// `POST /api/admin/posts` — returns 201 + the stored post.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(session): Caller,
  Json(body): Json<PostInput>,
) -> Result<impl IntoResponse, ApiError>
where
  S: BlogStore + 'static,
{
  let post = save_post(
    state.store.as_ref(),
    &state.resolver,
    session.as_ref(),
    None,
    body,
  )
  .await?;
  Ok((StatusCode::CREATED, Json(post)))
}

/// `PUT /api/admin/posts/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Caller(session): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<PostInput>,
) -> Result<Json<Post>, ApiError>
where
  S: BlogStore + 'static,
{
  let post = save_post(
    state.store.as_ref(),
    &state.resolver,
    session.as_ref(),
    Some(id),
    body,
  )
  .await?;
  Ok(Json(post))
}

/// `DELETE /api/admin/posts/:id`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Caller(session): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: BlogStore + 'static,
{
  delete_post(state.store.as_ref(), &state.resolver, session.as_ref(), id)
    .await?;
  Ok(Json(json!({ "success": true })))
}

/// `POST /api/admin/posts/:id/publish`
pub async fn publish<S>(
  State(state): State<AppState<S>>,
  Caller(session): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: BlogStore + 'static,
{
  let published =
    toggle_publish(state.store.as_ref(), &state.resolver, session.as_ref(), id)
      .await?;
  Ok(Json(json!({ "published": published })))
}

/// `POST /api/admin/posts/:id/feature`
pub async fn feature<S>(
  State(state): State<AppState<S>>,
  Caller(session): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: BlogStore + 'static,
{
  let featured =
    toggle_feature(state.store.as_ref(), &state.resolver, session.as_ref(), id)
      .await?;
  Ok(Json(json!({ "featured": featured })))
}

#[cfg(test)]
mod tests {
  use quill_store_sqlite::SqliteStore;

  use super::*;

  async fn store() -> SqliteStore {
    SqliteStore::open_in_memory().await.unwrap()
  }

  fn resolver() -> IdentityResolver {
    IdentityResolver::new(["admin@example.com"])
  }

  fn admin() -> Session {
    Session {
      id:    Uuid::new_v4(),
      email: "admin@example.com".into(),
      name:  "Admin".into(),
    }
  }

  fn input(title: &str) -> PostInput {
    PostInput {
      title:     title.into(),
      slug:      String::new(),
      content:   "First line.\n\nSecond paragraph.".into(),
      excerpt:   "An excerpt".into(),
      category:  Some("Essays".into()),
      image_url: None,
      published: true,
    }
  }

  #[tokio::test]
  async fn save_requires_an_admin() {
    let store = store().await;
    let resolver = resolver();

    let err = save_post(&store, &resolver, None, None, input("Hi"))
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));

    let reader = Session {
      id:    Uuid::new_v4(),
      email: "reader@example.com".into(),
      name:  "Reader".into(),
    };
    let err =
      save_post(&store, &resolver, Some(&reader), None, input("Hi"))
        .await
        .unwrap_err();
    assert!(
      matches!(err, ApiError::Forbidden(m) if m == MANAGE_DENIED)
    );
  }

  #[tokio::test]
  async fn create_derives_slug_and_formats_content() {
    let store = store().await;
    let admin = admin();

    let post = save_post(
      &store,
      &resolver(),
      Some(&admin),
      None,
      input("Hôtel des Idées!"),
    )
    .await
    .unwrap();

    assert_eq!(post.slug, "hotel-des-idees");
    assert!(post.content.starts_with("<p>First line.</p>"));
    assert_eq!(post.author_id, admin.id);
  }

  #[tokio::test]
  async fn duplicate_slugs_conflict_and_missing_ids_are_not_found() {
    let store = store().await;
    let resolver = resolver();
    let admin = admin();

    save_post(&store, &resolver, Some(&admin), None, input("Same Title"))
      .await
      .unwrap();
    let err =
      save_post(&store, &resolver, Some(&admin), None, input("Same Title"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::SlugTaken));

    let err = save_post(
      &store,
      &resolver,
      Some(&admin),
      Some(Uuid::new_v4()),
      input("Whatever"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
  }

  #[tokio::test]
  async fn blank_title_is_rejected_before_the_store() {
    let store = store().await;
    let err =
      save_post(&store, &resolver(), Some(&admin()), None, input("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
  }

  #[tokio::test]
  async fn public_reads_only_see_published_posts() {
    let store = store().await;
    let resolver = resolver();
    let admin = admin();

    let mut draft = input("Draft Post");
    draft.published = false;
    save_post(&store, &resolver, Some(&admin), None, draft).await.unwrap();
    let live =
      save_post(&store, &resolver, Some(&admin), None, input("Live Post"))
        .await
        .unwrap();

    let listed = list_published(&store, None, false).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, live.id);

    assert!(get_published_by_slug(&store, "draft-post").await.is_none());
    assert!(
      get_published_by_slug(&store, "  LIVE-POST ").await.is_some(),
      "slug lookup should normalise its input"
    );

    let all =
      list_all_posts(&store, &resolver, Some(&admin)).await.unwrap();
    assert_eq!(all.len(), 2);
  }

  #[tokio::test]
  async fn upvote_toggles_against_the_cookie_state() {
    let store = store().await;
    let post =
      save_post(&store, &resolver(), Some(&admin()), None, input("Voted"))
        .await
        .unwrap();

    let up = toggle_upvote(&store, post.id, false).await.unwrap();
    assert_eq!(up.upvotes, 1);
    assert!(up.has_upvoted);

    let down = toggle_upvote(&store, post.id, true).await.unwrap();
    assert_eq!(down.upvotes, 0);
    assert!(!down.has_upvoted);

    let err = toggle_upvote(&store, Uuid::new_v4(), false).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
  }

  #[tokio::test]
  async fn publish_and_feature_flip_through_the_admin_gate() {
    let store = store().await;
    let resolver = resolver();
    let admin = admin();
    let post =
      save_post(&store, &resolver, Some(&admin), None, input("Flip Me"))
        .await
        .unwrap();

    let published =
      toggle_publish(&store, &resolver, Some(&admin), post.id).await.unwrap();
    assert!(!published);

    let featured =
      toggle_feature(&store, &resolver, Some(&admin), post.id).await.unwrap();
    assert!(featured);

    let err = toggle_publish(&store, &resolver, None, post.id)
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
  }
}
