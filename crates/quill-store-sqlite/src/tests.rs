//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use quill_core::{
  comment::NewComment,
  identity::{Profile, Role},
  post::{NewPost, PostChanges, PostFilter},
  store::{BlogStore, PostWrite},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn new_post(title: &str, slug: &str, author_id: Uuid) -> NewPost {
  NewPost {
    title:     title.to_string(),
    slug:      slug.to_string(),
    content:   format!("<p>{title}</p>"),
    excerpt:   "excerpt".to_string(),
    category:  Some("rust".to_string()),
    image_url: None,
    published: true,
    author_id,
  }
}

fn profile(email: &str, role: Role) -> Profile {
  Profile {
    id: Uuid::new_v4(),
    email: email.to_string(),
    name: email.to_string(),
    role,
    created_at: Utc::now(),
  }
}

async fn saved_post(s: &SqliteStore, title: &str, slug: &str) -> quill_core::post::Post {
  match s.create_post(new_post(title, slug, Uuid::new_v4())).await.unwrap() {
    PostWrite::Saved(post) => post,
    other => panic!("expected saved post, got {other:?}"),
  }
}

async fn author(s: &SqliteStore, email: &str) -> Profile {
  let p = profile(email, Role::User);
  s.upsert_profile(p.clone()).await.unwrap();
  p
}

fn comment_input(post_id: Uuid, parent_id: Option<Uuid>, content: &str) -> NewComment {
  NewComment { post_id, parent_id, content: content.to_string() }
}

// ─── Posts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_post() {
  let s = store().await;

  let post = saved_post(&s, "Hello World", "hello-world").await;
  assert_eq!(post.upvotes, 0);
  assert!(!post.featured);

  let fetched = s.get_post(post.id).await.unwrap().unwrap();
  assert_eq!(fetched.slug, "hello-world");
  assert_eq!(fetched.title, "Hello World");

  let by_slug = s.get_post_by_slug("hello-world").await.unwrap().unwrap();
  assert_eq!(by_slug.id, post.id);
}

#[tokio::test]
async fn duplicate_slug_rejected_on_create() {
  let s = store().await;
  saved_post(&s, "First", "shared-slug").await;

  let outcome = s
    .create_post(new_post("Second", "shared-slug", Uuid::new_v4()))
    .await
    .unwrap();
  assert!(matches!(outcome, PostWrite::SlugTaken));
}

#[tokio::test]
async fn update_keeps_counters_and_detects_conflicts() {
  let s = store().await;
  let first = saved_post(&s, "First", "first").await;
  let second = saved_post(&s, "Second", "second").await;
  s.adjust_upvotes(second.id, 3).await.unwrap();

  let changes = PostChanges {
    title:     "Second, revised".to_string(),
    slug:      "second-revised".to_string(),
    content:   "<p>updated</p>".to_string(),
    excerpt:   "updated".to_string(),
    category:  None,
    image_url: None,
    published: false,
  };
  let updated = match s.update_post(second.id, changes.clone()).await.unwrap() {
    PostWrite::Saved(post) => post,
    other => panic!("expected saved post, got {other:?}"),
  };
  assert_eq!(updated.slug, "second-revised");
  assert_eq!(updated.upvotes, 3, "upvotes survive an update");
  assert_eq!(updated.author_id, second.author_id);
  assert_eq!(updated.created_at, second.created_at);

  // Updating onto another post's slug is a conflict.
  let stolen = PostChanges { slug: first.slug.clone(), ..changes.clone() };
  let outcome = s.update_post(second.id, stolen).await.unwrap();
  assert!(matches!(outcome, PostWrite::SlugTaken));

  // Updating a missing post reports NotFound.
  let outcome = s.update_post(Uuid::new_v4(), changes).await.unwrap();
  assert!(matches!(outcome, PostWrite::NotFound));
}

#[tokio::test]
async fn keeping_own_slug_on_update_is_not_a_conflict() {
  let s = store().await;
  let post = saved_post(&s, "Stable", "stable").await;

  let changes = PostChanges {
    title:     "Stable, edited".to_string(),
    slug:      "stable".to_string(),
    content:   "<p>edited</p>".to_string(),
    excerpt:   "edited".to_string(),
    category:  None,
    image_url: None,
    published: true,
  };
  let outcome = s.update_post(post.id, changes).await.unwrap();
  assert!(matches!(outcome, PostWrite::Saved(_)));
}

#[tokio::test]
async fn list_posts_filters() {
  let s = store().await;
  let published = saved_post(&s, "Published", "published").await;
  let hidden = saved_post(&s, "Hidden", "hidden").await;
  s.toggle_published(hidden.id).await.unwrap();
  s.toggle_featured(published.id).await.unwrap();

  let all = s.list_posts(&PostFilter::default()).await.unwrap();
  assert_eq!(all.len(), 2);

  let visible = s.list_posts(&PostFilter::published()).await.unwrap();
  assert_eq!(visible.len(), 1);
  assert_eq!(visible[0].id, published.id);

  let featured = s
    .list_posts(&PostFilter { featured_only: true, ..PostFilter::default() })
    .await
    .unwrap();
  assert_eq!(featured.len(), 1);
  assert_eq!(featured[0].id, published.id);

  let by_category = s
    .list_posts(&PostFilter {
      published_only: true,
      category: Some("rust".to_string()),
      ..PostFilter::default()
    })
    .await
    .unwrap();
  assert_eq!(by_category.len(), 1);
}

#[tokio::test]
async fn toggles_flip_and_report_missing() {
  let s = store().await;
  let post = saved_post(&s, "Toggle", "toggle").await;

  assert_eq!(s.toggle_published(post.id).await.unwrap(), Some(false));
  assert_eq!(s.toggle_published(post.id).await.unwrap(), Some(true));
  assert_eq!(s.toggle_featured(post.id).await.unwrap(), Some(true));
  assert_eq!(s.toggle_published(Uuid::new_v4()).await.unwrap(), None);
}

#[tokio::test]
async fn upvotes_adjust_atomically_and_clamp_at_zero() {
  let s = store().await;
  let post = saved_post(&s, "Votes", "votes").await;

  assert_eq!(s.adjust_upvotes(post.id, 1).await.unwrap(), Some(1));
  assert_eq!(s.adjust_upvotes(post.id, 1).await.unwrap(), Some(2));
  assert_eq!(s.adjust_upvotes(post.id, -1).await.unwrap(), Some(1));
  assert_eq!(s.adjust_upvotes(post.id, -1).await.unwrap(), Some(0));
  // A decrement below zero clamps instead of going negative.
  assert_eq!(s.adjust_upvotes(post.id, -1).await.unwrap(), Some(0));
  assert_eq!(s.adjust_upvotes(Uuid::new_v4(), 1).await.unwrap(), None);
}

#[tokio::test]
async fn categories_are_distinct_published_only() {
  let s = store().await;
  saved_post(&s, "A", "a").await;
  saved_post(&s, "B", "b").await;
  let hidden = saved_post(&s, "C", "c").await;
  s.toggle_published(hidden.id).await.unwrap();

  let categories = s.list_categories().await.unwrap();
  assert_eq!(categories, vec!["rust".to_string()]);
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_comment_returns_author_display_fields() {
  let s = store().await;
  let alice = author(&s, "alice@example.com").await;
  let post = saved_post(&s, "Post", "post").await;

  let added = s
    .add_comment(comment_input(post.id, None, "Hello"), alice.id)
    .await
    .unwrap();

  assert_eq!(added.comment.user_id, alice.id);
  assert_eq!(added.comment.post_id, post.id);
  assert!(added.comment.is_top_level());
  let author = added.author.expect("author fields joined");
  assert_eq!(author.email, "alice@example.com");
}

#[tokio::test]
async fn threaded_comments_nest_one_level_newest_first() {
  let s = store().await;
  let alice = author(&s, "alice@example.com").await;
  let post = saved_post(&s, "Post", "post").await;

  let older = s
    .add_comment(comment_input(post.id, None, "older"), alice.id)
    .await
    .unwrap();
  let newer = s
    .add_comment(comment_input(post.id, None, "newer"), alice.id)
    .await
    .unwrap();
  let reply = s
    .add_comment(
      comment_input(post.id, Some(older.comment.id), "a reply"),
      alice.id,
    )
    .await
    .unwrap();

  let threads = s.threaded_comments(post.id).await.unwrap();
  assert_eq!(threads.len(), 2, "replies never appear at the top level");

  // Newest top-level comment first.
  assert_eq!(threads[0].comment.comment.id, newer.comment.id);
  assert!(threads[0].replies.is_empty());

  assert_eq!(threads[1].comment.comment.id, older.comment.id);
  assert_eq!(threads[1].replies.len(), 1);
  assert_eq!(threads[1].replies[0].comment.id, reply.comment.id);
}

#[tokio::test]
async fn threaded_comments_scoped_to_post() {
  let s = store().await;
  let alice = author(&s, "alice@example.com").await;
  let post_a = saved_post(&s, "A", "a").await;
  let post_b = saved_post(&s, "B", "b").await;

  s.add_comment(comment_input(post_a.id, None, "on a"), alice.id)
    .await
    .unwrap();

  let threads = s.threaded_comments(post_b.id).await.unwrap();
  assert!(threads.is_empty());
}

#[tokio::test]
async fn delete_comment_cascades_to_direct_replies() {
  let s = store().await;
  let alice = author(&s, "alice@example.com").await;
  let post = saved_post(&s, "Post", "post").await;

  let parent = s
    .add_comment(comment_input(post.id, None, "parent"), alice.id)
    .await
    .unwrap();
  let reply = s
    .add_comment(
      comment_input(post.id, Some(parent.comment.id), "reply"),
      alice.id,
    )
    .await
    .unwrap();

  assert!(s.delete_comment(parent.comment.id).await.unwrap());
  assert!(s.get_comment(parent.comment.id).await.unwrap().is_none());
  assert!(
    s.get_comment(reply.comment.id).await.unwrap().is_none(),
    "replies go with their parent"
  );

  // Deleting a missing comment reports false.
  assert!(!s.delete_comment(parent.comment.id).await.unwrap());
}

#[tokio::test]
async fn all_comments_keep_orphans_with_null_post_linkage() {
  let s = store().await;
  let alice = author(&s, "alice@example.com").await;
  let kept = saved_post(&s, "Kept", "kept").await;
  let doomed = saved_post(&s, "Doomed", "doomed").await;

  s.add_comment(comment_input(kept.id, None, "stays linked"), alice.id)
    .await
    .unwrap();
  s.add_comment(comment_input(doomed.id, None, "orphaned"), alice.id)
    .await
    .unwrap();

  assert!(s.delete_post(doomed.id).await.unwrap());

  let all = s.all_comments().await.unwrap();
  assert_eq!(all.len(), 2, "comments survive post deletion");

  let orphan = all
    .iter()
    .find(|m| m.comment.comment.content == "orphaned")
    .unwrap();
  assert!(orphan.post.is_none());

  let linked = all
    .iter()
    .find(|m| m.comment.comment.content == "stays linked")
    .unwrap();
  let summary = linked.post.as_ref().unwrap();
  assert_eq!(summary.slug, "kept");
  assert_eq!(summary.title, "Kept");
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_profile_is_idempotent() {
  let s = store().await;
  let mut p = profile("bob@example.com", Role::User);

  s.upsert_profile(p.clone()).await.unwrap();
  p.name = "Bob".to_string();
  p.role = Role::Admin;
  s.upsert_profile(p.clone()).await.unwrap();

  let fetched = s.get_profile(p.id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Bob");
  assert_eq!(fetched.role, Role::Admin);

  let by_email = s
    .get_profile_by_email("bob@example.com")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_email.id, p.id);
}

#[tokio::test]
async fn get_profile_missing_returns_none() {
  let s = store().await;
  assert!(s.get_profile(Uuid::new_v4()).await.unwrap().is_none());
  assert!(
    s.get_profile_by_email("nobody@example.com")
      .await
      .unwrap()
      .is_none()
  );
}

// ─── OTP codes ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn otp_take_consumes_the_row() {
  let s = store().await;
  let expires = Utc::now() + Duration::minutes(5);

  s.put_otp("alice@example.com", "123456", expires).await.unwrap();

  let taken = s.take_otp("alice@example.com").await.unwrap().unwrap();
  assert_eq!(taken.code, "123456");
  assert!(!taken.is_expired(Utc::now()));

  // Consumed: a second take finds nothing.
  assert!(s.take_otp("alice@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn otp_reissue_replaces_previous_code() {
  let s = store().await;
  let expires = Utc::now() + Duration::minutes(5);

  s.put_otp("alice@example.com", "111111", expires).await.unwrap();
  s.put_otp("alice@example.com", "222222", expires).await.unwrap();

  let taken = s.take_otp("alice@example.com").await.unwrap().unwrap();
  assert_eq!(taken.code, "222222");
}
