//! JSON REST API for Quill.
//!
//! Exposes an axum [`Router`] backed by any [`quill_core::store::BlogStore`].
//! Sessions are stateless bearer tokens; admin rights come from the injected
//! allow-list, never from the store alone. TLS and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = AppState::new(Arc::new(store), resolver, keys, Arc::new(mailer));
//! let app = quill_api::api_router(state);
//! ```

pub mod comments;
pub mod error;
pub mod identity;
pub mod otp;
pub mod posts;
pub mod session;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use quill_core::store::BlogStore;

pub use error::ApiError;
pub use identity::IdentityResolver;
pub use otp::Mailer;
pub use session::{Session, SessionKeys};

/// Everything the handlers need, shared across requests.
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub resolver: Arc<IdentityResolver>,
  pub sessions: Arc<SessionKeys>,
  pub mailer:   Arc<dyn Mailer>,
}

impl<S> AppState<S> {
  pub fn new(
    store: Arc<S>,
    resolver: IdentityResolver,
    sessions: SessionKeys,
    mailer: Arc<dyn Mailer>,
  ) -> Self {
    Self {
      store,
      resolver: Arc::new(resolver),
      sessions: Arc::new(sessions),
      mailer,
    }
  }
}

// Derived Clone would demand S: Clone; every field is an Arc.
impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      resolver: Arc::clone(&self.resolver),
      sessions: Arc::clone(&self.sessions),
      mailer:   Arc::clone(&self.mailer),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: BlogStore + 'static,
{
  Router::new()
    // Public reads
    .route("/api/posts", get(posts::list::<S>))
    .route("/api/posts/{slug}", get(posts::get_one::<S>))
    .route("/api/categories", get(posts::categories::<S>))
    .route("/api/upvotes/{id}", post(posts::upvote::<S>))
    // Comments
    .route(
      "/api/comments",
      get(comments::list::<S>).post(comments::create::<S>),
    )
    .route("/api/comments/{id}", delete(comments::delete_one::<S>))
    // Sign-in
    .route("/api/auth/otp", post(otp::send::<S>))
    .route("/api/auth/verify", post(otp::confirm::<S>))
    // Admin
    .route(
      "/api/admin/posts",
      get(posts::list_all::<S>).post(posts::create::<S>),
    )
    .route(
      "/api/admin/posts/{id}",
      put(posts::update::<S>).delete(posts::delete_one::<S>),
    )
    .route("/api/admin/posts/{id}/publish", post(posts::publish::<S>))
    .route("/api/admin/posts/{id}/feature", post(posts::feature::<S>))
    .route("/api/admin/comments", get(comments::list_all::<S>))
    .with_state(state)
}
