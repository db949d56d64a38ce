//! Identity resolution against an injected admin allow-list.
//!
//! The resolver is the only authority on who holds the admin role. The
//! allow-list is provided explicitly at construction (from server config) and
//! always wins over whatever role a stored profile carries. Profile writes
//! store the allow-list-derived role, so removing an address from the list
//! demotes that account the next time its profile is provisioned (on comment
//! or sign-in); the stored role is only a fallback for reads.

use std::collections::HashSet;

use chrono::Utc;
use quill_core::{
  identity::{Profile, Role, normalize_email},
  store::BlogStore,
};
use uuid::Uuid;

use crate::{error::ApiError, session::Session};

pub struct IdentityResolver {
  admin_emails: HashSet<String>,
}

impl IdentityResolver {
  /// Build a resolver from configured admin addresses. Entries are
  /// normalized; blank entries are dropped.
  pub fn new<I, T>(admin_emails: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
  {
    Self {
      admin_emails: admin_emails
        .into_iter()
        .map(|e| normalize_email(e.as_ref()))
        .filter(|e| !e.is_empty())
        .collect(),
    }
  }

  pub fn is_allow_listed(&self, email: &str) -> bool {
    self.admin_emails.contains(&normalize_email(email))
  }

  /// Resolve the effective role for a caller. The allow-list is consulted
  /// first; only then does the stored profile's role apply. Lookup failures
  /// degrade to [`Role::User`] rather than erroring a read path.
  pub async fn resolve_role<S: BlogStore>(
    &self,
    store: &S,
    user_id: Uuid,
    email: &str,
  ) -> Role {
    if self.is_allow_listed(email) {
      return Role::Admin;
    }
    match store.get_profile(user_id).await {
      Ok(Some(profile)) => profile.role,
      Ok(None) => Role::User,
      Err(e) => {
        tracing::warn!(error = %e, %user_id, "profile lookup failed, treating caller as user");
        Role::User
      }
    }
  }

  pub async fn is_admin<S: BlogStore>(
    &self,
    store: &S,
    session: &Session,
  ) -> bool {
    self
      .resolve_role(store, session.id, &session.email)
      .await
      .is_admin()
  }

  /// Make sure a profile row exists for the caller, creating or refreshing
  /// it from the session identity. The written role comes from the
  /// allow-list alone — never from the stored row — so revocations
  /// propagate in both directions.
  pub async fn ensure_profile<S: BlogStore>(
    &self,
    store: &S,
    session: &Session,
  ) -> Result<Profile, ApiError> {
    let email = normalize_email(&session.email);
    let name = match session.name.trim() {
      "" => email.clone(),
      trimmed => trimmed.to_string(),
    };
    let role = if self.is_allow_listed(&email) {
      Role::Admin
    } else {
      Role::User
    };

    let profile = Profile {
      id: session.id,
      email,
      name,
      role,
      created_at: Utc::now(),
    };
    store.upsert_profile(profile.clone()).await.map_err(|e| {
      tracing::error!(error = %e, user_id = %session.id, "failed to provision profile");
      ApiError::Profile
    })?;
    Ok(profile)
  }
}

/// Shared gate for admin-only operations: requires a session and the admin
/// role, otherwise fails with `denied` as the forbidden message.
pub async fn require_admin<'s, S: BlogStore>(
  store: &S,
  resolver: &IdentityResolver,
  caller: Option<&'s Session>,
  denied: &str,
) -> Result<&'s Session, ApiError> {
  let session = caller.ok_or(ApiError::Unauthorized)?;
  if !resolver.is_admin(store, session).await {
    return Err(ApiError::Forbidden(denied.to_string()));
  }
  Ok(session)
}

#[cfg(test)]
mod tests {
  use quill_store_sqlite::SqliteStore;

  use super::*;

  async fn store() -> SqliteStore {
    SqliteStore::open_in_memory().await.unwrap()
  }

  fn session(email: &str) -> Session {
    Session {
      id:    Uuid::new_v4(),
      email: email.into(),
      name:  "Someone".into(),
    }
  }

  #[test]
  fn allow_list_entries_are_normalized() {
    let resolver = IdentityResolver::new(["  Admin@Example.COM ", ""]);
    assert!(resolver.is_allow_listed("admin@example.com"));
    assert!(resolver.is_allow_listed("ADMIN@example.com  "));
    assert!(!resolver.is_allow_listed(""));
    assert!(!resolver.is_allow_listed("reader@example.com"));
  }

  #[tokio::test]
  async fn allow_list_wins_over_stored_role() {
    let store = store().await;
    let resolver = IdentityResolver::new(["admin@example.com"]);
    let session = session("admin@example.com");

    // Even with a plain user profile on file, the allow-list grants admin.
    let profile = resolver.ensure_profile(&store, &session).await.unwrap();
    assert_eq!(profile.role, Role::Admin);
    assert!(resolver.is_admin(&store, &session).await);
  }

  #[tokio::test]
  async fn removal_from_the_allow_list_demotes_on_next_provision() {
    let store = store().await;
    let session = session("boss@example.com");

    let with = IdentityResolver::new(["boss@example.com"]);
    let profile = with.ensure_profile(&store, &session).await.unwrap();
    assert_eq!(profile.role, Role::Admin);

    // Address removed from config: the next profile refresh writes the
    // user role back over the stored admin role.
    let without = IdentityResolver::new(Vec::<String>::new());
    let profile = without.ensure_profile(&store, &session).await.unwrap();
    assert_eq!(profile.role, Role::User);
    assert_eq!(
      store.get_profile(session.id).await.unwrap().unwrap().role,
      Role::User
    );
    assert!(!without.is_admin(&store, &session).await);
  }

  #[tokio::test]
  async fn unknown_caller_defaults_to_user() {
    let store = store().await;
    let resolver = IdentityResolver::new(["admin@example.com"]);
    let session = session("reader@example.com");

    assert_eq!(
      resolver.resolve_role(&store, session.id, &session.email).await,
      Role::User
    );
    assert!(!resolver.is_admin(&store, &session).await);
  }

  #[tokio::test]
  async fn ensure_profile_is_idempotent_and_fills_blank_names() {
    let store = store().await;
    let resolver = IdentityResolver::new(Vec::<String>::new());
    let mut session = session("Reader@Example.com");
    session.name = "   ".into();

    let first = resolver.ensure_profile(&store, &session).await.unwrap();
    assert_eq!(first.email, "reader@example.com");
    assert_eq!(first.name, "reader@example.com");

    session.name = "Reader".into();
    let second = resolver.ensure_profile(&store, &session).await.unwrap();
    assert_eq!(second.name, "Reader");
    assert_eq!(
      store.get_profile(session.id).await.unwrap().unwrap().name,
      "Reader"
    );
  }

  #[tokio::test]
  async fn require_admin_rejects_anonymous_and_plain_users() {
    let store = store().await;
    let resolver = IdentityResolver::new(["admin@example.com"]);

    let err = require_admin(&store, &resolver, None, "nope").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));

    let user = session("reader@example.com");
    let err = require_admin(&store, &resolver, Some(&user), "nope")
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(m) if m == "nope"));

    let admin = session("admin@example.com");
    assert!(
      require_admin(&store, &resolver, Some(&admin), "nope").await.is_ok()
    );
  }
}
