//! One-time-password sign-in.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/auth/otp` | Body: `{"email":"..."}`; mails a code |
//! | `POST` | `/api/auth/verify` | Body: `{"email":"...","code":"..."}`; returns a session token |
//!
//! Codes are six digits, valid for five minutes, and single-use: one live
//! code per address, consumed (or discarded) on the first verify attempt.
//! Only allow-listed addresses may request a code at all, which keeps the
//! mailer from becoming an open relay probe.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use quill_core::{identity::normalize_email, store::BlogStore};
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use axum::{Json, extract::State};

use crate::{
  AppState,
  error::ApiError,
  identity::IdentityResolver,
  session::{Session, SessionKeys},
};

pub type MailError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound delivery of sign-in codes. The server picks the transport; the
/// API only needs the one call.
#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send_otp(&self, to: &str, code: &str) -> Result<(), MailError>;
}

/// Codes live this long from issuance.
pub const OTP_TTL_MINUTES: i64 = 5;

/// A uniformly random six-digit code, 100000..=999999.
pub fn generate_code() -> String {
  let mut buf = [0u8; 4];
  OsRng.fill_bytes(&mut buf);
  let n = 100_000 + u32::from_le_bytes(buf) % 900_000;
  n.to_string()
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Issue a code to `raw_email` and hand it to the mailer. Reissuing replaces
/// any code still outstanding for the address.
pub async fn issue<S: BlogStore>(
  store: &S,
  resolver: &IdentityResolver,
  mailer: &dyn Mailer,
  raw_email: &str,
) -> Result<(), ApiError> {
  let email = normalize_email(raw_email);
  if email.is_empty() {
    return Err(ApiError::Validation("Email is required".to_string()));
  }
  if !resolver.is_allow_listed(&email) {
    return Err(ApiError::Forbidden("Email not authorized".to_string()));
  }

  let code = generate_code();
  let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);
  store
    .put_otp(&email, &code, expires_at)
    .await
    .map_err(ApiError::store)?;

  mailer.send_otp(&email, &code).await.map_err(|e| {
    tracing::error!(error = %e, "failed to deliver sign-in code");
    ApiError::Store(e)
  })
}

/// Verify a code and mint a session token. The stored code is consumed
/// before it is checked, so a wrong or late guess burns it; missing,
/// mismatched, and expired all fail identically.
pub async fn verify<S: BlogStore>(
  store: &S,
  resolver: &IdentityResolver,
  keys: &SessionKeys,
  raw_email: &str,
  code: &str,
) -> Result<String, ApiError> {
  let email = normalize_email(raw_email);

  let stored = store.take_otp(&email).await.map_err(ApiError::store)?;
  let valid = stored
    .as_ref()
    .is_some_and(|otp| otp.code == code && !otp.is_expired(Utc::now()));
  if !valid {
    return Err(ApiError::Validation("Invalid or expired code".to_string()));
  }

  let profile = match store
    .get_profile_by_email(&email)
    .await
    .map_err(ApiError::store)?
  {
    Some(profile) => profile,
    None => {
      let fresh = Session {
        id:    Uuid::new_v4(),
        email: email.clone(),
        name:  email.clone(),
      };
      resolver.ensure_profile(store, &fresh).await?
    }
  };

  let session = Session {
    id:    profile.id,
    email: profile.email,
    name:  profile.name,
  };
  keys.issue(&session).map_err(|e| {
    tracing::error!(error = %e, "failed to sign session token");
    ApiError::store(e)
  })
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IssueBody {
  pub email: String,
}

/// `POST /api/auth/otp`
pub async fn send<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<IssueBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: BlogStore + 'static,
{
  issue(
    state.store.as_ref(),
    &state.resolver,
    state.mailer.as_ref(),
    &body.email,
  )
  .await?;
  Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
  pub email: String,
  pub code:  String,
}

/// `POST /api/auth/verify` — returns `{"token": "<jwt>"}`.
pub async fn confirm<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<VerifyBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: BlogStore + 'static,
{
  let token = verify(
    state.store.as_ref(),
    &state.resolver,
    &state.sessions,
    &body.email,
    &body.code,
  )
  .await?;
  Ok(Json(json!({ "token": token })))
}
