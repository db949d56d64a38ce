//! Stateless session tokens.
//!
//! A session is a signed HS256 JWT carrying the caller's profile id, email,
//! and display name. Tokens are issued after OTP verification and presented
//! as a `Bearer` header. There is no server-side session table; expiry is
//! enforced by the `exp` claim alone.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use quill_core::store::BlogStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;

/// The verified identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  pub id:    Uuid,
  pub email: String,
  pub name:  String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
  sub:   Uuid,
  email: String,
  name:  String,
  exp:   i64,
}

/// Key material and TTL for signing and verifying session tokens.
pub struct SessionKeys {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl:      Duration,
}

impl SessionKeys {
  pub fn new(secret: &str, ttl_minutes: i64) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      ttl:      Duration::minutes(ttl_minutes),
    }
  }

  /// Sign a token for `session`, expiring after the configured TTL.
  pub fn issue(
    &self,
    session: &Session,
  ) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
      sub:   session.id,
      email: session.email.clone(),
      name:  session.name.clone(),
      exp:   (Utc::now() + self.ttl).timestamp(),
    };
    jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
  }

  /// Decode and validate a token. Returns `None` for anything other than a
  /// well-formed, unexpired token signed with our secret.
  pub fn verify(&self, token: &str) -> Option<Session> {
    let data = jsonwebtoken::decode::<Claims>(
      token,
      &self.decoding,
      &Validation::default(),
    )
    .ok()?;
    Some(Session {
      id:    data.claims.sub,
      email: data.claims.email,
      name:  data.claims.name,
    })
  }
}

/// Extractor yielding `Some(Session)` for a valid `Authorization: Bearer`
/// token and `None` otherwise. It never rejects: operations decide whether
/// anonymous access is acceptable.
pub struct Caller(pub Option<Session>);

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: BlogStore + 'static,
{
  type Rejection = std::convert::Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let session = parts
      .headers
      .get(axum::http::header::AUTHORIZATION)
      .and_then(|value| value.to_str().ok())
      .and_then(|value| value.strip_prefix("Bearer "))
      .and_then(|token| state.sessions.verify(token));
    Ok(Caller(session))
  }
}
