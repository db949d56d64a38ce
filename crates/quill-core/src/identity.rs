//! Identity types — profiles, roles, and OTP codes.
//!
//! A profile is the stored identity record. Its `role` column is advisory:
//! the identity resolver always consults the admin allow-list first, so an
//! allow-listed email is an admin even with no profile row at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role an identity resolves to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  #[default]
  User,
}

impl Role {
  pub fn is_admin(self) -> bool { matches!(self, Role::Admin) }
}

/// The stored identity record carrying display fields and a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  pub id:         Uuid,
  pub email:      String,
  pub name:       String,
  pub role:       Role,
  pub created_at: DateTime<Utc>,
}

/// A one-time sign-in code, keyed by normalised email.
///
/// At most one outstanding code per email; issuing a new code replaces the
/// old one. Verification consumes the row.
#[derive(Debug, Clone)]
pub struct OtpCode {
  pub email:      String,
  pub code:       String,
  pub expires_at: DateTime<Utc>,
}

impl OtpCode {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}

/// Canonical form for email comparison: trimmed and lowercased.
pub fn normalize_email(raw: &str) -> String { raw.trim().to_lowercase() }
