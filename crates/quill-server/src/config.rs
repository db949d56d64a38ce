//! Server configuration, deserialised from `config.toml` plus `QUILL_*`
//! environment overrides.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  /// Addresses granted the admin role. Matching is case-insensitive.
  #[serde(default)]
  pub admin_emails:        Vec<String>,
  /// Secret for signing session tokens. Rotating it logs everyone out.
  pub session_secret:      String,
  #[serde(default = "default_session_ttl")]
  pub session_ttl_minutes: i64,
  /// Optional SMTP transport for sign-in codes. When absent, codes are
  /// written to the log instead.
  #[serde(default)]
  pub smtp:                Option<SmtpConfig>,
}

// One week.
fn default_session_ttl() -> i64 {
  60 * 24 * 7
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
  pub host:     String,
  #[serde(default = "default_smtp_port")]
  pub port:     u16,
  pub username: String,
  pub password: String,
  /// The From mailbox, e.g. `Quill <no-reply@example.com>`.
  pub from:     String,
}

fn default_smtp_port() -> u16 {
  587
}
