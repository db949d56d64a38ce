//! quill-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the blog API over HTTP.

mod config;
mod mailer;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use quill_api::{AppState, IdentityResolver, Mailer, SessionKeys};
use quill_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{
  config::ServerConfig,
  mailer::{LogMailer, SmtpMailer},
};

#[derive(Parser)]
#[command(author, version, about = "Quill blog server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration. `::config` is the crate; `crate::config` is ours.
  let settings = ::config::Config::builder()
    .add_source(::config::File::from(cli.config).required(false))
    .add_source(::config::Environment::with_prefix("QUILL"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if server_cfg.admin_emails.is_empty() {
    tracing::warn!(
      "no admin_emails configured; nobody will be able to sign in"
    );
  }

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let mailer: Arc<dyn Mailer> = match &server_cfg.smtp {
    Some(smtp) => Arc::new(
      SmtpMailer::new(smtp)
        .map_err(|e| anyhow::anyhow!("failed to build SMTP mailer: {e}"))?,
    ),
    None => Arc::new(LogMailer),
  };

  // Build application state.
  let state = AppState::new(
    Arc::new(store),
    IdentityResolver::new(&server_cfg.admin_emails),
    SessionKeys::new(
      &server_cfg.session_secret,
      server_cfg.session_ttl_minutes,
    ),
    mailer,
  );

  let app = quill_api::api_router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
