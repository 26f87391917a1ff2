//! roster-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), layers
//! `ROSTER_*` environment variables over it, opens the SQLite store and
//! serves the registry API over HTTP.
//!
//! # Issuing tokens
//!
//! There is no login endpoint. Mint a bearer token for an operator with:
//!
//! ```text
//! cargo run -p roster-server -- --issue-token treasurer --subject jane@aecas
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use roster_api::TokenKeys;
use roster_core::role::Role;
use roster_notify::{LogMailer, Notifier, spawn_dispatcher};
use roster_server::{ServerConfig, api_state};
use roster_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Membership registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print a bearer token for ROLE and exit.
  #[arg(long, value_name = "ROLE")]
  issue_token: Option<Role>,

  /// Subject recorded in an issued token.
  #[arg(long, default_value = "operator")]
  subject: String,

  /// Lifetime of an issued token, in hours.
  #[arg(long, default_value_t = 24)]
  ttl_hours: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.as_path()).required(false))
    .add_source(
      config::Environment::with_prefix("ROSTER")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("payment_roles"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if server_cfg.jwt_secret.trim().is_empty() {
    anyhow::bail!("jwt_secret must not be empty");
  }

  // Helper mode: mint a token and exit.
  if let Some(role) = cli.issue_token {
    let token = TokenKeys::new(&server_cfg.jwt_secret)
      .issue(&cli.subject, role, chrono::Duration::hours(cli.ttl_hours))
      .context("failed to sign token")?;
    println!("{token}");
    return Ok(());
  }

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_number_format(server_cfg.number_format());

  let (notifier, events) = Notifier::channel(server_cfg.notify_queue);
  spawn_dispatcher(events, server_cfg.templates(), LogMailer);

  let app = roster_server::app(api_state(&server_cfg, store, notifier));
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
