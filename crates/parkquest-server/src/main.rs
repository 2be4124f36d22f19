//! parkquest server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), layers
//! `PARKQUEST_*` environment variables on top, opens the SQLite store, and
//! serves the JSON API over HTTP.
//!
//! # Bootstrapping users
//!
//! Identity is asserted upstream, so there is no sign-up endpoint. Create the
//! first administrator with:
//!
//! ```
//! cargo run -p parkquest-server --bin server -- --add-user ops --admin
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use parkquest_core::{
  store::ChallengeStore,
  user::{NewUser, Role},
};
use parkquest_server::ServerConfig;
use parkquest_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "ParkQuest challenge server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create a user with this username, print its id, and exit.
  #[arg(long, value_name = "USERNAME")]
  add_user: Option<String>,

  /// Display name for `--add-user`; defaults to the username.
  #[arg(long, requires = "add_user")]
  display_name: Option<String>,

  /// Give the user created by `--add-user` the admin role.
  #[arg(long, requires = "add_user")]
  admin: bool,
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("PARKQUEST"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: create a user and exit.
  if let Some(username) = cli.add_user {
    let input = NewUser {
      display_name: cli.display_name.unwrap_or_else(|| username.clone()),
      username,
      role: if cli.admin { Role::Admin } else { Role::User },
    };
    let user = store
      .add_user(input)
      .await
      .context("failed to create user")?;
    println!("{}", user.user_id);
    return Ok(());
  }

  let app = parkquest_server::app(Arc::new(store));
  let address = server_cfg.address();

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
