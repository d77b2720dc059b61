//! Runtime configuration: an optional TOML file overlaid with `RANKWATCH_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use rankwatch_tracking::TrackingPolicy;
use serde::Deserialize;

/// Runtime server configuration, deserialised from `rankwatch.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  #[serde(default = "default_store_path")]
  pub store_path:            PathBuf,
  #[serde(default = "default_history_limit")]
  pub default_history_limit: usize,
  #[serde(default = "max_history_limit")]
  pub max_history_limit:     usize,
  #[serde(default = "enabled")]
  pub notifications_enabled: bool,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/rankwatch/rankwatch.db") }

fn default_history_limit() -> usize { 100 }

fn max_history_limit() -> usize { 1000 }

fn enabled() -> bool { true }

impl ServerConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("RANKWATCH"))
      .build()
      .context("failed to read config file")?;

    let cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    anyhow::ensure!(
      cfg.default_history_limit >= 1
        && cfg.default_history_limit <= cfg.max_history_limit,
      "default_history_limit must be between 1 and max_history_limit ({})",
      cfg.max_history_limit
    );
    Ok(cfg)
  }

  pub fn policy(&self) -> TrackingPolicy {
    TrackingPolicy {
      default_history_limit: self.default_history_limit,
      max_history_limit:     self.max_history_limit,
      notify:                self.notifications_enabled,
    }
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
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
