//! `specview.toml` configuration: the ambient knobs that aren't part of
//! the wire protocol itself (worker pool size, thread cap, idle
//! timeout, read-only mode, bind address, flow-control tuning).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the websocket listener binds to.
    pub bind_address: String,
    /// Number of task-runtime workers (C9's fixed pool size).
    pub worker_threads: usize,
    /// Cap passed to rayon's global pool builder; `0` lets rayon pick.
    pub compute_threads: usize,
    /// Seconds of inbound silence before a session is sent a PING.
    pub idle_wait_secs: u64,
    /// Seconds to keep the process alive with zero live sessions before
    /// exiting, so a reconnect doesn't have to cold-start the loader
    /// cache. `0` disables the grace period (exit immediately).
    pub exit_grace_secs: u64,
    /// Refuses `SAVE_FILE` / `EXPORT_REGION` across every session.
    pub read_only: bool,
    /// Capacity of the image-loader cache, in open files.
    pub loader_cache_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9292".to_string(),
            worker_threads: specview_session::DEFAULT_WORKERS,
            compute_threads: 0,
            idle_wait_secs: 120,
            exit_grace_secs: 0,
            read_only: false,
            loader_cache_capacity: 8,
        }
    }
}

impl ServerConfig {
    pub fn idle_wait(&self) -> Duration {
        Duration::from_secs(self.idle_wait_secs)
    }

    pub fn exit_grace(&self) -> Duration {
        Duration::from_secs(self.exit_grace_secs)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Falls back to defaults when no `--config` path was given and no
    /// `specview.toml` exists in the current directory.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new("specview.toml");
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_a_config_file() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "127.0.0.1:9292");
        assert!(config.worker_threads > 0);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: ServerConfig = toml::from_str(
            r#"
            bind_address = "0.0.0.0:8080"
            read_only = true
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert!(config.read_only);
        assert_eq!(config.worker_threads, specview_session::DEFAULT_WORKERS);
    }
}
