// ABOUTME: Client configuration: backend endpoint, auth, and bridge tunables
// Loaded from a TOML file in the platform config dir, overridable via CLI

use crate::terminal::{BridgeConfig, ErrorFramePolicy};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP origin of the backend, e.g. `https://ctf.example`.
    pub server_url: String,
    pub token: Option<String>,
    pub heartbeat_interval_secs: u64,
    pub resize_debounce_ms: u64,
    pub close_grace_ms: u64,
    pub error_frame_policy: ErrorFramePolicy,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            token: None,
            heartbeat_interval_secs: 20,
            resize_debounce_ms: 150,
            close_grace_ms: 200,
            error_frame_policy: ErrorFramePolicy::Inline,
            log_filter: "ctf_console=info".to_string(),
        }
    }
}

impl Config {
    /// Load from `path` when given, else from the default location, else
    /// fall back to defaults when no file exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };
        match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(&p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                toml::from_str(&raw).with_context(|| format!("parsing config {}", p.display()))
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ctf-console").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// WebSocket origin derived from the HTTP one.
    pub fn ws_base(&self) -> String {
        if let Some(rest) = self.server_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.server_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.server_url.clone()
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            resize_debounce: Duration::from_millis(self.resize_debounce_ms),
            close_grace: Duration::from_millis(self.close_grace_ms),
            error_frame_policy: self.error_frame_policy,
        }
    }
}
