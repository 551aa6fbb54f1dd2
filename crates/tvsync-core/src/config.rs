use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Worker and reconciler pacing (optional `[timing]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Wait after a failed step (transport, protocol, storage or store error).
    pub error_delay_secs: u64,
    /// Wait after a step that found nothing to do.
    pub idle_delay_secs: u64,
    /// Delay before the reconciler's first pass.
    pub startup_delay_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            error_delay_secs: 30,
            idle_delay_secs: 60,
            startup_delay_secs: 5,
        }
    }
}

impl TimingConfig {
    pub fn error_delay(&self) -> Duration {
        Duration::from_secs(self.error_delay_secs)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_secs(self.idle_delay_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }
}

/// Device HTTP timeouts (optional `[http]` section in config.toml).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Whole-request limit; a 512 KiB chunk on a slow device link must fit in it.
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            request_timeout_secs: 120,
        }
    }
}

/// Global configuration loaded from `~/.config/tvsync/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TvsyncConfig {
    /// Directory prepended to every `realFiles` entry when reading media bytes.
    pub media_root: PathBuf,
    /// Task database location; `None` uses `~/.local/state/tvsync/tasks.db`.
    pub db_path: Option<PathBuf>,
    pub timing: TimingConfig,
    pub http: HttpConfig,
}

impl Default for TvsyncConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("."),
            db_path: None,
            timing: TimingConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tvsync")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TvsyncConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = TvsyncConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: TvsyncConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = TvsyncConfig::default();
        assert_eq!(cfg.timing.error_delay(), Duration::from_secs(30));
        assert_eq!(cfg.timing.idle_delay(), Duration::from_secs(60));
        assert_eq!(cfg.timing.startup_delay(), Duration::from_secs(5));
        assert_eq!(cfg.http.connect_timeout_secs, 15);
        assert!(cfg.db_path.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = TvsyncConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: TvsyncConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.media_root, cfg.media_root);
        assert_eq!(parsed.timing.idle_delay_secs, cfg.timing.idle_delay_secs);
        assert_eq!(parsed.http.request_timeout_secs, cfg.http.request_timeout_secs);
    }

    #[test]
    fn config_toml_partial_sections_fall_back() {
        let toml = r#"
            media_root = "/srv/signage/html"

            [timing]
            error_delay_secs = 10
        "#;
        let cfg: TvsyncConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.media_root, PathBuf::from("/srv/signage/html"));
        assert_eq!(cfg.timing.error_delay_secs, 10);
        assert_eq!(cfg.timing.idle_delay_secs, 60);
        assert_eq!(cfg.http.connect_timeout_secs, 15);
    }

    #[test]
    fn config_toml_db_path() {
        let toml = r#"
            db_path = "/var/lib/tvsync/tasks.db"

            [http]
            connect_timeout_secs = 3
            request_timeout_secs = 40
        "#;
        let cfg: TvsyncConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.db_path, Some(PathBuf::from("/var/lib/tvsync/tasks.db")));
        assert_eq!(cfg.http.connect_timeout_secs, 3);
        assert_eq!(cfg.http.request_timeout_secs, 40);
    }
}
