use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/netcache/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetConfig {
    /// Cache root override. Defaults to the XDG cache dir plus "netcache".
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Small-icon width in pixels, used when no theme supplies a size.
    pub icon_width: u32,
    /// Small-icon height in pixels.
    pub icon_height: u32,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Total HTTP transfer timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum redirect hops followed per fetch.
    pub max_redirects: u32,
    /// Capacity of the in-memory icon cache (entries). Oldest evicted first.
    pub memory_cache_capacity: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            icon_width: 16,
            icon_height: 16,
            connect_timeout_secs: 15,
            timeout_secs: 30,
            max_redirects: 5,
            memory_cache_capacity: 256,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("netcache")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<NetConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = NetConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: NetConfig = toml::from_str(&data)?;
    Ok(cfg)
}
