//! Library configuration loaded from YAML.

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::FetchOptions;
use crate::dataset::{Rgb, DEFAULT_PALETTE};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub charts: ChartConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Whether fetched data is cached at all
  #[serde(default = "default_cache_enabled")]
  pub enabled: bool,
  /// How long cached data stays servable, in seconds
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u32,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: default_cache_enabled(),
      ttl_secs: default_ttl_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
  /// Point budget charts are downsampled to
  #[serde(default = "default_max_points")]
  pub max_points: usize,
  /// Hex colors for value-driven color scales
  #[serde(default = "default_palette")]
  pub palette: Vec<String>,
}

impl Default for ChartConfig {
  fn default() -> Self {
    Self {
      max_points: default_max_points(),
      palette: default_palette(),
    }
  }
}

fn default_cache_enabled() -> bool {
  true
}

fn default_ttl_secs() -> u32 {
  300
}

fn default_max_points() -> usize {
  50
}

fn default_palette() -> Vec<String> {
  DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
}

impl Config {
  /// Load configuration.
  ///
  /// Search order:
  /// 1. Explicit path if provided (missing file is an error)
  /// 2. ./storelens.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/storelens/config.yaml
  ///
  /// With no file anywhere, the built-in defaults apply; nothing here is
  /// required the way credentials would be.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("storelens.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("storelens").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// The fetch options this configuration prescribes.
  pub fn fetch_options(&self) -> FetchOptions {
    let options = FetchOptions::default().with_ttl(chrono::Duration::seconds(
      i64::from(self.cache.ttl_secs),
    ));
    if self.cache.enabled {
      options
    } else {
      options.uncached()
    }
  }

  /// The configured chart palette, parsed.
  pub fn palette(&self) -> Result<Vec<Rgb>> {
    self.charts.palette.iter().map(|hex| Rgb::from_hex(hex)).collect()
  }
}
