use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Application origin the agent fronts (e.g. "https://app.example")
  pub origin: String,
  /// Deploy version string baked into the generation names
  pub version: String,
  /// URL path prefix of the application code bundles
  #[serde(default = "default_bundle_prefix")]
  pub bundle_prefix: String,
  /// Paths precached into the static generation at install time
  #[serde(default)]
  pub precache: Vec<String>,
  /// Path of the app-shell document served to offline navigations
  #[serde(default = "default_app_shell")]
  pub app_shell: String,
  /// Override for the cache database location
  pub cache_db: Option<PathBuf>,
}

fn default_bundle_prefix() -> String {
  "/bundles/".to_string()
}

fn default_app_shell() -> String {
  "/".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./edgecached.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/edgecached/config.yaml
  /// 4. ~/.config/edgecached/config.yaml
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
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/edgecached/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("edgecached.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("edgecached").join("config.yaml");
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

  /// The application origin as a parsed URL.
  pub fn origin_url(&self) -> Result<Url> {
    Url::parse(&self.origin)
      .map_err(|e| eyre!("Invalid origin '{}' in config: {}", self.origin, e))
  }

  /// Deploy-time version override from the environment.
  ///
  /// Checks EDGECACHED_VERSION; deployment pipelines inject it so the same
  /// config file can be reused across releases.
  pub fn version_override() -> Option<String> {
    std::env::var("EDGECACHED_VERSION").ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_minimal_config() {
    let config: Config = serde_yaml::from_str(
      "origin: https://app.example\n\
       version: v3\n",
    )
    .unwrap();

    assert_eq!(config.origin, "https://app.example");
    assert_eq!(config.version, "v3");
    assert_eq!(config.bundle_prefix, "/bundles/");
    assert_eq!(config.app_shell, "/");
    assert!(config.precache.is_empty());
    assert!(config.cache_db.is_none());
  }

  #[test]
  fn test_parse_full_config() {
    let config: Config = serde_yaml::from_str(
      "origin: https://app.example\n\
       version: v3\n\
       bundle_prefix: /static/js/\n\
       app_shell: /index.html\n\
       precache:\n\
         - /\n\
         - /static/js/main.js\n\
       cache_db: /tmp/edge.db\n",
    )
    .unwrap();

    assert_eq!(config.bundle_prefix, "/static/js/");
    assert_eq!(config.app_shell, "/index.html");
    assert_eq!(config.precache.len(), 2);
    assert_eq!(config.cache_db.unwrap(), PathBuf::from("/tmp/edge.db"));
  }

  #[test]
  fn test_invalid_origin_is_rejected() {
    let config: Config = serde_yaml::from_str(
      "origin: not a url\n\
       version: v1\n",
    )
    .unwrap();

    assert!(config.origin_url().is_err());
  }
}
