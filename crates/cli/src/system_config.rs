//! User-level configuration for tinygit
//!
//! Stored at `~/.config/tinygit/config.toml` (Linux), the platform config
//! directory elsewhere, or wherever `TINYGIT_CONFIG` points.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "TINYGIT_CONFIG";
/// Environment variable supplying an author when none is configured
pub const AUTHOR_ENV: &str = "TINYGIT_AUTHOR";

/// User configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Commit identity
    pub user: UserConfig,

    /// Object storage settings
    pub core: CoreConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// zlib level for loose objects, 0-9 (default: 6)
    pub compression_level: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
        }
    }
}

impl SystemConfig {
    /// `Name <email>` from the `[user]` section, if a name is set
    pub fn identity(&self) -> Option<String> {
        let name = self.user.name.trim();
        if name.is_empty() {
            return None;
        }
        let email = self.user.email.trim();
        if email.is_empty() {
            Some(name.to_string())
        } else {
            Some(format!("{} <{}>", name, email))
        }
    }
}

/// Get the config file path
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|c| c.join("tinygit").join("config.toml"))
}

/// Load configuration, falling back to defaults when the file doesn't exist
pub fn load() -> Result<SystemConfig> {
    let config_path = match config_file_path() {
        Some(p) => p,
        None => {
            tracing::debug!("Could not determine config directory, using defaults");
            return Ok(SystemConfig::default());
        }
    };

    if !config_path.exists() {
        tracing::debug!("Config not found at {}, using defaults", config_path.display());
        return Ok(SystemConfig::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config at {}", config_path.display()))?;

    let config: SystemConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config at {}", config_path.display()))?;

    tracing::debug!("Loaded config from {}", config_path.display());
    Ok(config)
}

/// Write a default config file if none exists; returns its path
pub fn init_if_missing() -> Result<PathBuf> {
    let config_path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    if config_path.exists() {
        return Ok(config_path);
    }

    if let Some(dir) = config_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory at {}", dir.display()))?;
    }

    fs::write(&config_path, example_config())
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    tracing::info!("Wrote default config to {}", config_path.display());
    Ok(config_path)
}

/// Default config file content
pub fn example_config() -> String {
    let mut content = String::from("# tinygit configuration\n\n");
    content.push_str(&toml::to_string_pretty(&SystemConfig::default()).unwrap_or_default());
    content
}

/// Pick the commit identity: flag, then config, then environment
pub fn resolve_author(flag: Option<String>, config: &SystemConfig) -> Result<String> {
    if let Some(author) = flag.filter(|a| !a.trim().is_empty()) {
        return Ok(author);
    }
    if let Some(identity) = config.identity() {
        return Ok(identity);
    }
    if let Ok(author) = std::env::var(AUTHOR_ENV) {
        if !author.trim().is_empty() {
            return Ok(author);
        }
    }
    anyhow::bail!(
        "No author identity: pass --author, set [user] name in {}, or set {}",
        config_file_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "the config file".to_string()),
        AUTHOR_ENV
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SystemConfig::default();
        assert_eq!(config.core.compression_level, 6);
        assert!(config.identity().is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SystemConfig = toml::from_str("[user]\nname = \"Alice\"\n").unwrap();
        assert_eq!(config.identity().as_deref(), Some("Alice"));
        assert_eq!(config.core.compression_level, 6);
    }

    #[test]
    fn test_identity_with_email() {
        let mut config = SystemConfig::default();
        config.user.name = "Alice".to_string();
        config.user.email = "alice@example.com".to_string();
        assert_eq!(
            config.identity().as_deref(),
            Some("Alice <alice@example.com>")
        );
    }

    #[test]
    fn test_author_flag_wins() {
        let mut config = SystemConfig::default();
        config.user.name = "Config".to_string();
        assert_eq!(
            resolve_author(Some("Flag".to_string()), &config).unwrap(),
            "Flag"
        );
        assert_eq!(resolve_author(None, &config).unwrap(), "Config");
    }

    #[test]
    fn test_example_config_parses() {
        let parsed: SystemConfig = toml::from_str(&example_config()).unwrap();
        assert_eq!(parsed.core.compression_level, 6);
    }
}
