//! Show the effective user configuration

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

pub fn run(config: &SystemConfig, init: bool) -> Result<()> {
    if init {
        let path = system_config::init_if_missing()?;
        println!("{} {}", "Config:".bold(), path.display());
        return Ok(());
    }

    match system_config::config_file_path() {
        Some(path) if path.exists() => println!("{} {}", "# Loaded from".dimmed(), path.display()),
        Some(path) => println!("{} {}", "# Defaults (no file at)".dimmed(), path.display()),
        None => println!("{}", "# Defaults".dimmed()),
    }
    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to serialize config")?
    );
    Ok(())
}
