//! Shared utilities for CLI commands

use crate::system_config::SystemConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use std::path::Path;
use tinygit_core::{Repository, Sha1Hash, Signature};

/// Open the repository named by `--git-dir`, or find `.git` from cwd
pub fn open_repo(git_dir: Option<&Path>, config: &SystemConfig) -> Result<Repository> {
    let repo = match git_dir {
        Some(dir) => Repository::open(dir)
            .with_context(|| format!("Failed to open repository at {}", dir.display()))?,
        None => {
            let current = std::env::current_dir().context("Failed to get current directory")?;
            Repository::discover(&current)
                .context("Not a tinygit repository (no .git directory found)")?
        }
    };
    Ok(repo.with_compression(config.core.compression_level))
}

/// Parse a full 40-character object name
pub fn parse_hash(name: &str) -> Result<Sha1Hash> {
    Sha1Hash::from_hex(name.trim()).with_context(|| format!("Not a valid object name: {}", name))
}

/// Format a signature's time in its own offset ("Tue Nov 14 23:13:20 2023 +0100")
pub fn format_signature_time(sig: &Signature) -> String {
    let offset = FixedOffset::east_opt(sig.offset_minutes * 60);
    let utc = DateTime::from_timestamp(sig.timestamp, 0);

    match (utc, offset) {
        (Some(utc), Some(offset)) => utc
            .with_timezone(&offset)
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string(),
        _ => format!("{} {}", sig.timestamp, sig.format_offset()),
    }
}
