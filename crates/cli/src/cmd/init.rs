//! Create an empty repository

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tinygit_core::Repository;

pub fn run(path: Option<&Path>) -> Result<()> {
    let base = match path {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let git_dir: PathBuf = base.join(".git");

    Repository::init(&git_dir)
        .with_context(|| format!("Failed to initialize repository in {}", base.display()))?;

    println!(
        "{} {}",
        "Initialized empty repository in".green(),
        git_dir.display()
    );
    Ok(())
}
