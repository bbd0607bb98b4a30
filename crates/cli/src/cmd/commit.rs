//! Record the current index as a new commit on master

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use tinygit_core::Repository;

pub fn run(
    repo: &Repository,
    config: &SystemConfig,
    message: &str,
    author: Option<String>,
) -> Result<()> {
    if message.trim().is_empty() {
        anyhow::bail!("Aborting commit due to empty commit message");
    }

    let author = system_config::resolve_author(author, config)?;
    let hash = repo.commit(message, &author).context("Commit failed")?;

    println!("{}", hash);
    Ok(())
}
