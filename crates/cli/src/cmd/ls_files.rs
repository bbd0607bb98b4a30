//! List staged entries

use anyhow::{Context, Result};
use tinygit_core::Repository;

pub fn run(repo: &Repository, stage: bool) -> Result<()> {
    let entries = repo
        .read_index()
        .with_context(|| format!("Failed to read {}", repo.index_path().display()))?;

    for entry in entries {
        if stage {
            println!(
                "{:06o} {} {}\t{}",
                entry.mode,
                entry.content_digest,
                entry.stage(),
                entry.path
            );
        } else {
            println!("{}", entry.path);
        }
    }
    Ok(())
}
