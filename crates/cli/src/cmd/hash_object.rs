//! Compute an object name, optionally storing the object

use anyhow::{Context, Result};
use std::path::Path;
use tinygit_core::hash::git;
use tinygit_core::{ObjectType, Repository};

pub fn run(
    repo: Option<&Repository>,
    object_type: ObjectType,
    write: bool,
    file: &Path,
) -> Result<()> {
    let hash = match repo {
        Some(repo) => {
            let content = std::fs::read(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            repo.objects().store(object_type, &content, write)?
        }
        None => git::hash_file(object_type, file)
            .with_context(|| format!("Failed to hash {}", file.display()))?,
    };

    println!("{}", hash);
    Ok(())
}
