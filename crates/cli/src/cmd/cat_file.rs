//! Show an object's type, size or content

use crate::util;
use anyhow::Result;
use std::io::Write;
use tinygit_core::tree::{parse_tree, EntryKind};
use tinygit_core::{ObjectType, Repository};

/// What to print about the object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatMode {
    Type,
    Size,
    Pretty,
}

pub fn run(repo: &Repository, mode: CatMode, name: &str) -> Result<()> {
    let hash = util::parse_hash(name)?;
    let object = repo.objects().read(hash)?;

    let mut stdout = std::io::stdout().lock();
    match mode {
        CatMode::Type => writeln!(stdout, "{}", object.object_type)?,
        CatMode::Size => writeln!(stdout, "{}", object.payload.len())?,
        CatMode::Pretty if object.object_type == ObjectType::Tree => {
            for entry in parse_tree(hash, &object.payload)? {
                let kind = EntryKind::from_mode(entry.mode)
                    .map(|k| k.object_type())
                    .unwrap_or(ObjectType::Blob);
                writeln!(
                    stdout,
                    "{:06o} {} {}\t{}",
                    entry.mode, kind, entry.content_digest, entry.path
                )?;
            }
        }
        CatMode::Pretty => stdout.write_all(&object.payload)?,
    }
    stdout.flush()?;
    Ok(())
}
