//! Store a tree object for the current index

use anyhow::Result;
use tinygit_core::Repository;

pub fn run(repo: &Repository) -> Result<()> {
    let hash = repo.write_tree()?;
    println!("{}", hash);
    Ok(())
}
