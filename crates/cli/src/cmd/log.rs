//! Display commit history

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use tinygit_core::Repository;

pub fn run(repo: &Repository, limit: Option<usize>) -> Result<()> {
    let history = repo.log(limit)?;

    if history.is_empty() {
        println!("{}", "No commits yet".dimmed());
        return Ok(());
    }

    for (i, (hash, commit)) in history.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", format!("commit {}", hash).yellow());
        println!("Author: {}", commit.author.ident);
        println!("Date:   {}", util::format_signature_time(&commit.author));
        println!();
        for line in commit.message.lines() {
            println!("    {}", line);
        }
    }
    Ok(())
}
