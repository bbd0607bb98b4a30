//! Integration tests for the object store, index reader and commit pipeline

use std::fs;
use tinygit_core::hash::{git::hash_blob, hash_bytes};
use tinygit_core::index::{encode_index, IndexEntry};
use tinygit_core::{Commit, Error, ObjectType, Repository};

fn repo_with_index(entries: &[IndexEntry]) -> anyhow::Result<(tempfile::TempDir, Repository)> {
    let temp_dir = tempfile::tempdir()?;
    let repo = Repository::init(&temp_dir.path().join(".git"))?;
    fs::write(repo.index_path(), encode_index(entries))?;
    Ok((temp_dir, repo))
}

#[test]
fn test_hello_txt_end_to_end() -> anyhow::Result<()> {
    let blob_content = b"Hello, world!\n";
    let (_temp, repo) = repo_with_index(&[])?;
    let digest = repo.objects().store(ObjectType::Blob, blob_content, true)?;
    fs::write(
        repo.index_path(),
        encode_index(&[IndexEntry::new("hello.txt", 0o100644, digest)]),
    )?;

    let tree = repo.write_tree()?;

    let mut framed = b"tree 37\0100644 hello.txt\0".to_vec();
    framed.extend_from_slice(digest.as_bytes());
    assert_eq!(tree, hash_bytes(&framed));

    let commit_hash = repo.commit("msg", "Alice")?;
    let object = repo.objects().read(commit_hash)?;
    assert_eq!(object.object_type, ObjectType::Commit);

    let text = String::from_utf8(object.payload)?;
    let mut lines = text.split('\n');
    assert_eq!(lines.next(), Some(format!("tree {}", tree).as_str()));
    let author = lines.next().unwrap_or_default();
    let committer = lines.next().unwrap_or_default();
    assert!(author.starts_with("author Alice "), "{author}");
    assert!(committer.starts_with("committer Alice "), "{committer}");
    assert_eq!(&author["author ".len()..], &committer["committer ".len()..]);
    assert!(text.ends_with("\n\nmsg\n"));
    assert!(!text.contains("parent "));

    assert_eq!(
        fs::read_to_string(repo.root().join("refs/heads/master"))?,
        format!("{}\n", commit_hash)
    );
    Ok(())
}

#[test]
fn test_storing_twice_writes_once() -> anyhow::Result<()> {
    let (_temp, repo) = repo_with_index(&[])?;

    let first = repo.objects().store(ObjectType::Blob, b"twice", true)?;
    let path = repo.objects().object_path(first);
    let bytes = fs::read(&path)?;
    let modified = fs::metadata(&path)?.modified()?;

    let reopened = Repository::open(repo.root())?;
    let second = reopened.objects().store(ObjectType::Blob, b"twice", true)?;

    assert_eq!(first, second);
    assert_eq!(fs::read(&path)?, bytes);
    assert_eq!(fs::metadata(&path)?.modified()?, modified);
    Ok(())
}

#[test]
fn test_tree_determinism_across_repositories() -> anyhow::Result<()> {
    let entries = vec![
        IndexEntry::new("Cargo.toml", 0o100644, hash_blob(b"[package]")),
        IndexEntry::new("build.sh", 0o100755, hash_blob(b"#!/bin/sh")),
        IndexEntry::new("main.rs", 0o100644, hash_blob(b"fn main() {}")),
    ];
    let (_a, repo_a) = repo_with_index(&entries)?;
    let (_b, repo_b) = repo_with_index(&entries)?;

    assert_eq!(repo_a.write_tree()?, repo_b.write_tree()?);
    Ok(())
}

#[test]
fn test_commit_twice_chains_parent() -> anyhow::Result<()> {
    let (_temp, repo) = repo_with_index(&[IndexEntry::new("a.txt", 0o100644, hash_blob(b"1"))])?;
    let first = repo.commit("first", "Alice <alice@example.com>")?;

    fs::write(
        repo.index_path(),
        encode_index(&[IndexEntry::new("a.txt", 0o100644, hash_blob(b"2"))]),
    )?;
    let second = repo.commit("second", "Alice <alice@example.com>")?;

    let object = repo.objects().read(second)?;
    let commit = Commit::parse(second, &object.payload)?;
    assert_eq!(commit.parent, Some(first));
    assert_eq!(commit.author, commit.committer);
    assert_eq!(repo.head()?, Some(second));
    Ok(())
}

#[test]
fn test_unborn_branch_commit_has_no_parent() -> anyhow::Result<()> {
    let (_temp, repo) = repo_with_index(&[IndexEntry::new("a.txt", 0o100644, hash_blob(b"a"))])?;
    // An empty pointer file is also unborn
    fs::write(repo.branch().path(), "")?;

    let hash = repo.commit("root commit", "Alice")?;
    let commit = repo.read_commit(hash)?;
    assert_eq!(commit.parent, None);
    assert_eq!(commit.message, "root commit");
    Ok(())
}

#[test]
fn test_nested_path_stores_nothing() -> anyhow::Result<()> {
    let (_temp, repo) = repo_with_index(&[IndexEntry::new("a/b", 0o100644, hash_blob(b"b"))])?;

    assert!(matches!(repo.write_tree(), Err(Error::UnsupportedPath(p)) if p == "a/b"));
    assert_eq!(fs::read_dir(repo.root().join("objects"))?.count(), 0);
    Ok(())
}

#[test]
fn test_corrupt_index_aborts_commit() -> anyhow::Result<()> {
    let (_temp, repo) = repo_with_index(&[IndexEntry::new("a.txt", 0o100644, hash_blob(b"a"))])?;
    let first = repo.commit("first", "Alice")?;

    let mut bytes = fs::read(repo.index_path())?;
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(repo.index_path(), bytes)?;

    assert!(matches!(
        repo.commit("second", "Alice"),
        Err(Error::CorruptIndex(_))
    ));
    assert_eq!(repo.head()?, Some(first));
    Ok(())
}

#[test]
fn test_concurrent_updater_is_rejected() -> anyhow::Result<()> {
    let (_temp, repo) = repo_with_index(&[IndexEntry::new("a.txt", 0o100644, hash_blob(b"a"))])?;
    let first = repo.commit("first", "Alice")?;

    // Another writer is mid-update
    let lock = repo.root().join("refs/heads/master.lock");
    fs::write(&lock, "")?;
    assert!(matches!(
        repo.commit("second", "Alice"),
        Err(Error::RefLocked(_))
    ));
    assert_eq!(repo.head()?, Some(first));

    fs::remove_file(&lock)?;
    let second = repo.commit("second", "Alice")?;
    assert_eq!(repo.read_commit(second)?.parent, Some(first));
    Ok(())
}
