//! Repository handle: root layout, tree and commit construction

use crate::commit::{Commit, Signature};
use crate::error::{Error, IoResultExt, Result};
use crate::hash::Sha1Hash;
use crate::index::{self, IndexEntry};
use crate::object::{ObjectStore, ObjectType};
use crate::refs::{BranchRef, MASTER_REF};
use crate::tree;
use std::fs;
use std::path::{Path, PathBuf};

/// Content of `HEAD` written at bootstrap
pub const HEAD_CONTENT: &str = "ref: refs/heads/master\n";

/// An opened repository
///
/// Every path is derived from the explicit root:
/// ```text
/// <root>/
///   HEAD
///   index
///   objects/
///     <hh>/<38 hex>
///   refs/
///     heads/
///       master
/// ```
pub struct Repository {
    root: PathBuf,
    objects: ObjectStore,
    branch: BranchRef,
}

impl Repository {
    /// Create the directory layout and `HEAD` for an empty repository
    pub fn init(root: &Path) -> Result<Self> {
        if root.exists() {
            return Err(Error::AlreadyExists(root.to_path_buf()));
        }

        fs::create_dir_all(root).at(root)?;
        for sub_dir in ["objects", "refs", "refs/heads"] {
            let path = root.join(sub_dir);
            fs::create_dir(&path).at(&path)?;
        }

        let head = root.join("HEAD");
        fs::write(&head, HEAD_CONTENT).at(&head)?;

        tracing::debug!(root = %root.display(), "initialized empty repository");
        Self::open(root)
    }

    /// Open a repository whose layout already exists
    pub fn open(root: &Path) -> Result<Self> {
        let required_dirs = ["objects", "refs/heads"];
        if required_dirs.iter().any(|dir| !root.join(dir).is_dir()) {
            return Err(Error::NotARepository(root.to_path_buf()));
        }

        Ok(Self {
            root: root.to_path_buf(),
            objects: ObjectStore::new(root.join("objects")),
            branch: BranchRef::master(root),
        })
    }

    /// Find `.git` in `start` or one of its ancestors
    pub fn discover(start: &Path) -> Result<Self> {
        for dir in start.ancestors() {
            let candidate = dir.join(".git");
            if candidate.is_dir() {
                return Self::open(&candidate);
            }
        }
        Err(Error::NotARepository(start.to_path_buf()))
    }

    /// Set the zlib level for objects written through this handle
    pub fn with_compression(mut self, level: u32) -> Self {
        self.objects = self.objects.with_compression(level);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn branch(&self) -> &BranchRef {
        &self.branch
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("index")
    }

    /// Staged entries; empty when there is no index file
    pub fn read_index(&self) -> Result<Vec<IndexEntry>> {
        index::read_index(&self.index_path())
    }

    /// Store a tree for the current index and return its digest
    ///
    /// Touches neither the index nor the branch pointer.
    pub fn write_tree(&self) -> Result<Sha1Hash> {
        let entries = self.read_index()?;
        tree::build_tree(&self.objects, &entries)
    }

    /// Commit the current index on top of the branch and advance it
    ///
    /// Tree, then commit object, then pointer: the pointer only ever names
    /// an object that is already on disk, and a failure before the last
    /// step leaves the branch where it was.
    pub fn commit(&self, message: &str, author: &str) -> Result<Sha1Hash> {
        let tree = self.write_tree()?;
        tracing::debug!(%tree, stage = "tree_built", "commit");

        let parent = self.branch.read()?;
        let commit = Commit::new(tree, parent, Signature::now(author), message);
        let hash = self
            .objects
            .store(ObjectType::Commit, &commit.serialize(), true)?;
        tracing::debug!(%hash, stage = "object_persisted", "commit");

        self.branch.update(hash, parent)?;
        tracing::debug!(%hash, stage = "pointer_advanced", branch = MASTER_REF, "commit");

        Ok(hash)
    }

    /// Latest commit on the branch
    pub fn head(&self) -> Result<Option<Sha1Hash>> {
        self.branch.read()
    }

    /// Load and parse a commit object
    pub fn read_commit(&self, hash: Sha1Hash) -> Result<Commit> {
        let object = self.objects.read(hash)?;
        if object.object_type != ObjectType::Commit {
            return Err(Error::CorruptObject {
                hash,
                reason: format!("expected commit, found {}", object.object_type),
            });
        }
        Commit::parse(hash, &object.payload)
    }

    /// Walk history from the branch tip, newest first
    pub fn log(&self, limit: Option<usize>) -> Result<Vec<(Sha1Hash, Commit)>> {
        let mut history = Vec::new();
        let mut next = self.head()?;

        while let Some(hash) = next {
            if limit.is_some_and(|n| history.len() >= n) {
                break;
            }
            let commit = self.read_commit(hash)?;
            next = commit.parent;
            history.push((hash, commit));
        }

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::git::hash_blob;
    use crate::index::encode_index;
    use anyhow::Result;

    fn stage(repo: &Repository, entries: &[IndexEntry]) -> Result<()> {
        fs::write(repo.index_path(), encode_index(entries))?;
        Ok(())
    }

    #[test]
    fn test_init_layout() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path().join("repo/.git");

        let repo = Repository::init(&root)?;

        assert!(repo.root().join("objects").is_dir());
        assert!(repo.root().join("refs").is_dir());
        assert!(repo.root().join("refs/heads").is_dir());
        assert_eq!(fs::read_to_string(root.join("HEAD"))?, HEAD_CONTENT);
        assert_eq!(repo.head()?, None);
        Ok(())
    }

    #[test]
    fn test_init_already_exists() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path().join(".git");

        Repository::init(&root)?;
        assert!(matches!(
            Repository::init(&root),
            Err(Error::AlreadyExists(_))
        ));
        Ok(())
    }

    #[test]
    fn test_open_not_a_repository() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        assert!(matches!(
            Repository::open(temp_dir.path()),
            Err(Error::NotARepository(_))
        ));
        Ok(())
    }

    #[test]
    fn test_discover_from_subdirectory() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        Repository::init(&temp_dir.path().join(".git"))?;
        let nested = temp_dir.path().join("a/b");
        fs::create_dir_all(&nested)?;

        let repo = Repository::discover(&nested)?;
        assert_eq!(repo.root(), temp_dir.path().join(".git"));
        Ok(())
    }

    #[test]
    fn test_write_tree_with_no_index() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let repo = Repository::init(&temp_dir.path().join(".git"))?;

        let hash = repo.write_tree()?;
        assert_eq!(hash.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
        Ok(())
    }

    #[test]
    fn test_write_tree_leaves_branch_alone() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let repo = Repository::init(&temp_dir.path().join(".git"))?;
        stage(&repo, &[IndexEntry::new("a.txt", 0o100644, hash_blob(b"a"))])?;

        repo.write_tree()?;
        assert_eq!(repo.head()?, None);
        assert!(!repo.branch().path().exists());
        Ok(())
    }

    #[test]
    fn test_commit_chain() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let repo = Repository::init(&temp_dir.path().join(".git"))?;

        stage(&repo, &[IndexEntry::new("a.txt", 0o100644, hash_blob(b"a"))])?;
        let first = repo.commit("first", "Alice")?;
        stage(&repo, &[IndexEntry::new("a.txt", 0o100644, hash_blob(b"a2"))])?;
        let second = repo.commit("second", "Alice")?;

        assert_eq!(repo.head()?, Some(second));
        assert_eq!(repo.read_commit(first)?.parent, None);
        assert_eq!(repo.read_commit(second)?.parent, Some(first));

        let log = repo.log(None)?;
        let hashes: Vec<Sha1Hash> = log.iter().map(|(h, _)| *h).collect();
        assert_eq!(hashes, vec![second, first]);
        assert_eq!(repo.log(Some(1))?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_failed_commit_leaves_branch_intact() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let repo = Repository::init(&temp_dir.path().join(".git"))?;

        stage(&repo, &[IndexEntry::new("a.txt", 0o100644, hash_blob(b"a"))])?;
        let first = repo.commit("first", "Alice")?;

        stage(&repo, &[IndexEntry::new("dir/a.txt", 0o100644, hash_blob(b"a"))])?;
        assert!(matches!(
            repo.commit("nested", "Alice"),
            Err(Error::UnsupportedPath(_))
        ));
        assert_eq!(repo.head()?, Some(first));
        Ok(())
    }

    #[test]
    fn test_read_commit_rejects_other_types() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let repo = Repository::init(&temp_dir.path().join(".git"))?;

        let blob = repo.objects().store(ObjectType::Blob, b"not a commit", true)?;
        assert!(matches!(
            repo.read_commit(blob),
            Err(Error::CorruptObject { .. })
        ));
        Ok(())
    }
}
