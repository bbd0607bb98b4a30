//! Branch pointer: the single mutable cell naming the latest commit

use crate::error::{Error, IoResultExt, Result};
use crate::hash::Sha1Hash;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Relative location of the only branch modeled
pub const MASTER_REF: &str = "refs/heads/master";

/// A branch pointer file holding `<hex>\n`, or empty/absent when unborn
#[derive(Debug, Clone)]
pub struct BranchRef {
    path: PathBuf,
}

impl BranchRef {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `refs/heads/master` under a repository root
    pub fn master(root: &Path) -> Self {
        Self::new(root.join(MASTER_REF))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Current commit, or `None` for an unborn branch
    pub fn read(&self) -> Result<Option<Sha1Hash>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::storage(&self.path, e)),
        };

        let hex = content.trim();
        if hex.is_empty() {
            return Ok(None);
        }

        Sha1Hash::from_hex(hex).map(Some).map_err(|e| Error::CorruptRef {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Point the branch at `new` if it still points at `expected`
    ///
    /// `<ref>.lock` is created exclusively, so concurrent updaters fail with
    /// `RefLocked` instead of racing. The value is re-read under the lock and
    /// compared with `expected`; on a match the lock file is fsynced and
    /// renamed over the ref. Any failure leaves the ref as it was.
    pub fn update(&self, new: Sha1Hash, expected: Option<Sha1Hash>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }

        let mut lock = RefLock::acquire(self.lock_path())?;

        let actual = self.read()?;
        if actual != expected {
            return Err(Error::RefMoved { expected, actual });
        }

        lock.file
            .write_all(format!("{}\n", new.to_hex()).as_bytes())
            .at(&lock.path)?;
        lock.file.sync_all().at(&lock.path)?;
        lock.commit(&self.path)?;

        // Fsync parent directory for durability
        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        tracing::info!(branch = %self.path.display(), from = ?actual, to = %new, "advanced branch");
        Ok(())
    }
}

/// Exclusive `<ref>.lock` file, removed on drop unless renamed into place
struct RefLock {
    path: PathBuf,
    file: File,
    committed: bool,
}

impl RefLock {
    fn acquire(path: PathBuf) -> Result<Self> {
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::RefLocked(path));
            }
            Err(e) => return Err(Error::storage(&path, e)),
        };

        Ok(Self {
            path,
            file,
            committed: false,
        })
    }

    fn commit(&mut self, target: &Path) -> Result<()> {
        fs::rename(&self.path, target).at(target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for RefLock {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_bytes;
    use anyhow::Result;

    fn temp_ref() -> Result<(tempfile::TempDir, BranchRef)> {
        let temp_dir = tempfile::tempdir()?;
        fs::create_dir_all(temp_dir.path().join("refs/heads"))?;
        let branch = BranchRef::master(temp_dir.path());
        Ok((temp_dir, branch))
    }

    #[test]
    fn test_missing_ref_is_unborn() -> Result<()> {
        let (_temp, branch) = temp_ref()?;
        assert_eq!(branch.read()?, None);
        Ok(())
    }

    #[test]
    fn test_empty_ref_is_unborn() -> Result<()> {
        let (_temp, branch) = temp_ref()?;
        fs::write(branch.path(), "")?;
        assert_eq!(branch.read()?, None);
        fs::write(branch.path(), "\n")?;
        assert_eq!(branch.read()?, None);
        Ok(())
    }

    #[test]
    fn test_update_writes_hex_and_newline() -> Result<()> {
        let (_temp, branch) = temp_ref()?;
        let hash = hash_bytes(b"commit");

        branch.update(hash, None)?;

        assert_eq!(fs::read_to_string(branch.path())?, format!("{}\n", hash));
        assert_eq!(branch.read()?, Some(hash));
        assert!(!branch.lock_path().exists());
        Ok(())
    }

    #[test]
    fn test_update_rejects_stale_expectation() -> Result<()> {
        let (_temp, branch) = temp_ref()?;
        let first = hash_bytes(b"first");
        let second = hash_bytes(b"second");

        branch.update(first, None)?;
        let result = branch.update(second, None);

        assert!(matches!(
            result,
            Err(Error::RefMoved { expected: None, actual: Some(a) }) if a == first
        ));
        assert_eq!(branch.read()?, Some(first));
        assert!(!branch.lock_path().exists());
        Ok(())
    }

    #[test]
    fn test_update_fails_while_locked() -> Result<()> {
        let (_temp, branch) = temp_ref()?;
        fs::write(branch.lock_path(), "")?;

        let result = branch.update(hash_bytes(b"commit"), None);

        assert!(matches!(result, Err(Error::RefLocked(_))));
        assert_eq!(branch.read()?, None);
        // Someone else's lock is left alone
        assert!(branch.lock_path().exists());
        Ok(())
    }

    #[test]
    fn test_corrupt_ref() -> Result<()> {
        let (_temp, branch) = temp_ref()?;
        fs::write(branch.path(), "not a hash\n")?;
        assert!(matches!(branch.read(), Err(Error::CorruptRef { .. })));
        Ok(())
    }
}
