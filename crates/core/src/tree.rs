//! Flat tree objects built from the staging index

use crate::error::{Error, Result};
use crate::hash::Sha1Hash;
use crate::index::IndexEntry;
use crate::object::{ObjectStore, ObjectType};

/// Kind of tree entry, derived from its mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file (100644)
    File,
    /// Executable file (100755)
    Executable,
    /// Symbolic link (120000)
    Symlink,
    /// Submodule commit (160000)
    Gitlink,
}

impl EntryKind {
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode {
            0o100644 => Some(EntryKind::File),
            0o100755 => Some(EntryKind::Executable),
            0o120000 => Some(EntryKind::Symlink),
            0o160000 => Some(EntryKind::Gitlink),
            _ => None,
        }
    }

    /// Type of the object the entry points at
    pub fn object_type(&self) -> ObjectType {
        match self {
            EntryKind::Gitlink => ObjectType::Commit,
            _ => ObjectType::Blob,
        }
    }
}

/// One `(mode, path, digest)` triple of a tree payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: u32,
    pub path: String,
    pub content_digest: Sha1Hash,
}

impl From<&IndexEntry> for TreeEntry {
    fn from(entry: &IndexEntry) -> Self {
        Self {
            mode: entry.mode,
            path: entry.path.clone(),
            content_digest: entry.content_digest,
        }
    }
}

/// Serialize entries in the given order
///
/// Each entry is `"<mode in octal> <path>\0"` followed by the 20 raw digest
/// bytes.
pub fn serialize_tree(entries: &[TreeEntry]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for entry in entries {
        bytes.extend_from_slice(format!("{:o} {}", entry.mode, entry.path).as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(entry.content_digest.as_bytes());
    }
    bytes
}

/// Parse a tree payload; `hash` names the object in errors
pub fn parse_tree(hash: Sha1Hash, payload: &[u8]) -> Result<Vec<TreeEntry>> {
    let corrupt = |reason: String| Error::CorruptObject { hash, reason };

    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < payload.len() {
        let rest = &payload[offset..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| corrupt(format!("unterminated entry at offset {offset}")))?;
        let text = std::str::from_utf8(&rest[..nul])
            .map_err(|_| corrupt(format!("entry at offset {offset} is not UTF-8")))?;
        let (mode, path) = text
            .split_once(' ')
            .ok_or_else(|| corrupt(format!("entry {text:?} has no mode")))?;
        let mode = u32::from_str_radix(mode, 8)
            .map_err(|_| corrupt(format!("bad mode {mode:?}")))?;

        let digest_start = nul + 1;
        let digest_end = digest_start + Sha1Hash::LEN;
        if digest_end > rest.len() {
            return Err(corrupt(format!("truncated digest for {path:?}")));
        }
        let content_digest = Sha1Hash::from_slice(&rest[digest_start..digest_end])?;

        entries.push(TreeEntry {
            mode,
            path: path.to_string(),
            content_digest,
        });
        offset += digest_end;
    }
    Ok(entries)
}

/// Build and store one tree object from index entries
///
/// Every path is checked before anything is written, so a rejected index
/// stores nothing. Entries keep index order, which is already sorted.
pub fn build_tree(objects: &ObjectStore, entries: &[IndexEntry]) -> Result<Sha1Hash> {
    if let Some(nested) = entries.iter().find(|e| e.path.contains('/')) {
        return Err(Error::UnsupportedPath(nested.path.clone()));
    }

    let tree_entries: Vec<TreeEntry> = entries.iter().map(TreeEntry::from).collect();
    let payload = serialize_tree(&tree_entries);
    let hash = objects.store(ObjectType::Tree, &payload, true)?;

    tracing::debug!(%hash, entries = tree_entries.len(), "wrote tree");
    Ok(hash)
}
