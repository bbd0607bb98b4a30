//! Loose object storage with zlib compression and content-addressing

use crate::error::{Error, IoResultExt, Result};
use crate::hash::{git, Sha1Hash};
use dashmap::DashSet;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Type tag of a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl ObjectType {
    /// Header keyword for this type
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
        }
    }

    /// Parse a header keyword
    pub fn parse(keyword: &[u8]) -> Option<Self> {
        match keyword {
            b"blob" => Some(ObjectType::Blob),
            b"tree" => Some(ObjectType::Tree),
            b"commit" => Some(ObjectType::Commit),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s.as_bytes()).ok_or_else(|| format!("unknown object type {s:?}"))
    }
}

/// Encode the `"<type> <len>\0"` header that precedes every payload
pub fn encode_header(object_type: ObjectType, len: usize) -> Vec<u8> {
    let mut header = format!("{} {}", object_type.as_str(), len).into_bytes();
    header.push(0);
    header
}

/// An immutable typed payload. The digest is always derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub object_type: ObjectType,
    pub payload: Vec<u8>,
}

impl Object {
    pub fn new(object_type: ObjectType, payload: Vec<u8>) -> Self {
        Self {
            object_type,
            payload,
        }
    }

    /// Content address of this object
    pub fn hash(&self) -> Sha1Hash {
        git::hash_object(self.object_type, &self.payload)
    }

    /// Header, NUL and payload, as written (before compression)
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = encode_header(self.object_type, self.payload.len());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Parse the uncompressed `"<type> <len>\0<payload>"` framing
    pub fn decode(hash: Sha1Hash, raw: &[u8]) -> Result<Self> {
        let corrupt = |reason: &str| Error::CorruptObject {
            hash,
            reason: reason.to_string(),
        };

        let nul = raw
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| corrupt("missing header terminator"))?;
        let header = &raw[..nul];
        let space = header
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| corrupt("malformed header"))?;

        let object_type =
            ObjectType::parse(&header[..space]).ok_or_else(|| corrupt("unknown object type"))?;
        let declared_len: usize = std::str::from_utf8(&header[space + 1..])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| corrupt("malformed length"))?;

        let payload = &raw[nul + 1..];
        if payload.len() != declared_len {
            return Err(corrupt(&format!(
                "declared length {} but payload is {} bytes",
                declared_len,
                payload.len()
            )));
        }

        Ok(Self::new(object_type, payload.to_vec()))
    }
}

/// Content-addressed object store rooted at `<root>/objects`
///
/// Layout: `objects/<first 2 hex chars>/<remaining 38 hex chars>`, each file
/// holding the zlib-compressed `"<type> <len>\0<payload>"`.
pub struct ObjectStore {
    /// The `objects/` directory
    objects_dir: PathBuf,
    /// Digests known to be on disk
    present: DashSet<Sha1Hash>,
    compression: Compression,
}

impl ObjectStore {
    /// Create a store over an existing `objects/` directory
    pub fn new(objects_dir: PathBuf) -> Self {
        Self {
            objects_dir,
            present: DashSet::new(),
            compression: Compression::default(),
        }
    }

    /// Set the zlib level (0-9) used for new objects
    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = Compression::new(level.min(9));
        self
    }

    /// Hash a payload and, if `write` is set, persist it
    ///
    /// The digest is computed in both cases. Writing an object that already
    /// exists is a no-op; the existing file is never touched.
    pub fn store(&self, object_type: ObjectType, payload: &[u8], write: bool) -> Result<Sha1Hash> {
        let hash = git::hash_object(object_type, payload);
        if !write {
            return Ok(hash);
        }

        if self.contains(hash) {
            tracing::debug!(%hash, %object_type, "object already present");
            return Ok(hash);
        }

        let object_path = self.object_path(hash);
        let shard_dir = object_path
            .parent()
            .unwrap_or(self.objects_dir.as_path())
            .to_path_buf();
        fs::create_dir_all(&shard_dir).at(&shard_dir)?;

        let mut encoder = ZlibEncoder::new(Vec::new(), self.compression);
        encoder
            .write_all(&encode_header(object_type, payload.len()))
            .at(&object_path)?;
        encoder.write_all(payload).at(&object_path)?;
        let compressed = encoder.finish().at(&object_path)?;

        write_if_absent(&shard_dir, &object_path, &compressed)?;
        self.present.insert(hash);

        tracing::debug!(%hash, %object_type, size = payload.len(), "wrote object");
        Ok(hash)
    }

    /// Store a file's contents as a blob
    pub fn store_file(&self, path: &Path, write: bool) -> Result<Sha1Hash> {
        let content = fs::read(path).at(path)?;
        self.store(ObjectType::Blob, &content, write)
    }

    /// Read, inflate and verify an object
    pub fn read(&self, hash: Sha1Hash) -> Result<Object> {
        let object_path = self.object_path(hash);
        let compressed = match fs::read(&object_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::ObjectNotFound(hash));
            }
            Err(e) => return Err(Error::storage(&object_path, e)),
        };

        let mut raw = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut raw)
            .map_err(|e| Error::CorruptObject {
                hash,
                reason: format!("inflate failed: {e}"),
            })?;

        let object = Object::decode(hash, &raw)?;

        let actual = object.hash();
        if actual != hash {
            return Err(Error::CorruptObject {
                hash,
                reason: format!("content hashes to {actual}"),
            });
        }

        self.present.insert(hash);
        Ok(object)
    }

    /// Check if an object exists
    pub fn contains(&self, hash: Sha1Hash) -> bool {
        if self.present.contains(&hash) {
            return true;
        }

        let exists = self.object_path(hash).is_file();
        if exists {
            self.present.insert(hash);
        }
        exists
    }

    /// Get the filesystem path for an object
    pub fn object_path(&self, hash: Sha1Hash) -> PathBuf {
        let hex = hash.to_hex();
        let (prefix, rest) = hex.split_at(2);
        self.objects_dir.join(prefix).join(rest)
    }

    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }
}

/// Atomically create `target` with `data` unless it already exists
///
/// The data goes to a uniquely named temp file in the same shard directory,
/// is fsynced, then hard-linked into place. Linking fails instead of
/// replacing when a racing writer got there first, which counts as success.
fn write_if_absent(shard_dir: &Path, target: &Path, data: &[u8]) -> Result<()> {
    let temp_path = shard_dir.join(format!("tmp_obj_{}", uuid::Uuid::new_v4()));

    let result = (|| -> Result<()> {
        let mut temp_file = fs::File::create(&temp_path).at(&temp_path)?;
        temp_file.write_all(data).at(&temp_path)?;
        temp_file.sync_all().at(&temp_path)?;
        drop(temp_file);

        match fs::hard_link(&temp_path, target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            // Filesystems without hard links: fall back to rename unless a
            // racing writer already created the target
            Err(e) if !target.exists() => {
                tracing::debug!(path = %target.display(), error = %e, "hard link failed, renaming");
                fs::rename(&temp_path, target).at(target)
            }
            Err(e) => {
                tracing::debug!(
                    path = %target.display(),
                    error = %e,
                    "hard link failed, object already present"
                );
                Ok(())
            }
        }
    })();

    let _ = fs::remove_file(&temp_path);
    result?;

    // Fsync shard directory for durability
    if let Ok(dir) = fs::File::open(shard_dir) {
        let _ = dir.sync_all();
    }

    Ok(())
}
