//! SHA-1 hashing primitives for content-addressed storage (Git-compatible)

use crate::error::{Error, Result};
use sha1::{Digest, Sha1};

/// A SHA-1 hash (20 bytes)
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Sha1Hash([u8; 20]);

impl Sha1Hash {
    /// Length of the raw digest in bytes
    pub const LEN: usize = 20;

    /// Create a new Sha1Hash from bytes
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly 20 bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; 20] = bytes.try_into().map_err(|_| {
            Error::InvalidHash(format!("expected {} bytes, got {}", Self::LEN, bytes.len()))
        })?;
        Ok(Self(raw))
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != Self::LEN * 2 {
            return Err(Error::InvalidHash(format!(
                "expected {} hex characters, got {}",
                Self::LEN * 2,
                hex_str.len()
            )));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|e| Error::InvalidHash(format!("{hex_str:?}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for Sha1Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sha1Hash({})", self.to_hex())
    }
}

impl std::fmt::Display for Sha1Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for Sha1Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// Hash bytes using SHA-1
pub fn hash_bytes(data: &[u8]) -> Sha1Hash {
    let digest = Sha1::digest(data);
    Sha1Hash::from_bytes(digest.into())
}

/// Incremental hasher for building hashes across multiple chunks
pub struct IncrementalHasher {
    inner: Sha1,
}

impl IncrementalHasher {
    /// Create a new incremental hasher
    pub fn new() -> Self {
        Self { inner: Sha1::new() }
    }

    /// Update the hash with more data
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize and return the hash
    pub fn finalize(self) -> Sha1Hash {
        Sha1Hash::from_bytes(self.inner.finalize().into())
    }
}

impl Default for IncrementalHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Git object hashing: `SHA-1("<type> <len>\0" || payload)`
pub mod git {
    use super::{IncrementalHasher, Sha1Hash};
    use crate::error::{Error, IoResultExt, Result};
    use crate::object::{encode_header, ObjectType};
    use std::fs::File;
    use std::io::{self, BufReader, Read};
    use std::path::Path;

    /// Hash a file as an object of `object_type`, streaming its contents
    pub fn hash_file(object_type: ObjectType, path: &Path) -> Result<Sha1Hash> {
        let file = File::open(path).at(path)?;
        let len = file.metadata().at(path)?.len();
        let mut reader = BufReader::new(file);

        let mut hasher = IncrementalHasher::new();
        hasher.update(&encode_header(object_type, len as usize));

        let mut buffer = [0u8; 8192];
        let mut hashed = 0u64;
        loop {
            let bytes_read = reader.read(&mut buffer).at(path)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
            hashed += bytes_read as u64;
        }

        if hashed != len {
            return Err(Error::storage(
                path,
                io::Error::new(io::ErrorKind::UnexpectedEof, "file changed while hashing"),
            ));
        }
        Ok(hasher.finalize())
    }

    /// Hash a typed payload exactly as Git does, without storing it
    pub fn hash_object(object_type: ObjectType, payload: &[u8]) -> Sha1Hash {
        let mut hasher = IncrementalHasher::new();
        hasher.update(&encode_header(object_type, payload.len()));
        hasher.update(payload);
        hasher.finalize()
    }

    /// Hash file contents as a Git blob
    pub fn hash_blob(content: &[u8]) -> Sha1Hash {
        hash_object(ObjectType::Blob, content)
    }
}
