//! Staging index (DIRC version 2) decoding
//!
//! Layout, all integers big-endian:
//! ```text
//! header   "DIRC" | version: u32 | entry_count: u32
//! entry    ctime_sec ctime_nsec mtime_sec mtime_nsec dev ino mode uid gid size (10 x u32)
//!          content_digest [u8; 20] | flags: u16 | path | NUL padding to a multiple of 8
//! ext*     signature [u8; 4] | len: u32 | payload [u8; len]
//! trailer  SHA-1 of every preceding byte
//! ```

use crate::error::{Error, Result};
use crate::hash::{hash_bytes, Sha1Hash};
use std::path::Path;

const SIGNATURE: &[u8; 4] = b"DIRC";
const SUPPORTED_VERSION: u32 = 2;
const HEADER_LEN: usize = 12;
const CHECKSUM_LEN: usize = Sha1Hash::LEN;
/// Ten u32 fields, the digest and the flags
const ENTRY_FIXED_LEN: usize = 62;

const FLAG_EXTENDED: u16 = 0x4000;
const FLAG_STAGE_MASK: u16 = 0x3000;
const FLAG_NAME_MASK: u16 = 0x0FFF;

/// One staged file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub ctime_sec: u32,
    pub ctime_nsec: u32,
    pub mtime_sec: u32,
    pub mtime_nsec: u32,
    pub device_id: u32,
    pub inode: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    pub content_digest: Sha1Hash,
    pub flags: u16,
    pub path: String,
}

impl IndexEntry {
    /// Entry with zeroed stat data and the name length in `flags`
    pub fn new(path: impl Into<String>, mode: u32, content_digest: Sha1Hash) -> Self {
        let path = path.into();
        let flags = path.len().min(FLAG_NAME_MASK as usize) as u16;
        Self {
            ctime_sec: 0,
            ctime_nsec: 0,
            mtime_sec: 0,
            mtime_nsec: 0,
            device_id: 0,
            inode: 0,
            mode,
            uid: 0,
            gid: 0,
            size: 0,
            content_digest,
            flags,
            path,
        }
    }

    /// Merge stage (0 for normal entries)
    pub fn stage(&self) -> u16 {
        (self.flags & FLAG_STAGE_MASK) >> 12
    }
}

/// Bytes an entry with a path of `path_len` occupies on disk
///
/// The NUL terminator is always present, then padding up to the next
/// multiple of 8.
pub fn entry_disk_len(path_len: usize) -> usize {
    (ENTRY_FIXED_LEN + path_len + 1).div_ceil(8) * 8
}

/// Read the index at `path`; a missing file is an empty stage
pub fn read_index(path: &Path) -> Result<Vec<IndexEntry>> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no index file, stage is empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(Error::storage(path, e)),
    };

    let entries = parse_index(&data)?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "decoded index");
    Ok(entries)
}

/// Decode a complete index file image
pub fn parse_index(data: &[u8]) -> Result<Vec<IndexEntry>> {
    if data.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(corrupt(format!(
            "file is {} bytes, shorter than header and checksum",
            data.len()
        )));
    }

    let (body, stored) = data.split_at(data.len() - CHECKSUM_LEN);
    let computed = hash_bytes(body);
    if computed.as_bytes()[..] != stored[..] {
        return Err(corrupt(format!(
            "checksum mismatch: stored {}, computed {}",
            hex::encode(stored),
            computed
        )));
    }

    let mut cursor = Cursor::new(body);
    let entry_count = parse_header(&mut cursor)?;

    let max_entries = cursor.remaining() / entry_disk_len(0);
    if entry_count as usize > max_entries {
        return Err(corrupt(format!(
            "declared {} entries, but the body holds at most {}",
            entry_count, max_entries
        )));
    }

    let mut entries: Vec<IndexEntry> = Vec::with_capacity(entry_count as usize);
    for i in 0..entry_count {
        let entry = parse_entry(&mut cursor).map_err(|e| match e {
            Error::CorruptIndex(reason) => corrupt(format!(
                "entry {} of {}: {}",
                i, entry_count, reason
            )),
            other => other,
        })?;

        if let Some(prev) = entries.last() {
            if (prev.path.as_str(), prev.stage()) >= (entry.path.as_str(), entry.stage()) {
                return Err(corrupt(format!(
                    "entries out of order: {:?} before {:?}",
                    prev.path, entry.path
                )));
            }
        }
        entries.push(entry);
    }

    skip_extensions(&mut cursor)?;

    if entries.len() != entry_count as usize {
        return Err(corrupt(format!(
            "declared {} entries, decoded {}",
            entry_count,
            entries.len()
        )));
    }

    Ok(entries)
}

/// Validate signature and version; returns the declared entry count
fn parse_header(cursor: &mut Cursor<'_>) -> Result<u32> {
    let signature = cursor.take(4)?;
    if signature != SIGNATURE {
        return Err(corrupt(format!("bad signature {:?}", signature)));
    }

    let version = cursor.u32()?;
    if version != SUPPORTED_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    cursor.u32()
}

fn parse_entry(cursor: &mut Cursor<'_>) -> Result<IndexEntry> {
    let start = cursor.pos;
    if cursor.remaining() < ENTRY_FIXED_LEN {
        return Err(corrupt("truncated entry"));
    }

    let ctime_sec = cursor.u32()?;
    let ctime_nsec = cursor.u32()?;
    let mtime_sec = cursor.u32()?;
    let mtime_nsec = cursor.u32()?;
    let device_id = cursor.u32()?;
    let inode = cursor.u32()?;
    let mode = cursor.u32()?;
    let uid = cursor.u32()?;
    let gid = cursor.u32()?;
    let size = cursor.u32()?;
    let content_digest = Sha1Hash::from_slice(cursor.take(Sha1Hash::LEN)?)?;
    let flags = cursor.u16()?;

    if flags & FLAG_EXTENDED != 0 {
        return Err(corrupt("extended flags are not valid in a version 2 index"));
    }

    // The 12-bit name length saturates, so the NUL terminator is authoritative
    let rest = &cursor.data[cursor.pos..];
    let path_len = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| corrupt("path is not NUL-terminated"))?;
    let path = std::str::from_utf8(&rest[..path_len])
        .map_err(|_| corrupt("path is not valid UTF-8"))?
        .to_string();

    let end = start + entry_disk_len(path_len);
    if end > cursor.data.len() {
        return Err(corrupt(format!("padding of {:?} runs past end of file", path)));
    }
    cursor.pos = end;

    Ok(IndexEntry {
        ctime_sec,
        ctime_nsec,
        mtime_sec,
        mtime_nsec,
        device_id,
        inode,
        mode,
        uid,
        gid,
        size,
        content_digest,
        flags,
        path,
    })
}

/// Skip extension blocks between the last entry and the checksum
fn skip_extensions(cursor: &mut Cursor<'_>) -> Result<()> {
    while cursor.remaining() > 0 {
        if cursor.remaining() < 8 {
            return Err(corrupt(format!(
                "{} trailing bytes after entries",
                cursor.remaining()
            )));
        }

        let signature = cursor.take(4)?.to_vec();
        let len = cursor.u32()? as usize;
        if !signature[0].is_ascii_uppercase() {
            return Err(corrupt(format!(
                "unknown mandatory extension {:?}",
                String::from_utf8_lossy(&signature)
            )));
        }
        // Optional signatures are four uppercase letters; anything else here
        // is an entry the header did not count
        if !signature.iter().all(u8::is_ascii_uppercase) {
            return Err(corrupt(format!(
                "malformed extension signature {:?}",
                String::from_utf8_lossy(&signature)
            )));
        }
        if len > cursor.remaining() {
            return Err(corrupt(format!(
                "extension {:?} overruns checksum",
                String::from_utf8_lossy(&signature)
            )));
        }

        tracing::warn!(
            extension = %String::from_utf8_lossy(&signature),
            len,
            "skipping optional index extension"
        );
        cursor.pos += len;
    }
    Ok(())
}

/// Encode entries, in the given order, into a complete index file image
pub fn encode_index(entries: &[IndexEntry]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(
        HEADER_LEN
            + entries.iter().map(|e| entry_disk_len(e.path.len())).sum::<usize>()
            + CHECKSUM_LEN,
    );

    bytes.extend_from_slice(SIGNATURE);
    bytes.extend_from_slice(&SUPPORTED_VERSION.to_be_bytes());
    bytes.extend_from_slice(&(entries.len() as u32).to_be_bytes());

    for entry in entries {
        let start = bytes.len();
        for field in [
            entry.ctime_sec,
            entry.ctime_nsec,
            entry.mtime_sec,
            entry.mtime_nsec,
            entry.device_id,
            entry.inode,
            entry.mode,
            entry.uid,
            entry.gid,
            entry.size,
        ] {
            bytes.extend_from_slice(&field.to_be_bytes());
        }
        bytes.extend_from_slice(entry.content_digest.as_bytes());
        bytes.extend_from_slice(&entry.flags.to_be_bytes());
        bytes.extend_from_slice(entry.path.as_bytes());
        bytes.resize(start + entry_disk_len(entry.path.len()), 0);
    }

    let checksum = hash_bytes(&bytes);
    bytes.extend_from_slice(checksum.as_bytes());
    bytes
}

fn corrupt(reason: impl Into<String>) -> Error {
    Error::CorruptIndex(reason.into())
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(corrupt("unexpected end of file"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }
}
