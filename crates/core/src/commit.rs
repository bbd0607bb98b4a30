//! Commit objects: serialization, parsing and timestamps

use crate::error::{Error, Result};
use crate::hash::Sha1Hash;
use chrono::{Local, Offset};

/// Identity plus the moment it signed, e.g. `Alice <a@example.com> 1700000000 +0100`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Free-form identity, conventionally `Name <email>`
    pub ident: String,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// Local offset from UTC in minutes
    pub offset_minutes: i32,
}

impl Signature {
    /// Sign with the current local time and UTC offset
    pub fn now(ident: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            ident: ident.into(),
            timestamp: now.timestamp(),
            offset_minutes: now.offset().fix().local_minus_utc() / 60,
        }
    }

    /// Offset formatted as `±HHMM`
    pub fn format_offset(&self) -> String {
        let sign = if self.offset_minutes < 0 { '-' } else { '+' };
        let minutes = self.offset_minutes.unsigned_abs();
        format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60)
    }

    fn parse(value: &str) -> Option<Self> {
        let mut parts = value.rsplitn(3, ' ');
        let offset = parts.next()?;
        let timestamp = parts.next()?.parse().ok()?;
        let ident = parts.next()?.to_string();

        let (sign, digits) = match offset.as_bytes().first()? {
            b'+' => (1, &offset[1..]),
            b'-' => (-1, &offset[1..]),
            _ => return None,
        };
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let hours: i32 = digits[..2].parse().ok()?;
        let minutes: i32 = digits[2..].parse().ok()?;

        Some(Self {
            ident,
            timestamp,
            offset_minutes: sign * (hours * 60 + minutes),
        })
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.ident, self.timestamp, self.format_offset())
    }
}

/// A commit: one tree snapshot, an optional parent and metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: Sha1Hash,
    /// Absent for the first commit on an unborn branch
    pub parent: Option<Sha1Hash>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl Commit {
    /// Commit where author and committer are the same signature
    pub fn new(
        tree: Sha1Hash,
        parent: Option<Sha1Hash>,
        signature: Signature,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            parent,
            author: signature.clone(),
            committer: signature,
            message: message.into(),
        }
    }

    /// Serialize to the commit payload
    ///
    /// ```text
    /// tree <hex>
    /// parent <hex>        (only when there is a parent)
    /// author <signature>
    /// committer <signature>
    ///
    /// <message>
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let mut text = format!("tree {}\n", self.tree);
        if let Some(parent) = &self.parent {
            text.push_str(&format!("parent {}\n", parent));
        }
        text.push_str(&format!("author {}\n", self.author));
        text.push_str(&format!("committer {}\n", self.committer));
        text.push('\n');
        text.push_str(&self.message);
        text.push('\n');
        text.into_bytes()
    }

    /// Parse a commit payload; `hash` names the object in errors
    ///
    /// Unknown headers (and their continuation lines) are ignored. Only the
    /// first `parent` is kept since history here is linear.
    pub fn parse(hash: Sha1Hash, payload: &[u8]) -> Result<Self> {
        let corrupt = |reason: &str| Error::CorruptObject {
            hash,
            reason: reason.to_string(),
        };

        let text = std::str::from_utf8(payload).map_err(|_| corrupt("commit is not UTF-8"))?;
        let (headers, message) = text
            .split_once("\n\n")
            .ok_or_else(|| corrupt("missing blank line before message"))?;

        let mut tree = None;
        let mut parent = None;
        let mut author = None;
        let mut committer = None;

        for line in headers.lines() {
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };
            match key {
                "tree" => tree = Some(Sha1Hash::from_hex(value)?),
                "parent" if parent.is_none() => parent = Some(Sha1Hash::from_hex(value)?),
                "author" => {
                    let signature =
                        Signature::parse(value).ok_or_else(|| corrupt("malformed author"))?;
                    author = Some(signature);
                }
                "committer" => {
                    let signature =
                        Signature::parse(value).ok_or_else(|| corrupt("malformed committer"))?;
                    committer = Some(signature);
                }
                _ => {}
            }
        }

        Ok(Self {
            tree: tree.ok_or_else(|| corrupt("missing tree header"))?,
            parent,
            author: author.ok_or_else(|| corrupt("missing author header"))?,
            committer: committer.ok_or_else(|| corrupt("missing committer header"))?,
            message: message.strip_suffix('\n').unwrap_or(message).to_string(),
        })
    }
}
