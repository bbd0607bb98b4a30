//! tinygit core - content-addressed object store and commit plumbing
//!
//! This crate provides:
//! - SHA-1 hashing (Git-compatible)
//! - Loose object storage with zlib compression
//! - Staging index (DIRC v2) decoding
//! - Flat tree and commit construction
//! - The branch pointer and its compare-and-swap update

pub mod commit;
pub mod error;
pub mod hash;
pub mod index;
pub mod object;
pub mod refs;
pub mod store;
pub mod tree;

// Re-export main types for convenience
pub use commit::{Commit, Signature};
pub use error::{Error, Result};
pub use hash::{IncrementalHasher, Sha1Hash};
pub use index::IndexEntry;
pub use object::{Object, ObjectStore, ObjectType};
pub use refs::BranchRef;
pub use store::Repository;
pub use tree::{EntryKind, TreeEntry};
