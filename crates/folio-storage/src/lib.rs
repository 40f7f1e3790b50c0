//! Folio Storage Library
//!
//! Rooted local filesystem storage for originals and derivatives.
//!
//! # Key format
//!
//! Every file is addressed by a key relative to its root, using `/` separators
//! regardless of host OS. Keys must not contain `..` and never start with `/`;
//! [`keys::normalize_key`] is the single place that enforces this.
//!
//! Nothing here takes locks. Name allocation followed by file creation is not
//! atomic, so two concurrent ingests of the same filename can pick the same
//! destination.

pub mod error;
pub mod keys;
pub mod local;

pub use error::{StorageError, StorageResult};
pub use keys::{join_url, normalize_key, to_key};
pub use local::{FileStat, LocalStorage, CHUNK_SIZE};
