//! Filesystem primitives for the cognitive asset manager
//!
//! Provides content checksums, atomic writes, format-agnostic config loading,
//! and the symlink/copy primitives the link projector is built on.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod link;
pub mod path;

pub use config::ConfigStore;
pub use constants::ProjectPath;
pub use error::{Error, Result};
pub use link::{EntryKind, LinkMethod};
pub use path::{
    canonicalize_lenient, is_within, normalize_lexically, relative_path, validate_identifier,
};
