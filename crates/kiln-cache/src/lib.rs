//! Content-addressed store for compiler outputs and the filesystem protocol
//! it depends on.
//!
//! This crate implements the kiln cache's building blocks:
//! - the fan-out directory layout mapping fingerprints to object paths
//! - stat snapshots that carry their errno instead of failing
//! - race-tolerant filesystem primitives (directory creation, traversal,
//!   NFS-safe unlink, subtree wipe)
//! - materialization of objects by reflink clone, hard link, or copy
//! - base-directory relativization of source paths for reproducible
//!   fingerprints
//!
//! The cache root is shared read/write by many concurrent compiler
//! invocations with no coordinating daemon and no locks. The only atomicity
//! primitive is POSIX rename: objects are installed either by hard-linking an
//! already-named source or by copying to a unique temp name and renaming it
//! into place, so readers see the old bytes or the new, never a torn file.
//! Content addressing makes double-installs harmless, and hard-linked
//! objects are made read-only so a build tree cannot mutate a shared inode.

mod context;
mod error;
pub mod fs;
mod install;
mod relpath;
mod stat;
mod store;
mod util;

pub use context::{CacheConfig, Context};
pub use error::{CacheError, Result};
pub use install::{clone_file, copy_file, install_file, InstallMethod, MaterializationPolicy};
pub use relpath::{actual_cwd, apparent_cwd, make_relative_path};
pub use stat::{FileKind, FileStat, OnError};
pub use store::{cache_entry_path, for_each_level_1_subdir, get_level_1_files, CacheFile};
