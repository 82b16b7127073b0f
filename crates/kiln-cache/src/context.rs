use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::install::MaterializationPolicy;
use crate::relpath::{actual_cwd, apparent_cwd};

/// Configuration consumed by the cache core.
///
/// The configuration file loader lives upstream and deserializes into this
/// struct; the core only reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory of the cache.
    pub cache_dir: PathBuf,

    /// Number of single-character fan-out directories between the root and a
    /// cache object.
    pub cache_dir_levels: u32,

    /// When non-empty, absolute source paths under this prefix are rewritten
    /// relative to the working directory before fingerprinting.
    pub base_dir: String,

    /// Which installation methods to attempt when materializing objects.
    #[serde(flatten)]
    pub materialization: MaterializationPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::new(),
            cache_dir_levels: 2,
            base_dir: String::new(),
            materialization: MaterializationPolicy::default(),
        }
    }
}

/// Per-invocation state: the configuration plus the working-directory pair,
/// captured once at startup and passed explicitly everywhere it is needed.
#[derive(Clone, Debug)]
pub struct Context {
    pub config: CacheConfig,

    /// `getcwd()`, normalized to forward slashes.
    pub actual_cwd: String,

    /// `$PWD` when it refers to the same inode as `actual_cwd`, else
    /// `actual_cwd`. Preserves the symlink-aware spelling build systems
    /// export.
    pub apparent_cwd: String,
}

impl Context {
    pub fn new(config: CacheConfig) -> Self {
        let actual_cwd = actual_cwd().unwrap_or_default();
        let apparent_cwd = apparent_cwd(&actual_cwd);
        Self {
            config,
            actual_cwd,
            apparent_cwd,
        }
    }
}
