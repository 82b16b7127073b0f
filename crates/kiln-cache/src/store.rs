//! On-disk layout of the content-addressed store.
//!
//! A cache object for fingerprint `abcdef...` with two fan-out levels lives
//! at `<root>/a/b/cdef...<suffix>`. The single-character fan-out directories
//! keep per-directory entry counts bounded as the cache grows.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs::traverse;
use crate::stat::{FileStat, OnError};

/// Names reserved at the cache root and skipped by enumeration: the
/// cachedir.tag sentinel, the statistics counters, and NFS open-file
/// placeholders.
const CACHEDIR_TAG: &str = "CACHEDIR.TAG";
const STATS_FILE: &str = "stats";
const NFS_PLACEHOLDER_PREFIX: &str = ".nfs";

/// Computes the path of the cache object for `name` (a lowercase hex
/// fingerprint) under `root`, inserting `levels` single-character fan-out
/// directories.
///
/// # Panics
///
/// Panics if `levels` is outside `1..=8` or not shorter than `name`; both
/// are programming bugs in the caller, not runtime conditions.
pub fn cache_entry_path(root: &Path, levels: u32, name: &str, suffix: &str) -> PathBuf {
    assert!((1..=8).contains(&levels), "cache levels out of range: {levels}");
    assert!(
        (levels as usize) < name.len(),
        "fingerprint too short for {levels} fan-out levels: {name:?}"
    );
    debug_assert!(name.is_ascii());

    let levels = levels as usize;
    let mut path = root.to_path_buf();
    for level in 0..levels {
        path.push(&name[level..level + 1]);
    }

    let mut file_name = String::with_capacity(name.len() - levels + suffix.len());
    file_name.push_str(&name[levels..]);
    file_name.push_str(suffix);
    path.push(file_name);

    path
}

/// A file enumerated from the cache.
///
/// Enumeration and deletion race freely across processes, so the file may be
/// gone by the time the holder looks at it; [`CacheFile::lstat`] reports that
/// through the snapshot rather than failing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lstat(&self) -> FileStat {
        FileStat::lstat(&self.path, OnError::Log)
    }
}

/// Visits the 16 level-1 subdirectories `0`..`f` of `cache_dir` in order.
///
/// `progress_receiver` sees monotone values in `[0, 1]`; finer progress
/// reported by a subdir visit is scaled into that subdir's 1/16 slot.
pub fn for_each_level_1_subdir<V, P>(
    cache_dir: &Path,
    mut subdir_visitor: V,
    mut progress_receiver: P,
) -> Result<()>
where
    V: FnMut(&Path, &mut dyn FnMut(f64)) -> Result<()>,
    P: FnMut(f64),
{
    for digit in 0..=0xf_u32 {
        let progress = f64::from(digit) / 16.0;
        progress_receiver(progress);

        let subdir_path = cache_dir.join(format!("{digit:x}"));
        subdir_visitor(&subdir_path, &mut |inner_progress| {
            progress_receiver(progress + inner_progress / 16.0)
        })?;
    }
    progress_receiver(1.0);
    Ok(())
}

/// Appends every regular file under the level-1 directory `dir` to `files`,
/// skipping the reserved `CACHEDIR.TAG`/`stats` names and `.nfs*`
/// placeholders. Files deleted while the walk runs are silently ignored.
///
/// Progress is reported proportional to completed level-2 subdirectories (a
/// level-1 directory has at most 16 of them).
pub fn get_level_1_files<P>(dir: &Path, mut progress_receiver: P, files: &mut Vec<CacheFile>) -> Result<()>
where
    P: FnMut(f64),
{
    if !FileStat::stat(dir, OnError::Silent).exists() {
        return Ok(());
    }

    let mut level_2_directories = 0_u32;

    traverse(dir, |path, is_dir| {
        let name = path.file_name().and_then(|name| name.to_str()).unwrap_or("");
        if name == CACHEDIR_TAG || name == STATS_FILE || name.starts_with(NFS_PLACEHOLDER_PREFIX) {
            return Ok(());
        }

        if !is_dir {
            files.push(CacheFile::new(path.to_path_buf()));
        } else if path != dir && path.parent() == Some(dir) {
            level_2_directories += 1;
            progress_receiver(f64::from(level_2_directories) / 16.0);
        }
        Ok(())
    })?;

    progress_receiver(1.0);
    Ok(())
}
