//! Filesystem primitives the cache store is built on.
//!
//! The cache root is shared by concurrent processes with no coordinator, so
//! each primitive here tolerates the races that actually occur in practice:
//! directories created by someone else between check and create, entries
//! vanishing between readdir and stat, and NFS servers leaving `.nfsXXXX`
//! stubs behind deletes of still-open files.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{CacheError, Result};
use crate::stat::{FileStat, OnError};

/// Suffix used by [`unlink_safe`] for the rename-before-unlink dance.
pub const UNLINK_TMP_SUFFIX: &str = ".ccache.rm.tmp";

/// Whether `err` means the file disappeared underneath us (`ENOENT`, or
/// `ESTALE` when an NFS server dropped the handle).
pub(crate) fn is_missing(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::NotFound {
        return true;
    }
    #[cfg(unix)]
    if err.raw_os_error() == Some(libc::ESTALE) {
        return true;
    }
    false
}

fn is_vanished_walkdir(err: &walkdir::Error) -> bool {
    err.io_error().is_some_and(is_missing)
}

/// Creates `dir` and every missing ancestor.
///
/// Idempotent and race-tolerant: many processes create the same chain
/// concurrently when the cache root does not exist yet, and a directory that
/// appeared between our check and our `mkdir` satisfies the post-condition
/// just as well. An ancestor that exists as a non-directory is
/// [`CacheError::NotADirectory`].
pub fn create_dir_all(dir: &Path) -> Result<()> {
    match std::fs::metadata(dir) {
        Ok(meta) => {
            return if meta.is_dir() {
                Ok(())
            } else {
                Err(CacheError::NotADirectory {
                    path: dir.to_path_buf(),
                })
            };
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(CacheError::io(dir, err)),
    }

    if let Some(parent) = dir.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    match std::fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            // Lost the race to another process. The winner may also have
            // created a non-directory here; re-check rather than assume.
            if std::fs::metadata(dir).map(|meta| meta.is_dir()).unwrap_or(false) {
                Ok(())
            } else {
                Err(CacheError::NotADirectory {
                    path: dir.to_path_buf(),
                })
            }
        }
        Err(err) => Err(CacheError::io(dir, err)),
    }
}

/// Recursively walks `root`, calling `visitor(path, is_dir)` for every entry.
///
/// Directories are visited post-order (children first, then the directory
/// itself); files and symlinks within one directory come in arbitrary order
/// with `is_dir == false`. Entries that vanish mid-walk are dropped
/// silently, and a missing `root` is treated as empty. A `root` that exists
/// as a file is visited once with `is_dir == false`.
pub fn traverse<V>(root: &Path, mut visitor: V) -> Result<()>
where
    V: FnMut(&Path, bool) -> Result<()>,
{
    for entry in WalkDir::new(root).follow_links(false).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if is_vanished_walkdir(&err) => continue,
            Err(err) => return Err(err.into()),
        };
        visitor(entry.path(), entry.file_type().is_dir())?;
    }
    Ok(())
}

/// Reads the entire file at `path` into memory.
///
/// `size_hint` sizes the initial buffer (0 means "stat the file first"); the
/// buffer grows geometrically when the hint turns out short, so a file that
/// grew since the stat still reads completely. Interrupted reads restart.
pub fn read_file(path: &Path, size_hint: usize) -> Result<Vec<u8>> {
    let mut size_hint = size_hint;
    if size_hint == 0 {
        let stat = FileStat::stat(path, OnError::Log);
        if !stat.exists() {
            return Err(CacheError::io(path, stat.to_io_error()));
        }
        size_hint = stat.size() as usize;
    }

    // +1 so a correct hint still detects EOF without an extra resize.
    let size_hint = if size_hint < 1024 { 1024 } else { size_hint + 1 };

    let mut file = File::open(path).map_err(|err| CacheError::io(path, err))?;
    let mut buf = vec![0_u8; size_hint];
    let mut pos = 0;

    loop {
        if pos == buf.len() {
            buf.resize(2 * buf.len(), 0);
        }
        match file.read(&mut buf[pos..]) {
            Ok(0) => break,
            Ok(n) => pos += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(CacheError::io(path, err)),
        }
    }

    buf.truncate(pos);
    Ok(buf)
}

/// How [`write_file`] opens an existing destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    Truncate,
    Append,
}

/// Creates or opens `path` per `mode` and writes `data` fully.
///
/// This does not provide atomic replacement by itself; callers that need it
/// layer a rename-from-temp on top (see [`crate::install_file`]).
pub fn write_file(path: &Path, data: &[u8], mode: WriteMode) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true);
    match mode {
        WriteMode::Truncate => options.truncate(true),
        WriteMode::Append => options.append(true),
    };

    let mut file = options.open(path).map_err(|err| CacheError::io(path, err))?;
    file.write_all(data).map_err(|err| CacheError::io(path, err))
}

/// Returns the target of the symlink at `path`, or `None` when `path` is not
/// a readable symlink.
pub fn read_link(path: &Path) -> Option<PathBuf> {
    std::fs::read_link(path).ok()
}

/// Resolves all symlinks in `path` into a canonical absolute path, or `None`
/// on failure. Callers pick their own fallback (empty vs. the original
/// path).
pub fn real_path(path: &Path) -> Option<PathBuf> {
    let resolved = std::fs::canonicalize(path).ok()?;

    #[cfg(windows)]
    {
        // Canonicalization yields verbatim (`\\?\C:\...`) paths; strip the
        // prefix so textual comparisons downstream see plain drive paths.
        if let Some(stripped) = resolved.to_str().and_then(|s| s.strip_prefix(r"\\?\")) {
            return Some(PathBuf::from(stripped));
        }
    }

    Some(resolved)
}

/// Ensures the file is allocated out to at least `new_size` bytes, using
/// filesystem preallocation where the platform offers it and zero-fill
/// otherwise. The file position is preserved across the call.
pub fn fallocate(file: &File, new_size: u64) -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        use std::os::unix::io::AsRawFd;

        let ret = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, new_size as libc::off_t) };
        if ret == 0 {
            Ok(())
        } else {
            // posix_fallocate reports the errno in its return value.
            Err(io::Error::from_raw_os_error(ret))
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        use std::io::{Seek, SeekFrom};

        let mut file = file;
        let saved_pos = file.stream_position()?;
        let result = (|| {
            let old_size = file.seek(SeekFrom::End(0))?;
            if old_size >= new_size {
                return Ok(());
            }
            let zeros = [0_u8; 8192];
            let mut remaining = new_size - old_size;
            while remaining > 0 {
                let chunk = remaining.min(zeros.len() as u64) as usize;
                file.write_all(&zeros[..chunk])?;
                remaining -= chunk as u64;
            }
            Ok(())
        })();
        let restored = file.seek(SeekFrom::Start(saved_pos));
        result.and(restored.map(|_| ()))
    }
}

/// Deletes `path` without racing NFS readers: the file is renamed to
/// `path + ".ccache.rm.tmp"` first, then the temp name is unlinked. A direct
/// unlink of a file another process still holds open is not atomic on NFS
/// (the server parks it in a `.nfsXXXX` stub); after the rename, readers
/// that already opened `path` keep a stable handle and never observe a
/// half-deleted name.
pub fn unlink_safe(path: &Path) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(UNLINK_TMP_SUFFIX);
    let tmp_path = PathBuf::from(tmp_name);

    std::fs::rename(path, &tmp_path).map_err(|err| CacheError::io(path, err))?;
    match std::fs::remove_file(&tmp_path) {
        Ok(()) => {}
        // Fine if someone else unlinked the temp name in a race.
        Err(err) if is_missing(&err) => {}
        Err(err) => return Err(CacheError::io(&tmp_path, err)),
    }

    tracing::debug!(
        target = "kiln.cache",
        path = %path.display(),
        via = %tmp_path.display(),
        "unlinked file"
    );
    Ok(())
}

/// Deletes a file known not to be shared with other processes. `ENOENT` and
/// `ESTALE` count as success.
pub fn unlink_tmp(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if is_missing(&err) => {}
        Err(err) => return Err(CacheError::io(path, err)),
    }

    tracing::debug!(target = "kiln.cache", path = %path.display(), "unlinked file");
    Ok(())
}

/// Recursively deletes the tree rooted at `root`. Entries deleted by a
/// concurrent process are skipped; a missing root is a no-op.
pub fn wipe_path(root: &Path) -> Result<()> {
    if !FileStat::lstat(root, OnError::Silent).exists() {
        return Ok(());
    }
    traverse(root, |path, is_dir| {
        let removed = if is_dir {
            std::fs::remove_dir(path)
        } else {
            std::fs::remove_file(path)
        };
        match removed {
            Ok(()) => Ok(()),
            Err(err) if is_missing(&err) => Ok(()),
            Err(err) => Err(CacheError::io(path, err)),
        }
    })
}

/// Writes buffered compiler diagnostics to stderr, stripping ANSI CSI
/// sequences first when the destination was detected as non-color.
pub fn send_to_stderr(text: &str, strip_colors: bool) -> io::Result<()> {
    let stripped;
    let text = if strip_colors {
        stripped = kiln_core::strip_ansi_csi_seqs(text);
        stripped.as_str()
    } else {
        text
    };

    io::stderr().lock().write_all(text.as_bytes())
}
