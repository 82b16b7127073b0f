use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// How stat failures other than "file not found" are reported.
///
/// `Log` emits a debug-level trace for diagnostic IO errors (permission
/// denied and friends); `Silent` suppresses even that. Missing files are
/// never logged: they are an expected answer, captured in the snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnError {
    Silent,
    Log,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// Immutable snapshot of one `stat`/`lstat` call.
///
/// Carrying the errno inside the snapshot keeps traversal re-entrant: callers
/// never consult an out-of-band error channel, and a snapshot can be compared
/// or logged long after the call that produced it.
#[derive(Clone, Debug)]
pub struct FileStat {
    kind: FileKind,
    size: u64,
    mtime: Option<SystemTime>,
    mode: u32,
    dev: u64,
    ino: u64,
    error: Option<i32>,
}

impl FileStat {
    /// Stats `path`, following symlinks. Never fails: a missing or
    /// inaccessible file yields a snapshot with `exists() == false`.
    pub fn stat(path: &Path, on_error: OnError) -> Self {
        Self::from_result(std::fs::metadata(path), path, on_error)
    }

    /// Stats `path` without following symlinks.
    pub fn lstat(path: &Path, on_error: OnError) -> Self {
        Self::from_result(std::fs::symlink_metadata(path), path, on_error)
    }

    fn from_result(result: io::Result<Metadata>, path: &Path, on_error: OnError) -> Self {
        match result {
            Ok(meta) => Self::from_metadata(&meta),
            Err(err) => {
                if on_error == OnError::Log && err.kind() != io::ErrorKind::NotFound {
                    tracing::debug!(
                        target = "kiln.cache",
                        path = %path.display(),
                        error = %err,
                        "failed to stat file"
                    );
                }
                Self {
                    kind: FileKind::Other,
                    size: 0,
                    mtime: None,
                    mode: 0,
                    dev: 0,
                    ino: 0,
                    error: Some(err.raw_os_error().unwrap_or(0)),
                }
            }
        }
    }

    #[cfg(unix)]
    fn from_metadata(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            kind: Self::kind_of(meta),
            size: meta.len(),
            mtime: meta.modified().ok(),
            mode: meta.mode() & 0o7777,
            dev: meta.dev(),
            ino: meta.ino(),
            error: None,
        }
    }

    #[cfg(not(unix))]
    fn from_metadata(meta: &Metadata) -> Self {
        // No device/inode identity on this platform; inode comparisons
        // degrade to never-equal, so path-identity checks fall back to the
        // original path.
        Self {
            kind: Self::kind_of(meta),
            size: meta.len(),
            mtime: meta.modified().ok(),
            mode: 0,
            dev: 0,
            ino: 0,
            error: None,
        }
    }

    fn kind_of(meta: &Metadata) -> FileKind {
        let file_type = meta.file_type();
        if file_type.is_file() {
            FileKind::File
        } else if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::Other
        }
    }

    pub fn exists(&self) -> bool {
        self.error.is_none()
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.exists() && self.kind == FileKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.exists() && self.kind == FileKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.exists() && self.kind == FileKind::Symlink
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mtime(&self) -> Option<SystemTime> {
        self.mtime
    }

    /// Permission bits (`0o7777` mask) on unix; 0 elsewhere.
    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn device(&self) -> u64 {
        self.dev
    }

    pub fn inode(&self) -> u64 {
        self.ino
    }

    /// The raw OS errno when the stat failed; `None` for a successful stat.
    pub fn error_number(&self) -> Option<i32> {
        self.error
    }

    /// Whether both snapshots exist and refer to the same `(device, inode)`
    /// pair.
    pub fn same_inode_as(&self, other: &FileStat) -> bool {
        self.exists() && other.exists() && self.dev == other.dev && self.ino == other.ino
    }

    /// Reconstructs an `io::Error` from a failed snapshot; a missing file
    /// maps to `NotFound`.
    pub(crate) fn to_io_error(&self) -> io::Error {
        match self.error {
            Some(code) if code != 0 => io::Error::from_raw_os_error(code),
            _ => io::ErrorKind::NotFound.into(),
        }
    }
}
