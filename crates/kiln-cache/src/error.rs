use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors produced by the cache store and filesystem protocol layer.
///
/// A missing file is *not* an error: stat calls report it through
/// [`FileStat::exists`](crate::FileStat::exists) instead. Errors here are the
/// cases the core cannot recover from locally; the driver typically reacts by
/// bypassing the cache for the current compilation.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} exists and is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("walk error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The raw OS errno behind this error, when the failing syscall reported
    /// one.
    pub fn error_number(&self) -> Option<i32> {
        match self {
            Self::Io { source, .. } => source.raw_os_error(),
            Self::NotADirectory { .. } => None,
            Self::WalkDir(err) => err.io_error().and_then(io::Error::raw_os_error),
        }
    }
}
