//! Materialization of cache objects: placing a file's content at a
//! destination by reflink clone, hard link, or byte copy.

use std::fs::File;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::util::open_unique_tmp_file;

/// Which installation methods [`install_file`] may attempt. Copying is always
/// available as the final fallback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializationPolicy {
    /// Attempt a reflink-style clone (copy-on-write shared extents) first.
    pub file_clone: bool,
    /// Attempt a hard link before falling back to a copy. Linked objects are
    /// made read-only at the destination.
    pub hard_link: bool,
}

/// How a cache object ended up at its destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallMethod {
    Cloned,
    HardLinked,
    Copied,
}

/// Installs `src` at `dst`, trying clone, then hard link, then copy, per
/// `policy`. A failed clone or link attempt is logged and falls through; only
/// the final copy surfaces its error.
///
/// With `via_tmp_file`, content lands under a unique temp name and is renamed
/// over `dst`, so concurrent readers of `dst` observe either the old bytes or
/// the new, never a torn file. A hard link is atomic by construction once the
/// source name exists and does not consult the flag.
pub fn install_file(
    policy: &MaterializationPolicy,
    src: &Path,
    dst: &Path,
    via_tmp_file: bool,
) -> Result<InstallMethod> {
    if policy.file_clone {
        tracing::debug!(
            target = "kiln.cache",
            src = %src.display(),
            dst = %dst.display(),
            "cloning file"
        );
        match clone_file(src, dst, via_tmp_file) {
            Ok(()) => return Ok(InstallMethod::Cloned),
            Err(err) => {
                tracing::debug!(target = "kiln.cache", error = %err, "failed to clone");
            }
        }
    }

    if policy.hard_link {
        let _ = std::fs::remove_file(dst);
        tracing::debug!(
            target = "kiln.cache",
            src = %src.display(),
            dst = %dst.display(),
            "hard linking file"
        );
        match std::fs::hard_link(src, dst) {
            Ok(()) => {
                // The destination now shares an inode with the cache object;
                // a build that wrote through it would corrupt every future
                // hit. Strip the write bits.
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;

                    if let Err(err) =
                        std::fs::set_permissions(dst, std::fs::Permissions::from_mode(0o444))
                    {
                        tracing::debug!(
                            target = "kiln.cache",
                            path = %dst.display(),
                            error = %err,
                            "failed to chmod hard-linked file"
                        );
                    }
                }
                return Ok(InstallMethod::HardLinked);
            }
            Err(err) => {
                tracing::debug!(target = "kiln.cache", error = %err, "failed to hard link");
            }
        }
    }

    tracing::debug!(
        target = "kiln.cache",
        src = %src.display(),
        dst = %dst.display(),
        "copying file"
    );
    copy_file(src, dst, via_tmp_file).map_err(|err| CacheError::io(dst, err))?;
    Ok(InstallMethod::Copied)
}

/// Reflink-clones `src` to `dst` so both names share copy-on-write extents.
///
/// Only supported on Linux filesystems that implement the clone ioctl; other
/// platforms report `Unsupported` so callers fall through to the next
/// installation method. The clone itself is assumed atomic on filesystems
/// that support it; `via_tmp_file` additionally routes it through a temp name
/// plus rename.
pub fn clone_file(src: &Path, dst: &Path, via_tmp_file: bool) -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        use std::os::unix::io::AsRawFd;

        let src_file = File::open(src)?;
        let (target_path, dst_file) = if via_tmp_file {
            open_unique_tmp_file(dst)?
        } else {
            (dst.to_path_buf(), File::create(dst)?)
        };

        let ret = unsafe {
            libc::ioctl(
                dst_file.as_raw_fd(),
                libc::FICLONE as libc::c_ulong,
                src_file.as_raw_fd(),
            )
        };
        if ret != 0 {
            let err = io::Error::last_os_error();
            drop(dst_file);
            if via_tmp_file {
                let _ = std::fs::remove_file(&target_path);
            }
            return Err(err);
        }
        drop(dst_file);

        if via_tmp_file {
            std::fs::rename(&target_path, dst)?;
        }
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = (src, dst, via_tmp_file);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "file cloning is not supported on this platform",
        ))
    }
}

/// Copies the bytes of `src` to `dst`, the universal fallback. With
/// `via_tmp_file`, the copy lands under a unique temp name and is renamed
/// over `dst` once complete.
pub fn copy_file(src: &Path, dst: &Path, via_tmp_file: bool) -> io::Result<()> {
    let mut src_file = File::open(src)?;
    let (target_path, mut dst_file) = if via_tmp_file {
        open_unique_tmp_file(dst)?
    } else {
        (dst.to_path_buf(), File::create(dst)?)
    };

    if let Err(err) = io::copy(&mut src_file, &mut dst_file) {
        drop(dst_file);
        let _ = std::fs::remove_file(&target_path);
        return Err(err);
    }
    drop(dst_file);

    if via_tmp_file {
        if let Err(err) = std::fs::rename(&target_path, dst) {
            let _ = std::fs::remove_file(&target_path);
            return Err(err);
        }
    }
    Ok(())
}
