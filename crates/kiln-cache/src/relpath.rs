//! Rewriting of absolute source paths relative to the working directory.
//!
//! Build systems often expose a symlink-preserving `$PWD` while `getcwd()`
//! returns the fully resolved form; either one can be the root the compiler
//! invocation "meant". Both candidates are tried and the winner is verified
//! by inode identity, so the rewritten path provably names the same file.

use std::path::Path;

use kiln_core::path::{dir_name, get_relative_path, normalize_absolute_path};

use crate::context::Context;
use crate::stat::{FileStat, OnError};

/// Returns the current working directory as reported by `getcwd()`,
/// normalized to forward slashes. `None` when the cwd is gone or not
/// representable as UTF-8.
pub fn actual_cwd() -> Option<String> {
    let cwd = std::env::current_dir().ok()?;
    let cwd = cwd.to_str()?.to_string();
    if cfg!(windows) {
        return Some(cwd.replace('\\', "/"));
    }
    Some(cwd)
}

/// Returns the "apparent" working directory: `$PWD` when it refers to the
/// same inode as `actual_cwd` (preferring its normalized form when that
/// still hits the same inode), otherwise `actual_cwd` itself.
pub fn apparent_cwd(actual_cwd: &str) -> String {
    if cfg!(windows) {
        return actual_cwd.to_string();
    }

    let Some(pwd) = std::env::var_os("PWD") else {
        return actual_cwd.to_string();
    };
    let Some(pwd) = pwd.to_str().map(str::to_owned) else {
        return actual_cwd.to_string();
    };

    let pwd_stat = FileStat::stat(Path::new(&pwd), OnError::Silent);
    let cwd_stat = FileStat::stat(Path::new(actual_cwd), OnError::Silent);
    if !pwd_stat.same_inode_as(&cwd_stat) {
        return actual_cwd.to_string();
    }

    let normalized_pwd = normalize_absolute_path(&pwd);
    if normalized_pwd == pwd
        || FileStat::stat(Path::new(&normalized_pwd), OnError::Silent).same_inode_as(&pwd_stat)
    {
        normalized_pwd
    } else {
        pwd
    }
}

/// Rewrites `path` relative to the working directory when it lies under the
/// configured base directory, so compilations run from different checkouts of
/// the same tree fingerprint identically.
///
/// The candidate relative paths (one against the actual cwd, one against the
/// apparent cwd, shortest first) are verified by comparing inodes with the
/// nearest existing ancestor of `path`; if neither matches, the original
/// path is returned unchanged.
pub fn make_relative_path(ctx: &Context, path: &str) -> String {
    if ctx.config.base_dir.is_empty() || !path.starts_with(ctx.config.base_dir.as_str()) {
        return path.to_string();
    }

    let rewritten;
    let path = if cfg!(windows) {
        match rewrite_windows_drive(path) {
            Some(translated) => {
                rewritten = translated;
                rewritten.as_str()
            }
            None => path,
        }
    } else {
        path
    };

    // The relative-path computation below only works for paths that exist.
    // Walk up to the nearest existing ancestor and re-append the stripped
    // suffix afterwards.
    let original_path = path;
    let mut path = path;
    let mut path_stat = FileStat::stat(Path::new(path), OnError::Silent);
    while !path_stat.exists() {
        path = dir_name(path);
        path_stat = FileStat::stat(Path::new(path), OnError::Silent);
    }
    let path_suffix = &original_path[path.len()..];

    let normalized_path = normalize_absolute_path(path);
    let mut relpath_candidates = [
        get_relative_path(&ctx.actual_cwd, &normalized_path),
        get_relative_path(&ctx.apparent_cwd, &normalized_path),
    ];
    // Try the best (= shortest) match first.
    if relpath_candidates[0].len() > relpath_candidates[1].len() {
        relpath_candidates.swap(0, 1);
    }

    for relpath in &relpath_candidates {
        if FileStat::stat(Path::new(relpath), OnError::Silent).same_inode_as(&path_stat) {
            return format!("{relpath}{path_suffix}");
        }
    }

    // No candidate resolves to the same file; leave the path alone.
    original_path.to_string()
}

/// Translates slash-escaped Windows drive forms (`/c/path`, `/c:/path`) into
/// `c:/path`.
fn rewrite_windows_drive(path: &str) -> Option<String> {
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' {
        if bytes[1].is_ascii_alphabetic() && bytes[2] == b'/' {
            return Some(format!("{}:/{}", bytes[1] as char, &path[3..]));
        }
        if bytes[2] == b':' {
            return Some(path[1..].to_string());
        }
    }
    None
}
