use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Opens a fresh file named `<dest>.<pid>.<counter>` with `create_new`,
/// retrying on collision, so concurrent installers never share a temp name.
/// The caller renames it over `dest` once the content is complete.
pub(crate) fn open_unique_tmp_file(dest: &Path) -> io::Result<(PathBuf, File)> {
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = dest.as_os_str().to_os_string();
        tmp_name.push(format!(".{pid}.{counter}"));
        let tmp_path = PathBuf::from(tmp_name);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}
