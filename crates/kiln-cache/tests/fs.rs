use std::io::{Seek, Write};
use std::path::PathBuf;

use kiln_cache::fs::{
    create_dir_all, fallocate, read_file, read_link, real_path, traverse, unlink_safe, unlink_tmp,
    wipe_path, write_file, WriteMode,
};
use kiln_cache::CacheError;

#[test]
fn create_dir_all_creates_the_whole_chain_and_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("a").join("b").join("c");

    create_dir_all(&dir).unwrap();
    assert!(dir.is_dir());

    create_dir_all(&dir).unwrap();
    assert!(dir.is_dir());
}

#[test]
fn create_dir_all_succeeds_for_every_concurrent_caller() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("x").join("y").join("z");

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dir = dir.clone();
                scope.spawn(move || create_dir_all(&dir))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
    });

    assert!(dir.is_dir());
}

#[test]
fn create_dir_all_rejects_a_file_in_the_ancestor_chain() {
    let temp = tempfile::tempdir().unwrap();
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let err = create_dir_all(&blocker.join("child")).unwrap_err();
    assert!(
        matches!(err, CacheError::NotADirectory { .. }),
        "unexpected error: {err}"
    );

    let err = create_dir_all(&blocker).unwrap_err();
    assert!(
        matches!(err, CacheError::NotADirectory { .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn traverse_visits_directories_post_order() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("tree");
    std::fs::create_dir_all(root.join("sub")).unwrap();
    std::fs::write(root.join("top.txt"), b"top").unwrap();
    std::fs::write(root.join("sub").join("leaf.txt"), b"leaf").unwrap();

    let mut visits: Vec<(PathBuf, bool)> = Vec::new();
    traverse(&root, |path, is_dir| {
        visits.push((path.to_path_buf(), is_dir));
        Ok(())
    })
    .unwrap();

    let index_of = |needle: &PathBuf| {
        visits
            .iter()
            .position(|(path, _)| path == needle)
            .unwrap_or_else(|| panic!("{needle:?} not visited: {visits:?}"))
    };

    let leaf = root.join("sub").join("leaf.txt");
    let sub = root.join("sub");
    let top = root.join("top.txt");

    assert!(index_of(&leaf) < index_of(&sub), "children come before their directory");
    assert!(index_of(&sub) < index_of(&root), "subdirectory comes before the root");
    assert!(index_of(&top) < index_of(&root));

    assert_eq!(visits.last(), Some(&(root.clone(), true)));
    assert!(visits.iter().all(|(path, is_dir)| {
        *is_dir == (path == &root || path == &sub)
    }));
}

#[test]
fn traverse_visits_a_file_root_once() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("single.txt");
    std::fs::write(&file, b"x").unwrap();

    let mut visits = Vec::new();
    traverse(&file, |path, is_dir| {
        visits.push((path.to_path_buf(), is_dir));
        Ok(())
    })
    .unwrap();

    assert_eq!(visits, vec![(file, false)]);
}

#[test]
fn traverse_treats_a_missing_root_as_empty() {
    let temp = tempfile::tempdir().unwrap();
    let mut visits = 0;
    traverse(&temp.path().join("nope"), |_, _| {
        visits += 1;
        Ok(())
    })
    .unwrap();
    assert_eq!(visits, 0);
}

#[test]
fn read_file_returns_the_full_content_for_any_hint() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("blob.bin");
    let content: Vec<u8> = (0..4096_u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &content).unwrap();

    assert_eq!(read_file(&path, 0).unwrap(), content);
    // An undersized hint forces the geometric growth path.
    assert_eq!(read_file(&path, 7).unwrap(), content);
    assert_eq!(read_file(&path, content.len()).unwrap(), content);
}

#[test]
fn read_file_surfaces_missing_files_as_errors() {
    let temp = tempfile::tempdir().unwrap();
    let err = read_file(&temp.path().join("absent"), 0).unwrap_err();
    assert!(matches!(err, CacheError::Io { .. }), "unexpected error: {err}");
}

#[test]
fn write_file_truncates_or_appends_per_mode() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("out.txt");

    write_file(&path, b"first", WriteMode::Truncate).unwrap();
    write_file(&path, b"second", WriteMode::Truncate).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"second");

    write_file(&path, b"+more", WriteMode::Append).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"second+more");
}

#[cfg(unix)]
#[test]
fn read_link_returns_the_target_only_for_symlinks() {
    let temp = tempfile::tempdir().unwrap();
    let target = temp.path().join("target.txt");
    let link = temp.path().join("link");
    std::fs::write(&target, b"x").unwrap();
    std::os::unix::fs::symlink(&target, &link).unwrap();

    assert_eq!(read_link(&link), Some(target.clone()));
    assert_eq!(read_link(&target), None);
    assert_eq!(read_link(&temp.path().join("absent")), None);
}

#[cfg(unix)]
#[test]
fn real_path_resolves_symlinks() {
    let temp = tempfile::tempdir().unwrap();
    let target = temp.path().join("real.txt");
    let link = temp.path().join("alias");
    std::fs::write(&target, b"x").unwrap();
    std::os::unix::fs::symlink(&target, &link).unwrap();

    assert_eq!(real_path(&link), std::fs::canonicalize(&target).ok());
    assert_eq!(real_path(&temp.path().join("absent")), None);
}

#[test]
fn fallocate_extends_the_file_and_preserves_the_position() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("alloc.bin");
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)
        .unwrap();
    file.write_all(b"abc").unwrap();

    fallocate(&file, 100).unwrap();
    assert_eq!(file.stream_position().unwrap(), 3);
    assert!(std::fs::metadata(&path).unwrap().len() >= 100);

    // Already-large-enough files are left alone.
    fallocate(&file, 10).unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() >= 100);

    let content = std::fs::read(&path).unwrap();
    assert_eq!(&content[..3], b"abc");
}

#[test]
fn unlink_safe_leaves_neither_the_file_nor_the_temp_name() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("victim.o");
    std::fs::write(&path, b"x").unwrap();

    unlink_safe(&path).unwrap();

    assert!(!path.exists());
    let tmp_name = temp.path().join("victim.o.ccache.rm.tmp");
    assert!(!tmp_name.exists());
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn unlink_safe_of_a_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    assert!(unlink_safe(&temp.path().join("absent")).is_err());
}

#[test]
fn unlink_tmp_tolerates_missing_files() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("t.tmp");
    std::fs::write(&path, b"x").unwrap();

    unlink_tmp(&path).unwrap();
    assert!(!path.exists());

    unlink_tmp(&path).unwrap();
}

#[test]
fn wipe_path_removes_the_whole_subtree() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("wipe");
    std::fs::create_dir_all(root.join("a").join("b")).unwrap();
    std::fs::write(root.join("top"), b"x").unwrap();
    std::fs::write(root.join("a").join("b").join("deep"), b"y").unwrap();

    wipe_path(&root).unwrap();
    assert!(!root.exists());

    // Wiping again is a no-op.
    wipe_path(&root).unwrap();
}
