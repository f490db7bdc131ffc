use plugin_fs::{Error, copy_dir, move_dir, remove_dir};
use std::fs;
use tempfile::TempDir;

fn make_source(temp: &TempDir) -> std::path::PathBuf {
    let src = temp.path().join("src-plugin");
    fs::create_dir_all(src.join("schema")).unwrap();
    fs::create_dir_all(src.join("node_modules/dep")).unwrap();
    fs::create_dir_all(src.join(".git")).unwrap();
    fs::write(src.join("package.json"), r#"{"name": "adapt-test"}"#).unwrap();
    fs::write(src.join("schema/course.schema.json"), "{}").unwrap();
    fs::write(src.join("node_modules/dep/index.js"), "").unwrap();
    fs::write(src.join(".git/HEAD"), "ref").unwrap();
    src
}

#[test]
fn test_copy_dir_copies_tree() {
    let temp = TempDir::new().unwrap();
    let src = make_source(&temp);
    let dest = temp.path().join("cache/adapt-test");

    fs::create_dir_all(dest.parent().unwrap()).unwrap();
    let copied = copy_dir(&src, &dest).unwrap();

    assert_eq!(copied, 2);
    assert!(dest.join("package.json").is_file());
    assert!(dest.join("schema/course.schema.json").is_file());
}

#[test]
fn test_copy_dir_skips_vcs_and_dependencies() {
    let temp = TempDir::new().unwrap();
    let src = make_source(&temp);
    let dest = temp.path().join("adapt-test");

    copy_dir(&src, &dest).unwrap();

    assert!(!dest.join("node_modules").exists());
    assert!(!dest.join(".git").exists());
}

#[test]
fn test_copy_dir_replaces_previous_copy() {
    let temp = TempDir::new().unwrap();
    let src = make_source(&temp);
    let dest = temp.path().join("adapt-test");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("stale.txt"), "old").unwrap();

    copy_dir(&src, &dest).unwrap();

    assert!(!dest.join("stale.txt").exists());
    assert!(dest.join("package.json").is_file());
}

#[test]
fn test_copy_dir_missing_source() {
    let temp = TempDir::new().unwrap();
    let err = copy_dir(&temp.path().join("nope"), &temp.path().join("dest")).unwrap_err();
    assert!(matches!(err, Error::SourceNotFound { .. }));
}

#[test]
fn test_remove_dir_missing_is_ok() {
    let temp = TempDir::new().unwrap();
    remove_dir(&temp.path().join("never-existed")).unwrap();
}

#[test]
fn test_move_dir_creates_parent() {
    let temp = TempDir::new().unwrap();
    let src = make_source(&temp);
    let dest = temp.path().join("cache/.adapt-test.previous");

    move_dir(&src, &dest).unwrap();

    assert!(!src.exists());
    assert!(dest.join("package.json").is_file());
}
