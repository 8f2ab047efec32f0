//! Unit tests for staging path validation.

use quest_passer::launcher::path_safety::resolve_within;
use quest_passer::AppError;

#[test]
fn nested_relative_path_resolves_under_root() {
    let root = tempfile::tempdir().expect("tempdir");
    let resolved = resolve_within(root.path(), "win64/game.exe").expect("valid path");

    let canonical = root.path().canonicalize().expect("canonical");
    assert_eq!(resolved, canonical.join("win64").join("game.exe"));
}

#[test]
fn backslashes_are_separators() {
    let root = tempfile::tempdir().expect("tempdir");
    let resolved = resolve_within(root.path(), "win64\\game.exe").expect("valid path");

    let canonical = root.path().canonicalize().expect("canonical");
    assert_eq!(resolved, canonical.join("win64").join("game.exe"));
}

#[test]
fn inner_parent_segments_are_allowed() {
    let root = tempfile::tempdir().expect("tempdir");
    let resolved = resolve_within(root.path(), "a/../b.exe").expect("valid path");

    let canonical = root.path().canonicalize().expect("canonical");
    assert_eq!(resolved, canonical.join("b.exe"));
}

#[test]
fn escaping_parent_segments_are_rejected() {
    let root = tempfile::tempdir().expect("tempdir");
    for candidate in ["../evil.exe", "a/../../evil.exe", "..\\evil.exe"] {
        let result = resolve_within(root.path(), candidate);
        assert!(
            matches!(result, Err(AppError::PathViolation(_))),
            "{candidate} should be rejected"
        );
    }
}

#[test]
fn absolute_paths_are_rejected() {
    let root = tempfile::tempdir().expect("tempdir");
    let result = resolve_within(root.path(), "/etc/passwd");
    assert!(matches!(result, Err(AppError::PathViolation(_))));
}

#[test]
fn empty_paths_are_rejected() {
    let root = tempfile::tempdir().expect("tempdir");
    for candidate in ["", ".", "a/.."] {
        let result = resolve_within(root.path(), candidate);
        assert!(
            matches!(result, Err(AppError::PathViolation(_))),
            "{candidate:?} should be rejected"
        );
    }
}

#[test]
fn missing_root_is_rejected() {
    let root = tempfile::tempdir().expect("tempdir");
    let missing = root.path().join("does-not-exist");
    let result = resolve_within(&missing, "game.exe");
    assert!(matches!(result, Err(AppError::PathViolation(_))));
}
