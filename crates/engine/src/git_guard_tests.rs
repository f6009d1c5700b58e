// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn make_git_root(dir: &TempDir, name: &str) -> PathBuf {
    let root = dir.path().join(name);
    std::fs::create_dir_all(root.join(".git")).unwrap();
    std::fs::write(root.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
    root
}

#[test]
fn moves_and_restores_git_directories() {
    let dir = TempDir::new().unwrap();
    let root = make_git_root(&dir, "site");

    let guard = GitDirGuard::move_aside(&[root.clone()]).unwrap();
    assert_eq!(guard.len(), 1);
    assert!(!root.join(".git").exists());

    guard.restore().unwrap();
    assert!(root.join(".git").exists());
    assert_eq!(
        std::fs::read_to_string(root.join(".git/HEAD")).unwrap(),
        "ref: refs/heads/main"
    );
}

#[test]
fn roots_without_git_are_ignored() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("plain");
    std::fs::create_dir_all(&root).unwrap();

    let guard = GitDirGuard::move_aside(&[root]).unwrap();
    assert!(guard.is_empty());
    guard.restore().unwrap();
}

#[test]
fn duplicate_roots_are_moved_once() {
    let dir = TempDir::new().unwrap();
    let root = make_git_root(&dir, "site");

    let guard = GitDirGuard::move_aside(&[root.clone(), root.clone()]).unwrap();
    assert_eq!(guard.len(), 1);
    guard.restore().unwrap();
    assert!(root.join(".git").exists());
}

#[test]
fn drop_restores_when_restore_was_never_called() {
    let dir = TempDir::new().unwrap();
    let root = make_git_root(&dir, "site");

    {
        let _guard = GitDirGuard::move_aside(&[root.clone()]).unwrap();
        assert!(!root.join(".git").exists());
    }
    assert!(root.join(".git").exists());
}

#[test]
fn restore_failure_reports_both_paths() {
    let dir = TempDir::new().unwrap();
    let root = make_git_root(&dir, "site");

    let guard = GitDirGuard::move_aside(&[root.clone()]).unwrap();
    // Occupy the original location so the rename back fails.
    std::fs::create_dir_all(root.join(".git/blocker")).unwrap();

    let err = guard.restore().unwrap_err();
    match err {
        EngineError::GitRestoreFailed { original, moved, .. } => {
            assert_eq!(original, root.join(".git"));
            assert!(moved.starts_with(&root));
        }
        other => panic!("expected GitRestoreFailed, got {other}"),
    }
}
