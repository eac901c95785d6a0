use std::fs;
use std::path::Path;
use std::process::Command;

use git_history::git::{GitCli, VcsQuery};
use git_history::infrastructure::HistoryError;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.name=Test User", "-c", "user.email=test@example.com"])
        .args(["-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(repo)
        .output()
        .unwrap();
    assert!(
        status.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&status.stderr)
    );
}

fn init_repo(repo: &Path) {
    git(repo, &["init", "-q"]);
    git(repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    fs::write(repo.join("README.md"), "hello\n").unwrap();
    git(repo, &["add", "README.md"]);
    git(repo, &["commit", "-q", "-m", "Initial commit"]);

    fs::create_dir_all(repo.join("src")).unwrap();
    fs::write(repo.join("src/lib.rs"), "pub fn x() {}\n").unwrap();
    fs::write(repo.join("README.md"), "hello world\n").unwrap();
    git(repo, &["add", "."]);
    git(repo, &["commit", "-q", "-m", "Fix readme, add lib"]);

    git(repo, &["branch", "feature"]);
}

#[tokio::test]
async fn test_git_cli_against_real_repository() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    let cli = GitCli::default();

    let branches = cli.fetch_branches(dir.path()).await.unwrap();
    assert_eq!(branches.all, vec!["feature", "main"]);
    assert_eq!(branches.current.as_deref(), Some("main"));
    assert_eq!(branches.current_index(), Some(1));

    let log = cli.fetch_log(dir.path(), Some("main"), None).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].message, "Fix readme, add lib");
    assert_eq!(log[0].author_name, "Test User");
    assert_eq!(log[0].hash.len(), 40);
    assert!(log[0].date.contains('T'));

    let limited = cli.fetch_log(dir.path(), None, Some(1)).await.unwrap();
    assert_eq!(limited.len(), 1);

    let mut files = cli.fetch_changed_files(dir.path(), &log[0].hash).await.unwrap();
    files.sort();
    assert_eq!(files, vec!["README.md", "src/lib.rs"]);
}

#[tokio::test]
async fn test_git_cli_failures_map_to_fetch_errors() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    let cli = GitCli::default();

    let err = cli
        .fetch_changed_files(dir.path(), "0000000000000000000000000000000000000000")
        .await
        .unwrap_err();
    assert!(matches!(err, HistoryError::Fetch { .. }));
    assert_eq!(err.user_message(), "Failed to get files.");

    let err = cli
        .fetch_log(dir.path(), Some("no-such-branch"), None)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Failed to retrieve Git logs.");
}

#[tokio::test]
async fn test_missing_binary_is_a_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let cli = GitCli::new("/nonexistent/git-binary");
    let err = cli.fetch_branches(dir.path()).await.unwrap_err();
    assert_eq!(err.user_message(), "Failed to retrieve Git branches.");
}
