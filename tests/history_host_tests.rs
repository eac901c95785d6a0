use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use git_history::git::{BranchList, Commit, VcsQuery};
use git_history::history::{
    channel, restore, AppendSchedule, DisplayMessage, DisplaySnapshot, DisplayState, FetchJob,
    HistoryHost, HostMessage, HostOptions, ListRenderer,
};
use git_history::infrastructure::{HistoryError, Result};
use git_history::workspace::{HostEnvironment, PickItem};
use tempfile::TempDir;

/// 按分支返回固定数据的查询实现
#[derive(Default)]
struct ScriptedVcs {
    branches: Vec<String>,
    current: Option<String>,
    logs: HashMap<String, Vec<Commit>>,
    files: HashMap<String, Vec<String>>,
    fail_log: bool,
    fail_branches: bool,
    fail_files: bool,
    panic_on_branch: Option<String>,
    log_calls: Mutex<Vec<(Option<String>, Option<usize>)>>,
}

#[async_trait]
impl VcsQuery for ScriptedVcs {
    async fn fetch_log(
        &self,
        _repo_path: &Path,
        branch: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Commit>> {
        self.log_calls
            .lock()
            .unwrap()
            .push((branch.map(str::to_string), limit));
        if branch.is_some() && branch == self.panic_on_branch.as_deref() {
            panic!("log backend crashed");
        }
        if self.fail_log {
            return Err(HistoryError::fetch("retrieve Git logs", "exit status 128"));
        }
        let key = branch.or(self.current.as_deref()).unwrap_or_default();
        let mut commits = self.logs.get(key).cloned().unwrap_or_default();
        if let Some(limit) = limit {
            commits.truncate(limit);
        }
        Ok(commits)
    }

    async fn fetch_branches(&self, _repo_path: &Path) -> Result<BranchList> {
        if self.fail_branches {
            return Err(HistoryError::fetch("retrieve Git branches", "not a git repository"));
        }
        Ok(BranchList {
            current: self.current.clone(),
            all: self.branches.clone(),
        })
    }

    async fn fetch_changed_files(&self, _repo_path: &Path, commit_id: &str) -> Result<Vec<String>> {
        if self.fail_files {
            return Err(HistoryError::fetch("get files", "bad object"));
        }
        Ok(self.files.get(commit_id).cloned().unwrap_or_default())
    }
}

/// 记录错误提示并返回预设选择的宿主环境
struct ScriptedEnv {
    folders: Vec<PathBuf>,
    choice: Option<usize>,
    picks: Mutex<Vec<(String, usize)>>,
    errors: Mutex<Vec<String>>,
}

impl ScriptedEnv {
    fn new(folders: Vec<PathBuf>, choice: Option<usize>) -> Self {
        Self {
            folders,
            choice,
            picks: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostEnvironment for ScriptedEnv {
    fn workspace_folders(&self) -> Vec<PathBuf> {
        self.folders.clone()
    }

    async fn pick(&self, placeholder: &str, items: &[PickItem]) -> Option<usize> {
        self.picks
            .lock()
            .unwrap()
            .push((placeholder.to_string(), items.len()));
        self.choice
    }

    fn show_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

fn fake_repo(root: &Path, name: &str) -> PathBuf {
    let path = root.join(name);
    fs::create_dir_all(path.join(".git")).unwrap();
    path
}

fn sample_vcs() -> ScriptedVcs {
    let mut logs = HashMap::new();
    logs.insert(
        "main".to_string(),
        vec![
            Commit::new("a1", "2023-01-01T10:00:00+00:00", "Al", "Fix login bug"),
            Commit::new("b2", "2023-01-02T10:00:00+00:00", "Bo", "Add feature"),
            Commit::new("c3", "2023-01-03T10:00:00+00:00", "Fixie", "Refactor"),
        ],
    );
    logs.insert(
        "dev".to_string(),
        vec![Commit::new("d4", "2023-02-01T10:00:00+00:00", "Cy", "Dev work")],
    );
    let mut files = HashMap::new();
    files.insert("a1".to_string(), vec!["src/login.rs".to_string()]);

    ScriptedVcs {
        branches: vec!["dev".to_string(), "main".to_string()],
        current: Some("main".to_string()),
        logs,
        files,
        ..ScriptedVcs::default()
    }
}

async fn activate_single(vcs: ScriptedVcs) -> (HistoryHost, Arc<ScriptedEnv>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let repo = fake_repo(dir.path(), "repo");
    let env = Arc::new(ScriptedEnv::new(vec![repo], None));
    let (host, _) = HistoryHost::activate(env.clone(), Arc::new(vcs), HostOptions::default())
        .await
        .unwrap();
    (host, env, dir)
}

fn data_of(message: &HostMessage) -> Vec<String> {
    match message {
        HostMessage::UpdateGraph { data, .. } => data.iter().map(|c| c.hash.clone()).collect(),
        other => panic!("unexpected message {:?}", other),
    }
}

#[tokio::test]
async fn test_activation_with_single_repository() {
    let dir = tempfile::tempdir().unwrap();
    let repo = fake_repo(dir.path(), "repo");
    let env = Arc::new(ScriptedEnv::new(vec![repo], None));

    let (host, initial) = HistoryHost::activate(env.clone(), Arc::new(sample_vcs()), HostOptions::default())
        .await
        .unwrap();

    assert_eq!(initial.commits.len(), 3);
    assert_eq!(initial.repo_list.len(), 1);
    assert_eq!(initial.repo_list[0].name, "repo");
    assert_eq!(initial.repo_index, Some(0));
    assert_eq!(initial.branches, vec!["dev", "main"]);
    assert_eq!(initial.branch_index, Some(1));
    assert!(initial.error.is_none());
    assert!(env.picks.lock().unwrap().is_empty());
    assert_eq!(host.session().current_branch(), Some("main"));
}

#[tokio::test]
async fn test_activation_errors() {
    let env = Arc::new(ScriptedEnv::new(Vec::new(), None));
    let err = HistoryHost::activate(env, Arc::new(sample_vcs()), HostOptions::default())
        .await
        .err();
    assert_eq!(err, Some(HistoryError::NoWorkspace));

    let dir = tempfile::tempdir().unwrap();
    let env = Arc::new(ScriptedEnv::new(vec![dir.path().to_path_buf()], None));
    let err = HistoryHost::activate(env, Arc::new(sample_vcs()), HostOptions::default())
        .await
        .err();
    assert_eq!(err, Some(HistoryError::NoRepositoriesFound));
}

#[tokio::test]
async fn test_multiple_repositories_prompt_for_selection() {
    let dir = tempfile::tempdir().unwrap();
    let a = fake_repo(dir.path(), "alpha");
    let b = fake_repo(dir.path(), "beta");

    let env = Arc::new(ScriptedEnv::new(vec![a.clone(), b.clone()], None));
    let err = HistoryHost::activate(env.clone(), Arc::new(sample_vcs()), HostOptions::default())
        .await
        .err();
    assert_eq!(err, Some(HistoryError::NoSelection));
    assert_eq!(
        env.picks.lock().unwrap()[0],
        ("Select the repository folder to view history".to_string(), 2)
    );

    let env = Arc::new(ScriptedEnv::new(vec![a, b], Some(1)));
    let (_, initial) = HistoryHost::activate(env, Arc::new(sample_vcs()), HostOptions::default())
        .await
        .unwrap();
    assert_eq!(initial.repo_index, Some(1));
    assert_eq!(initial.repo_list[1].name, "beta");
}

#[tokio::test]
async fn test_scan_depth_finds_nested_repositories() {
    let dir = tempfile::tempdir().unwrap();
    fake_repo(dir.path(), "one");
    fake_repo(dir.path(), "two");
    let env = Arc::new(ScriptedEnv::new(vec![dir.path().to_path_buf()], Some(0)));
    let options = HostOptions {
        scan_depth: 1,
        ..HostOptions::default()
    };

    let (_, initial) = HistoryHost::activate(env, Arc::new(sample_vcs()), options)
        .await
        .unwrap();
    let names: Vec<_> = initial.repo_list.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two"]);
}

#[tokio::test]
async fn test_preferred_branch_and_limit() {
    let dir = tempfile::tempdir().unwrap();
    let repo = fake_repo(dir.path(), "repo");
    let env = Arc::new(ScriptedEnv::new(vec![repo], None));
    let vcs = Arc::new(sample_vcs());
    let options = HostOptions {
        scan_depth: 0,
        log_limit: Some(2),
        preferred_branch: Some("dev".to_string()),
    };

    let (_, initial) = HistoryHost::activate(env, vcs.clone(), options).await.unwrap();
    assert_eq!(initial.branch_index, Some(0));
    assert_eq!(initial.commits[0].hash, "d4");
    assert_eq!(
        vcs.log_calls.lock().unwrap()[0],
        (Some("dev".to_string()), Some(2))
    );
}

#[tokio::test]
async fn test_activation_log_failure_reports_error() {
    let vcs = ScriptedVcs {
        fail_log: true,
        ..sample_vcs()
    };
    let dir = tempfile::tempdir().unwrap();
    let repo = fake_repo(dir.path(), "repo");
    let env = Arc::new(ScriptedEnv::new(vec![repo], None));

    let (_, initial) = HistoryHost::activate(env.clone(), Arc::new(vcs), HostOptions::default())
        .await
        .unwrap();
    assert!(initial.commits.is_empty());
    assert_eq!(initial.error.as_deref(), Some("Failed to retrieve Git logs."));
    assert_eq!(env.errors(), vec!["Failed to retrieve Git logs."]);
}

#[tokio::test]
async fn test_search_filters_case_insensitively() {
    let (mut host, _env, _dir) = activate_single(sample_vcs()).await;

    let replies = host
        .dispatch(DisplayMessage::Search { text: "fix".to_string() })
        .await;
    assert_eq!(replies.len(), 1);
    // 作者 "Fixie" 和信息 "Fix login bug" 都匹配
    assert_eq!(data_of(&replies[0]), vec!["a1", "c3"]);

    let replies = host
        .dispatch(DisplayMessage::Search { text: String::new() })
        .await;
    assert_eq!(data_of(&replies[0]).len(), 3);
}

#[tokio::test]
async fn test_invalid_branch_index_is_rejected() {
    let (mut host, env, _dir) = activate_single(sample_vcs()).await;
    let before = host.session().selected_branch;

    let replies = host
        .dispatch(DisplayMessage::SelectBranch {
            repo_index: 0,
            branch_index: 5,
        })
        .await;

    assert!(replies.is_empty());
    assert_eq!(host.session().selected_branch, before);
    assert_eq!(host.session().commits.len(), 3);
    assert_eq!(env.errors(), vec!["Invalid branch selection: 5"]);
}

#[tokio::test]
async fn test_invalid_repo_index_is_rejected() {
    let (mut host, env, _dir) = activate_single(sample_vcs()).await;
    let replies = host
        .dispatch(DisplayMessage::SelectRepo { repo_index: 3 })
        .await;
    assert!(replies.is_empty());
    assert_eq!(host.session().selected_repo, Some(0));
    assert_eq!(env.errors(), vec!["Invalid repository selection: 3"]);
}

#[tokio::test]
async fn test_branch_switch_fetches_log_and_clears_search() {
    let (mut host, _env, _dir) = activate_single(sample_vcs()).await;
    host.dispatch(DisplayMessage::Search { text: "fix".to_string() })
        .await;

    let replies = host
        .dispatch(DisplayMessage::SelectBranch {
            repo_index: 0,
            branch_index: 0,
        })
        .await;

    assert_eq!(replies.len(), 1);
    match &replies[0] {
        HostMessage::UpdateGraph {
            data,
            repo_list,
            branches,
            branch_index,
            error,
            ..
        } => {
            assert_eq!(data.len(), 1);
            assert_eq!(data[0].hash, "d4");
            assert!(repo_list.is_none());
            assert_eq!(branches.as_ref().map(|b| b.len()), Some(2));
            assert_eq!(*branch_index, Some(0));
            assert!(error.is_none());
        }
        other => panic!("unexpected message {:?}", other),
    }
    assert!(host.session().search_text.is_empty());
}

#[tokio::test]
async fn test_repo_switch_sends_full_update() {
    let (mut host, _env, _dir) = activate_single(sample_vcs()).await;

    let replies = host
        .dispatch(DisplayMessage::SelectRepo { repo_index: 0 })
        .await;
    match &replies[0] {
        HostMessage::UpdateGraph {
            data,
            repo_list,
            repo_index,
            branches,
            branch_index,
            ..
        } => {
            assert_eq!(data.len(), 3);
            assert_eq!(repo_list.as_ref().map(|r| r.len()), Some(1));
            assert_eq!(*repo_index, Some(0));
            assert_eq!(branches.as_ref().map(|b| b.len()), Some(2));
            assert_eq!(*branch_index, Some(1));
        }
        other => panic!("unexpected message {:?}", other),
    }
}

#[tokio::test]
async fn test_show_files_success_and_failure() {
    let (mut host, _env, _dir) = activate_single(sample_vcs()).await;
    let replies = host
        .dispatch(DisplayMessage::ShowFiles { commit_id: "a1".to_string() })
        .await;
    assert_eq!(
        replies,
        vec![HostMessage::ShowFiles {
            commit_id: "a1".to_string(),
            files: vec!["src/login.rs".to_string()],
            error: None,
        }]
    );

    let vcs = ScriptedVcs {
        fail_files: true,
        ..sample_vcs()
    };
    let (mut host, _env, _dir) = activate_single(vcs).await;
    let replies = host
        .dispatch(DisplayMessage::ShowFiles { commit_id: "deadbeef".to_string() })
        .await;
    assert_eq!(
        replies,
        vec![HostMessage::ShowFiles {
            commit_id: "deadbeef".to_string(),
            files: Vec::new(),
            error: Some("Failed to get files.".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_stale_graph_result_is_discarded() {
    let vcs: Arc<dyn VcsQuery> = Arc::new(sample_vcs());
    let (mut host, _env, _dir) = activate_single(sample_vcs()).await;

    let first = host
        .handle(DisplayMessage::SelectBranch {
            repo_index: 0,
            branch_index: 0,
        })
        .job
        .unwrap();
    let second = host
        .handle(DisplayMessage::SelectBranch {
            repo_index: 0,
            branch_index: 1,
        })
        .job
        .unwrap();
    assert!(matches!(first, FetchJob::Graph { .. }));

    let first_outcome = HistoryHost::execute(vcs.clone(), first, None).await;
    let second_outcome = HistoryHost::execute(vcs, second, None).await;

    // 先发出的请求晚到，结果被丢弃
    assert!(host.complete(second_outcome).len() == 1);
    assert!(host.complete(first_outcome).is_empty());
    assert_eq!(host.session().current_branch(), Some("main"));
    assert_eq!(host.session().commits.len(), 3);
}

#[tokio::test]
async fn test_info_message_has_no_reply() {
    let (mut host, env, _dir) = activate_single(sample_vcs()).await;
    let replies = host
        .dispatch(DisplayMessage::Info {
            text: "Git History: Selected branch index: 1".to_string(),
        })
        .await;
    assert!(replies.is_empty());
    assert!(env.errors().is_empty());
}

#[tokio::test]
async fn test_run_loop_over_channel() {
    let (host, _env, _dir) = activate_single(sample_vcs()).await;
    let (host_endpoint, mut display) = channel();
    let task = tokio::spawn(host.run(host_endpoint));

    display
        .post(DisplayMessage::Search { text: "add".to_string() })
        .unwrap();
    let reply = display.recv().await.unwrap();
    assert_eq!(data_of(&reply), vec!["b2"]);

    display
        .post(DisplayMessage::ShowFiles { commit_id: "a1".to_string() })
        .unwrap();
    let reply = display.recv().await.unwrap();
    assert_eq!(reply.command(), "showFiles");

    drop(display);
    task.await.unwrap().unwrap();
}

fn graph_parts(message: &HostMessage) -> (usize, Option<String>) {
    match message {
        HostMessage::UpdateGraph { data, error, .. } => (data.len(), error.clone()),
        other => panic!("unexpected message {:?}", other),
    }
}

#[tokio::test]
async fn test_branch_fetch_failure_sends_no_commits() {
    let vcs = ScriptedVcs {
        fail_branches: true,
        ..sample_vcs()
    };
    let dir = tempfile::tempdir().unwrap();
    let repo = fake_repo(dir.path(), "repo");
    let env = Arc::new(ScriptedEnv::new(vec![repo], None));

    let (mut host, initial) = HistoryHost::activate(env.clone(), Arc::new(vcs), HostOptions::default())
        .await
        .unwrap();
    assert!(initial.commits.is_empty());
    assert!(initial.branches.is_empty());
    assert_eq!(initial.error.as_deref(), Some("Failed to retrieve Git branches."));

    let replies = host
        .dispatch(DisplayMessage::SelectRepo { repo_index: 0 })
        .await;
    assert_eq!(replies.len(), 1);
    assert_eq!(
        graph_parts(&replies[0]),
        (0, Some("Failed to retrieve Git branches.".to_string()))
    );
    assert!(host.session().commits.is_empty());
}

#[tokio::test]
async fn test_log_failure_on_branch_switch_clears_list() {
    let vcs = ScriptedVcs {
        fail_log: true,
        ..sample_vcs()
    };
    let (mut host, _env, _dir) = activate_single(vcs).await;

    let replies = host
        .dispatch(DisplayMessage::SelectBranch {
            repo_index: 0,
            branch_index: 0,
        })
        .await;
    assert_eq!(replies.len(), 1);
    assert_eq!(
        graph_parts(&replies[0]),
        (0, Some("Failed to retrieve Git logs.".to_string()))
    );

    let replies = host
        .dispatch(DisplayMessage::SelectRepo { repo_index: 0 })
        .await;
    assert_eq!(
        graph_parts(&replies[0]),
        (0, Some("Failed to retrieve Git logs.".to_string()))
    );
    assert!(host.session().commits.is_empty());
}

#[tokio::test]
async fn test_panicked_log_task_reports_error() {
    let vcs = ScriptedVcs {
        panic_on_branch: Some("dev".to_string()),
        ..sample_vcs()
    };
    let (host, _env, _dir) = activate_single(vcs).await;
    let (host_endpoint, mut display) = channel();
    let task = tokio::spawn(host.run(host_endpoint));

    display
        .post(DisplayMessage::SelectBranch {
            repo_index: 0,
            branch_index: 0,
        })
        .unwrap();
    let reply = display.recv().await.unwrap();
    assert_eq!(
        graph_parts(&reply),
        (0, Some("Failed to retrieve Git logs.".to_string()))
    );

    drop(display);
    task.await.unwrap().unwrap();
}

fn display_for(restored: git_history::history::RestoredState) -> DisplayState {
    DisplayState::new(
        restored,
        ListRenderer::new(10, 2),
        AppendSchedule::new(Duration::from_millis(50)),
    )
}

#[tokio::test]
async fn test_restored_repository_is_adopted_by_host() {
    let dir = tempfile::tempdir().unwrap();
    let a = fake_repo(dir.path(), "alpha");
    let b = fake_repo(dir.path(), "beta");
    let env = Arc::new(ScriptedEnv::new(vec![a, b], Some(0)));
    let (mut host, initial) = HistoryHost::activate(env.clone(), Arc::new(sample_vcs()), HostOptions::default())
        .await
        .unwrap();
    assert_eq!(initial.repo_index, Some(0));

    let snapshot = DisplaySnapshot {
        repo_list: Some(initial.repo_list.clone()),
        repo_index: Some(1),
        ..DisplaySnapshot::default()
    };
    let restored = restore(Some(&snapshot), initial);
    assert_eq!(restored.initial.repo_index, Some(1));

    let sync = host.reconcile(&restored.initial).await;
    let mut display = display_for(restored);
    for message in sync {
        display.apply(message);
    }
    assert_eq!(host.session().selected_repo, Some(1));

    // 恢复后刷新和切换分支都能被宿主接受
    let refresh = display.refresh().unwrap();
    assert_eq!(host.dispatch(refresh).await.len(), 1);
    let select = display.select_branch(0).remove(0);
    assert_eq!(host.dispatch(select).await.len(), 1);
    assert!(env.errors().is_empty());
}

#[tokio::test]
async fn test_snapshot_from_other_workspace_falls_back_to_host() {
    let (mut host, env, _dir) = activate_single(sample_vcs()).await;
    let initial = git_history::history::InitialState {
        commits: host.session().commits.clone(),
        repo_list: host.session().repositories.clone(),
        repo_index: host.session().selected_repo,
        branches: host.session().branches.clone(),
        branch_index: host.session().selected_branch,
        search_text: String::new(),
        error: None,
    };
    let snapshot = DisplaySnapshot {
        repo_list: Some(vec![
            git_history::git::RepositoryRef::new("x", "/x"),
            git_history::git::RepositoryRef::new("y", "/y"),
        ]),
        repo_index: Some(1),
        ..DisplaySnapshot::default()
    };
    let restored = restore(Some(&snapshot), initial);

    let sync = host.reconcile(&restored.initial).await;
    let mut display = display_for(restored);
    for message in sync {
        display.apply(message);
    }
    assert_eq!(display.repo_index, Some(0));
    assert_eq!(display.repo_list, host.session().repositories);

    let refresh = display.refresh().unwrap();
    assert_eq!(host.dispatch(refresh).await.len(), 1);
    assert!(env.errors().is_empty());
}

#[tokio::test]
async fn test_matching_snapshot_needs_no_sync() {
    let (mut host, _env, _dir) = activate_single(sample_vcs()).await;
    let initial = git_history::history::InitialState {
        commits: host.session().commits.clone(),
        repo_list: host.session().repositories.clone(),
        repo_index: host.session().selected_repo,
        branches: host.session().branches.clone(),
        branch_index: host.session().selected_branch,
        search_text: String::new(),
        error: None,
    };
    let snapshot = DisplaySnapshot {
        search_text: Some("fix".to_string()),
        selected_row: Some(1),
        ..DisplaySnapshot::default()
    };
    let restored = restore(Some(&snapshot), initial);
    assert!(host.reconcile(&restored.initial).await.is_empty());
}
