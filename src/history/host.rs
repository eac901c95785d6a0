//! 宿主端：持有会话状态，处理显示层消息并驱动版本控制查询

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;

use super::channel::{DisplayMessage, HostEndpoint, HostMessage};
use super::session::{FetchSlot, RequestToken, SessionState};
use super::snapshot::InitialState;
use crate::git::{BranchList, Commit, VcsQuery};
use crate::infrastructure::{HistoryError, Result};
use crate::workspace::{discover_repositories, HostEnvironment, PickItem};

pub const REPO_PICK_PLACEHOLDER: &str = "Select the repository folder to view history";

/// 宿主配置
#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    pub scan_depth: usize,
    pub log_limit: Option<usize>,
    /// 启动时优先选中的分支
    pub preferred_branch: Option<String>,
}

/// 待执行的获取任务
#[derive(Debug, Clone, PartialEq)]
pub enum FetchJob {
    Graph {
        token: RequestToken,
        repo_path: PathBuf,
        branch: Option<String>,
        refresh_branches: bool,
    },
    Files {
        token: RequestToken,
        repo_path: PathBuf,
        commit_id: String,
    },
}

/// 获取任务的结果
#[derive(Debug)]
pub enum FetchOutcome {
    Graph {
        token: RequestToken,
        branches: Option<Result<BranchList>>,
        log: Result<Vec<Commit>>,
    },
    Files {
        token: RequestToken,
        commit_id: String,
        files: Result<Vec<String>>,
    },
}

/// 处理一条消息的结果：立即发送的消息加上可选的异步任务
#[derive(Debug, Default)]
pub struct Step {
    pub outgoing: Vec<HostMessage>,
    pub job: Option<FetchJob>,
}

impl Step {
    fn reply(message: HostMessage) -> Self {
        Self {
            outgoing: vec![message],
            job: None,
        }
    }

    fn fetch(job: FetchJob) -> Self {
        Self {
            outgoing: Vec::new(),
            job: Some(job),
        }
    }
}

pub struct HistoryHost {
    session: SessionState,
    vcs: Arc<dyn VcsQuery>,
    env: Arc<dyn HostEnvironment>,
    log_limit: Option<usize>,
}

impl HistoryHost {
    /// 打开历史视图：确定仓库，获取分支和日志，生成初始状态
    pub async fn activate(
        env: Arc<dyn HostEnvironment>,
        vcs: Arc<dyn VcsQuery>,
        options: HostOptions,
    ) -> Result<(Self, InitialState)> {
        let folders = env.workspace_folders();
        if folders.is_empty() {
            return Err(HistoryError::NoWorkspace);
        }

        let repositories = discover_repositories(&folders, options.scan_depth);
        if repositories.is_empty() {
            return Err(HistoryError::NoRepositoriesFound);
        }

        let repo_index = if repositories.len() == 1 {
            0
        } else {
            let items: Vec<PickItem> = repositories.iter().map(PickItem::from).collect();
            env.pick(REPO_PICK_PLACEHOLDER, &items)
                .await
                .filter(|idx| *idx < repositories.len())
                .ok_or(HistoryError::NoSelection)?
        };

        let mut host = Self {
            session: SessionState::new(repositories, Some(repo_index)),
            vcs,
            env,
            log_limit: options.log_limit,
        };

        let repo_path = host.repo_path()?;
        tracing::info!(repo = %repo_path.display(), "activating history session");

        let branches = host.vcs.fetch_branches(&repo_path).await;
        let mut error = host.apply_branches(branches);
        if let Some(preferred) = &options.preferred_branch {
            match host.session.branches.iter().position(|b| b == preferred) {
                Some(idx) => host.session.selected_branch = Some(idx),
                None => tracing::warn!(branch = %preferred, "requested branch not found"),
            }
        }

        let branch = host.session.current_branch().map(str::to_string);
        let log = host
            .vcs
            .fetch_log(&repo_path, branch.as_deref(), host.log_limit)
            .await;
        if let Some(log_error) = host.session.apply_log(log) {
            error = Some(log_error);
        }

        if let Some(message) = &error {
            // 任何获取失败都不展示部分数据
            host.session.commits.clear();
            host.env.show_error(message);
        }

        let initial = InitialState {
            commits: host.session.commits.clone(),
            repo_list: host.session.repositories.clone(),
            repo_index: host.session.selected_repo,
            branches: host.session.branches.clone(),
            branch_index: host.session.selected_branch,
            search_text: String::new(),
            error,
        };

        Ok((host, initial))
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    fn repo_path(&self) -> Result<PathBuf> {
        self.session
            .current_repository()
            .map(|repo| repo.path_buf())
            .ok_or(HistoryError::NoSelection)
    }

    fn apply_branches(&mut self, branches: Result<BranchList>) -> Option<String> {
        match branches {
            Ok(list) => {
                self.session.selected_branch = list.current_index();
                self.session.branches = list.all;
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "branch fetch failed");
                self.session.branches.clear();
                self.session.selected_branch = None;
                Some(err.user_message())
            }
        }
    }

    fn reject(&self, err: HistoryError) -> Step {
        tracing::warn!(error = %err, severity = ?err.severity(), "rejected selection");
        self.env.show_error(&err.user_message());
        Step::default()
    }

    /// 处理显示层消息；只修改会话状态，不做 IO
    pub fn handle(&mut self, message: DisplayMessage) -> Step {
        match message {
            DisplayMessage::Search { text } => Step::reply(self.session.apply_search(text)),
            DisplayMessage::ShowFiles { commit_id } => {
                let repo_path = match self.repo_path() {
                    Ok(path) => path,
                    Err(err) => {
                        return Step::reply(HostMessage::ShowFiles {
                            commit_id,
                            files: Vec::new(),
                            error: Some(err.user_message()),
                        })
                    }
                };
                let token = self.session.tokens.issue(FetchSlot::Files(commit_id.clone()));
                Step::fetch(FetchJob::Files {
                    token,
                    repo_path,
                    commit_id,
                })
            }
            DisplayMessage::SelectRepo { repo_index } => {
                if let Err(err) = self.session.check_repo_index(repo_index) {
                    return self.reject(err);
                }
                self.session.selected_repo = Some(repo_index);
                self.session.branches.clear();
                self.session.selected_branch = None;
                self.session.commits.clear();
                self.session.search_text.clear();

                let repo_path = match self.repo_path() {
                    Ok(path) => path,
                    Err(err) => return self.reject(err),
                };
                let token = self.session.tokens.issue(FetchSlot::Graph);
                Step::fetch(FetchJob::Graph {
                    token,
                    repo_path,
                    branch: None,
                    refresh_branches: true,
                })
            }
            DisplayMessage::SelectBranch {
                repo_index,
                branch_index,
            } => {
                if let Err(err) = self.session.check_branch_index(repo_index, branch_index) {
                    return self.reject(err);
                }
                self.session.selected_branch = Some(branch_index);
                self.session.commits.clear();
                self.session.search_text.clear();

                let repo_path = match self.repo_path() {
                    Ok(path) => path,
                    Err(err) => return self.reject(err),
                };
                let token = self.session.tokens.issue(FetchSlot::Graph);
                Step::fetch(FetchJob::Graph {
                    token,
                    repo_path,
                    branch: self.session.current_branch().map(str::to_string),
                    refresh_branches: false,
                })
            }
            DisplayMessage::Info { text } => {
                tracing::info!(source = "display", "{}", text);
                Step::default()
            }
        }
    }

    /// 执行获取任务，与会话状态无关，可以放到独立任务中运行
    pub async fn execute(vcs: Arc<dyn VcsQuery>, job: FetchJob, log_limit: Option<usize>) -> FetchOutcome {
        match job {
            FetchJob::Graph {
                token,
                repo_path,
                branch,
                refresh_branches,
            } => {
                if refresh_branches {
                    let branches = vcs.fetch_branches(&repo_path).await;
                    let current = branches
                        .as_ref()
                        .ok()
                        .and_then(|list| list.current.clone());
                    let log = vcs.fetch_log(&repo_path, current.as_deref(), log_limit).await;
                    FetchOutcome::Graph {
                        token,
                        branches: Some(branches),
                        log,
                    }
                } else {
                    let log = vcs.fetch_log(&repo_path, branch.as_deref(), log_limit).await;
                    FetchOutcome::Graph {
                        token,
                        branches: None,
                        log,
                    }
                }
            }
            FetchJob::Files {
                token,
                repo_path,
                commit_id,
            } => {
                let files = vcs.fetch_changed_files(&repo_path, &commit_id).await;
                FetchOutcome::Files {
                    token,
                    commit_id,
                    files,
                }
            }
        }
    }

    /// 合并获取结果；过期令牌的结果直接丢弃
    pub fn complete(&mut self, outcome: FetchOutcome) -> Vec<HostMessage> {
        match outcome {
            FetchOutcome::Graph {
                token,
                branches,
                log,
            } => {
                if !self.session.tokens.is_current(&FetchSlot::Graph, token) {
                    tracing::debug!(?token, "discarding stale graph result");
                    return Vec::new();
                }
                self.session.tokens.retire(&FetchSlot::Graph, token);

                match branches {
                    Some(branches) => {
                        let branch_error = self.apply_branches(branches);
                        let log_error = self.session.apply_log(log);
                        let error = log_error.or(branch_error);
                        if error.is_some() {
                            self.session.commits.clear();
                        }
                        vec![self.session.full_update(error)]
                    }
                    None => {
                        let log_error = self.session.apply_log(log);
                        vec![self.session.branch_update(log_error)]
                    }
                }
            }
            FetchOutcome::Files {
                token,
                commit_id,
                files,
            } => {
                let slot = FetchSlot::Files(commit_id.clone());
                if !self.session.tokens.is_current(&slot, token) {
                    tracing::debug!(?token, commit = %commit_id, "discarding stale files result");
                    return Vec::new();
                }
                self.session.tokens.retire(&slot, token);

                match files {
                    Ok(files) => vec![HostMessage::ShowFiles {
                        commit_id,
                        files,
                        error: None,
                    }],
                    Err(err) => {
                        tracing::warn!(error = %err, commit = %commit_id, "file list fetch failed");
                        vec![HostMessage::ShowFiles {
                            commit_id,
                            files: Vec::new(),
                            error: Some(err.user_message()),
                        }]
                    }
                }
            }
        }
    }

    /// 日志任务异常终止：清空列表并报告错误
    pub fn fail_graph(&mut self) -> Vec<HostMessage> {
        let error = HistoryError::fetch("retrieve Git logs", "fetch task aborted").user_message();
        self.session.commits.clear();
        self.session.last_error = Some(error.clone());
        self.env.show_error(&error);
        vec![HostMessage::graph_error(error)]
    }

    fn host_view(&self) -> HostMessage {
        self.session.full_update(self.session.last_error.clone())
    }

    /// 显示层从快照恢复后，使宿主的选择与显示层一致
    ///
    /// 返回显示层需要应用的消息；快照与宿主的仓库或分支列表不一致时以宿主为准。
    pub async fn reconcile(&mut self, restored: &InitialState) -> Vec<HostMessage> {
        if restored.repo_list != self.session.repositories {
            tracing::debug!("snapshot repositories differ, using host selection");
            return vec![self.host_view()];
        }
        if restored.repo_index != self.session.selected_repo {
            return match restored.repo_index {
                Some(repo_index) => self.dispatch(DisplayMessage::SelectRepo { repo_index }).await,
                None => vec![self.host_view()],
            };
        }
        if restored.branches != self.session.branches {
            tracing::debug!("snapshot branches differ, using host selection");
            return vec![self.host_view()];
        }
        if restored.branch_index != self.session.selected_branch {
            return match (restored.repo_index, restored.branch_index) {
                (Some(repo_index), Some(branch_index)) => {
                    self.dispatch(DisplayMessage::SelectBranch {
                        repo_index,
                        branch_index,
                    })
                    .await
                }
                _ => vec![self.host_view()],
            };
        }
        Vec::new()
    }

    /// 顺序处理一条消息，等待其获取任务完成
    pub async fn dispatch(&mut self, message: DisplayMessage) -> Vec<HostMessage> {
        let step = self.handle(message);
        let mut outgoing = step.outgoing;
        if let Some(job) = step.job {
            let outcome = Self::execute(Arc::clone(&self.vcs), job, self.log_limit).await;
            outgoing.extend(self.complete(outcome));
        }
        outgoing
    }

    /// 宿主事件循环：获取任务在后台运行，循环继续处理新消息
    pub async fn run(mut self, mut endpoint: HostEndpoint) -> Result<()> {
        let mut graph_jobs: JoinSet<FetchOutcome> = JoinSet::new();
        let mut file_jobs: JoinSet<FetchOutcome> = JoinSet::new();

        loop {
            tokio::select! {
                incoming = endpoint.recv() => {
                    let Some(message) = incoming else {
                        tracing::debug!("display closed, stopping host loop");
                        break;
                    };
                    let step = self.handle(message);
                    if !deliver(&endpoint, step.outgoing) {
                        break;
                    }
                    match step.job {
                        Some(job @ FetchJob::Graph { .. }) => {
                            graph_jobs.spawn(Self::execute(Arc::clone(&self.vcs), job, self.log_limit));
                        }
                        Some(job @ FetchJob::Files { .. }) => {
                            file_jobs.spawn(Self::execute(Arc::clone(&self.vcs), job, self.log_limit));
                        }
                        None => {}
                    }
                }
                Some(done) = graph_jobs.join_next(), if !graph_jobs.is_empty() => {
                    let outgoing = match done {
                        Ok(outcome) => self.complete(outcome),
                        Err(e) => {
                            tracing::error!(error = %e, "graph fetch task failed");
                            self.fail_graph()
                        }
                    };
                    if !deliver(&endpoint, outgoing) {
                        break;
                    }
                }
                Some(done) = file_jobs.join_next(), if !file_jobs.is_empty() => {
                    match done {
                        Ok(outcome) => {
                            let outgoing = self.complete(outcome);
                            if !deliver(&endpoint, outgoing) {
                                break;
                            }
                        }
                        Err(e) => tracing::error!(error = %e, "file fetch task failed"),
                    }
                }
            }
        }

        graph_jobs.abort_all();
        file_jobs.abort_all();
        Ok(())
    }
}

fn deliver(endpoint: &HostEndpoint, messages: Vec<HostMessage>) -> bool {
    for message in messages {
        if endpoint.post(message).is_err() {
            return false;
        }
    }
    true
}
