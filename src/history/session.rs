use std::collections::HashMap;

use super::channel::HostMessage;
use super::filter::filter_commits;
use crate::git::{Commit, RepositoryRef};
use crate::infrastructure::{HistoryError, Result, SelectionTarget};

/// 获取请求的槽位，同一槽位只有最新的请求结果会被采用
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchSlot {
    Graph,
    Files(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// 单调递增的请求令牌
#[derive(Debug, Default)]
pub struct TokenLedger {
    next: u64,
    latest: HashMap<FetchSlot, RequestToken>,
}

impl TokenLedger {
    pub fn issue(&mut self, slot: FetchSlot) -> RequestToken {
        self.next += 1;
        let token = RequestToken(self.next);
        self.latest.insert(slot, token);
        token
    }

    pub fn is_current(&self, slot: &FetchSlot, token: RequestToken) -> bool {
        self.latest.get(slot) == Some(&token)
    }

    /// 结果已被采用后释放槽位
    pub fn retire(&mut self, slot: &FetchSlot, token: RequestToken) {
        if self.is_current(slot, token) {
            self.latest.remove(slot);
        }
    }
}

/// 宿主端会话状态
#[derive(Debug, Default)]
pub struct SessionState {
    pub repositories: Vec<RepositoryRef>,
    pub selected_repo: Option<usize>,
    pub branches: Vec<String>,
    pub selected_branch: Option<usize>,
    pub commits: Vec<Commit>,
    pub search_text: String,
    pub last_error: Option<String>,
    pub tokens: TokenLedger,
}

impl SessionState {
    pub fn new(repositories: Vec<RepositoryRef>, selected_repo: Option<usize>) -> Self {
        Self {
            repositories,
            selected_repo,
            ..Self::default()
        }
    }

    pub fn current_repository(&self) -> Option<&RepositoryRef> {
        self.selected_repo.and_then(|idx| self.repositories.get(idx))
    }

    pub fn current_branch(&self) -> Option<&str> {
        self.selected_branch
            .and_then(|idx| self.branches.get(idx))
            .map(String::as_str)
    }

    pub fn check_repo_index(&self, repo_index: usize) -> Result<()> {
        if repo_index >= self.repositories.len() {
            return Err(HistoryError::invalid_selection(
                SelectionTarget::Repository,
                repo_index,
                self.repositories.len(),
            ));
        }
        Ok(())
    }

    /// 分支切换请求必须针对当前仓库且索引在范围内
    pub fn check_branch_index(&self, repo_index: usize, branch_index: usize) -> Result<()> {
        if self.selected_repo != Some(repo_index) {
            return Err(HistoryError::invalid_selection(
                SelectionTarget::Repository,
                repo_index,
                self.repositories.len(),
            ));
        }
        if branch_index >= self.branches.len() {
            return Err(HistoryError::invalid_selection(
                SelectionTarget::Branch,
                branch_index,
                self.branches.len(),
            ));
        }
        Ok(())
    }

    /// 当前搜索条件下的可见提交
    pub fn visible_commits(&self) -> Vec<Commit> {
        filter_commits(&self.commits, &self.search_text)
    }

    pub fn apply_search(&mut self, text: String) -> HostMessage {
        self.search_text = text;
        HostMessage::graph(self.visible_commits())
    }

    /// 写入日志获取结果；失败时清空列表并记录错误
    pub fn apply_log(&mut self, result: Result<Vec<Commit>>) -> Option<String> {
        match result {
            Ok(commits) => {
                self.commits = commits;
                self.last_error = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "log fetch failed");
                self.commits.clear();
                self.last_error = Some(err.user_message());
            }
        }
        self.last_error.clone()
    }

    /// 携带完整选择器的刷新消息
    pub fn full_update(&self, error: Option<String>) -> HostMessage {
        HostMessage::UpdateGraph {
            data: self.visible_commits(),
            repo_list: Some(self.repositories.clone()),
            repo_index: self.selected_repo,
            branches: Some(self.branches.clone()),
            branch_index: self.selected_branch,
            error,
        }
    }

    /// 分支切换后的刷新消息
    pub fn branch_update(&self, error: Option<String>) -> HostMessage {
        HostMessage::UpdateGraph {
            data: self.visible_commits(),
            repo_list: None,
            repo_index: None,
            branches: Some(self.branches.clone()),
            branch_index: self.selected_branch,
            error,
        }
    }
}
