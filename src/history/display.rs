//! 显示层状态：镜像宿主推送的数据，产生用户操作对应的消息

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;

use super::channel::{DisplayMessage, HostMessage};
use super::renderer::{AppendSchedule, ListRenderer};
use super::snapshot::{DisplaySnapshot, RestoredState};
use crate::git::{Commit, RepositoryRef};

/// 某个提交的文件列表状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilesEntry {
    Loading,
    Files(Vec<String>),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct DisplayState {
    pub commits: Vec<Commit>,
    pub repo_list: Vec<RepositoryRef>,
    pub repo_index: Option<usize>,
    pub branches: Vec<String>,
    pub branch_index: Option<usize>,
    pub search_text: String,
    pub error: Option<String>,
    pub files: HashMap<String, FilesEntry>,
    pub selected_row: usize,
    pub scroll_offset: usize,
    renderer: ListRenderer,
    schedule: AppendSchedule,
}

impl DisplayState {
    pub fn new(restored: RestoredState, renderer: ListRenderer, schedule: AppendSchedule) -> Self {
        let initial = restored.initial;
        let mut state = Self {
            commits: initial.commits,
            repo_list: initial.repo_list,
            repo_index: initial.repo_index,
            branches: initial.branches,
            branch_index: initial.branch_index,
            search_text: initial.search_text,
            error: initial.error,
            files: HashMap::new(),
            selected_row: 0,
            scroll_offset: 0,
            renderer,
            schedule,
        };
        state.repaint();

        // 恢复的选中行可能超出第一页，补齐到能显示它为止
        while restored.selected_row >= state.renderer.rows().len()
            && state.renderer.render_index() < state.commits.len()
        {
            state.renderer.append_page(&state.commits);
        }
        state.selected_row = restored
            .selected_row
            .min(state.renderer.rows().len().saturating_sub(1));
        state
    }

    pub fn renderer(&self) -> &ListRenderer {
        &self.renderer
    }

    pub fn current_repository(&self) -> Option<&RepositoryRef> {
        self.repo_index.and_then(|idx| self.repo_list.get(idx))
    }

    pub fn current_branch(&self) -> Option<&str> {
        self.branch_index
            .and_then(|idx| self.branches.get(idx))
            .map(String::as_str)
    }

    pub fn selected_commit_id(&self) -> Option<&str> {
        self.renderer
            .rows()
            .get(self.selected_row)
            .map(|row| row.hash.as_str())
    }

    fn repaint(&mut self) {
        self.schedule.cancel();
        self.renderer.render(&self.commits);
        self.selected_row = 0;
        self.scroll_offset = 0;
    }

    /// 处理宿主推送的消息
    pub fn apply(&mut self, message: HostMessage) {
        match message {
            HostMessage::UpdateGraph {
                data,
                repo_list,
                repo_index,
                branches,
                branch_index,
                error,
            } => {
                self.commits = data;
                let mut clear_search = false;

                if let Some(list) = repo_list.filter(|l| !l.is_empty()) {
                    self.repo_list = list;
                    self.repo_index = Some(repo_index.unwrap_or(0));
                    clear_search = true;
                }
                if let Some(list) = branches.filter(|l| !l.is_empty()) {
                    self.branches = list;
                    self.branch_index = branch_index;
                    clear_search = true;
                }
                if clear_search || branch_index.is_some() {
                    self.search_text.clear();
                }

                self.error = error;
                self.files.clear();
                self.repaint();
            }
            HostMessage::ShowFiles {
                commit_id,
                files,
                error,
            } => {
                // 只更新当前列表中存在的提交
                if !self.commits.iter().any(|c| c.hash == commit_id) {
                    return;
                }
                let entry = match error {
                    Some(error) => FilesEntry::Error(error),
                    None => FilesEntry::Files(files),
                };
                self.files.insert(commit_id, entry);
            }
        }
    }

    pub fn search(&self) -> DisplayMessage {
        DisplayMessage::Search {
            text: self.search_text.clone(),
        }
    }

    pub fn request_files(&mut self) -> Option<DisplayMessage> {
        let commit_id = self.selected_commit_id()?.to_string();
        self.files.insert(commit_id.clone(), FilesEntry::Loading);
        Some(DisplayMessage::ShowFiles { commit_id })
    }

    pub fn select_repo(&self, repo_index: usize) -> DisplayMessage {
        DisplayMessage::SelectRepo { repo_index }
    }

    /// 分支切换消息，附带一条诊断信息
    pub fn select_branch(&mut self, branch_index: usize) -> Vec<DisplayMessage> {
        self.branch_index = Some(branch_index);
        vec![
            DisplayMessage::SelectBranch {
                repo_index: self.repo_index.unwrap_or(0),
                branch_index,
            },
            DisplayMessage::Info {
                text: format!("Git History: Selected branch index: {}", branch_index),
            },
        ]
    }

    /// 重新请求当前分支
    pub fn refresh(&self) -> Option<DisplayMessage> {
        Some(DisplayMessage::SelectBranch {
            repo_index: self.repo_index?,
            branch_index: self.branch_index?,
        })
    }

    /// 移动选中行并保持在视口内；接近末尾时安排追加
    pub fn move_selection(&mut self, delta: isize, viewport_height: usize, now: Instant) {
        let len = self.renderer.rows().len();
        if len == 0 {
            return;
        }
        let target = self.selected_row as isize + delta;
        self.selected_row = target.clamp(0, len as isize - 1) as usize;

        let height = viewport_height.max(1);
        if self.selected_row < self.scroll_offset {
            self.scroll_offset = self.selected_row;
        } else if self.selected_row >= self.scroll_offset + height {
            self.scroll_offset = self.selected_row + 1 - height;
        }

        self.on_viewport(viewport_height, now);
    }

    pub fn on_viewport(&mut self, viewport_height: usize, now: Instant) {
        if self.renderer.on_viewport(self.scroll_offset, viewport_height) {
            self.schedule.schedule(now);
        }
    }

    /// 每帧调用；防抖到期后追加下一页
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.schedule.take_due(now) {
            self.renderer.append_page(&self.commits);
            return true;
        }
        false
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            commits: Some(self.commits.clone()),
            repo_list: Some(self.repo_list.clone()),
            repo_index: self.repo_index,
            branches: Some(self.branches.clone()),
            branch_index: self.branch_index,
            search_text: Some(self.search_text.clone()),
            selected_row: Some(self.selected_row),
            saved_at: Utc::now(),
        }
    }
}
