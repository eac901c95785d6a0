//! 显示层状态快照，用于重新打开时恢复搜索条件和列表位置

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::git::{Commit, RepositoryRef};
use crate::infrastructure::Result;

/// 宿主在创建显示层时提供的初始数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub commits: Vec<Commit>,
    pub repo_list: Vec<RepositoryRef>,
    pub repo_index: Option<usize>,
    pub branches: Vec<String>,
    pub branch_index: Option<usize>,
    pub search_text: String,
    pub error: Option<String>,
}

/// 持久化的显示层快照，所有字段都可能缺失
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    #[serde(default)]
    pub commits: Option<Vec<Commit>>,
    #[serde(default)]
    pub repo_list: Option<Vec<RepositoryRef>>,
    #[serde(default)]
    pub repo_index: Option<usize>,
    #[serde(default)]
    pub branches: Option<Vec<String>>,
    #[serde(default)]
    pub branch_index: Option<usize>,
    #[serde(default)]
    pub search_text: Option<String>,
    #[serde(default)]
    pub selected_row: Option<usize>,
    pub saved_at: DateTime<Utc>,
}

impl Default for DisplaySnapshot {
    fn default() -> Self {
        Self {
            commits: None,
            repo_list: None,
            repo_index: None,
            branches: None,
            branch_index: None,
            search_text: None,
            selected_row: None,
            saved_at: Utc::now(),
        }
    }
}

/// 合并后的显示层起始状态
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredState {
    pub initial: InitialState,
    pub selected_row: usize,
}

fn non_empty<T>(saved: Option<&Vec<T>>) -> Option<&Vec<T>> {
    saved.filter(|items| !items.is_empty())
}

/// 逐字段合并：快照中有非空值时使用快照，否则使用新数据
pub fn restore(snapshot: Option<&DisplaySnapshot>, fresh: InitialState) -> RestoredState {
    let Some(saved) = snapshot else {
        return RestoredState {
            initial: fresh,
            selected_row: 0,
        };
    };

    let commits = non_empty(saved.commits.as_ref())
        .cloned()
        .unwrap_or(fresh.commits);
    let repo_list = non_empty(saved.repo_list.as_ref())
        .cloned()
        .unwrap_or(fresh.repo_list);
    let branches = non_empty(saved.branches.as_ref())
        .cloned()
        .unwrap_or(fresh.branches);
    let search_text = saved
        .search_text
        .clone()
        .filter(|text| !text.is_empty())
        .unwrap_or(fresh.search_text);

    // 索引只在落在恢复后的列表范围内时采用
    let repo_index = saved
        .repo_index
        .filter(|idx| *idx < repo_list.len())
        .or(fresh.repo_index);
    let branch_index = saved
        .branch_index
        .filter(|idx| *idx < branches.len())
        .or(fresh.branch_index);

    RestoredState {
        selected_row: saved.selected_row.unwrap_or(0),
        initial: InitialState {
            commits,
            repo_list,
            repo_index,
            branches,
            branch_index,
            search_text,
            error: fresh.error,
        },
    }
}

/// 按工作区保存快照文件
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 工作区目录列表的稳定文件名
    pub fn key_for(folders: &[PathBuf]) -> String {
        let mut hasher = Sha256::new();
        for folder in folders {
            hasher.update(folder.display().to_string().as_bytes());
            hasher.update([0u8]);
        }
        hasher
            .finalize()
            .iter()
            .take(8)
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn save(&self, key: &str, snapshot: &DisplaySnapshot) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(snapshot)?;

        // 原子写入
        let target = self.path_for(key);
        let temp = target.with_extension("tmp");
        fs::write(&temp, json)?;
        fs::rename(&temp, &target)?;

        tracing::debug!(path = %target.display(), "snapshot saved");
        Ok(())
    }

    /// 文件不存在或无法解析时返回 None
    pub fn load(&self, key: &str) -> Option<DisplaySnapshot> {
        let path = self.path_for(key);
        load_file(&path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn load_file(path: &Path) -> Option<DisplaySnapshot> {
    if !path.exists() {
        return None;
    }
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read snapshot");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt snapshot");
            None
        }
    }
}
