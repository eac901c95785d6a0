// Git 数据模型
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// 单个提交记录，字段名与日志查询输出保持一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub date: String,
    pub author_name: String,
    pub message: String,
}

impl Commit {
    pub fn new(
        hash: impl Into<String>,
        date: impl Into<String>,
        author_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            hash: hash.into(),
            date: date.into(),
            author_name: author_name.into(),
            message: message.into(),
        }
    }

    /// `needle` 必须已经是小写
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.author_name.to_lowercase().contains(needle)
            || self.message.to_lowercase().contains(needle)
            || self.hash.to_lowercase().contains(needle)
    }

    pub fn short_hash(&self) -> &str {
        self.hash.get(..8).unwrap_or(&self.hash)
    }
}

/// 仓库引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub name: String,
    pub path: String,
}

impl RepositoryRef {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// 用目录名作为显示名称
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            name,
            path: path.display().to_string(),
        }
    }

    pub fn path_buf(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

/// 分支列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchList {
    pub current: Option<String>,
    pub all: Vec<String>,
}

impl BranchList {
    pub fn current_index(&self) -> Option<usize> {
        self.current
            .as_ref()
            .and_then(|current| self.all.iter().position(|b| b == current))
    }
}
