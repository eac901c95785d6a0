// Git 查询层 - 通过 git 命令行获取日志、分支和变更文件
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use super::models::{BranchList, Commit};
use crate::infrastructure::{HistoryError, Result};

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';
const LOG_FORMAT: &str = "--pretty=format:%H%x1f%aI%x1f%an%x1f%s%x1e";

/// 版本控制查询接口
#[async_trait]
pub trait VcsQuery: Send + Sync {
    /// 获取提交日志，`branch` 为空时使用 HEAD
    async fn fetch_log(
        &self,
        repo_path: &Path,
        branch: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Commit>>;

    async fn fetch_branches(&self, repo_path: &Path) -> Result<BranchList>;

    async fn fetch_changed_files(&self, repo_path: &Path, commit_id: &str) -> Result<Vec<String>>;
}

/// 基于 git 命令行的实现
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, repo_path: &Path, operation: &str, args: &[String]) -> Result<String> {
        tracing::debug!(repo = %repo_path.display(), ?args, "running git");

        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(repo_path)
            .output()
            .await
            .map_err(|e| HistoryError::fetch(operation, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HistoryError::fetch(
                operation,
                format!("git exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl VcsQuery for GitCli {
    async fn fetch_log(
        &self,
        repo_path: &Path,
        branch: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Commit>> {
        let mut args = vec!["log".to_string(), LOG_FORMAT.to_string()];
        if let Some(limit) = limit {
            args.push("-n".to_string());
            args.push(limit.to_string());
        }
        if let Some(branch) = branch {
            args.push(branch.to_string());
            // 分支名与路径同名时避免歧义
            args.push("--".to_string());
        }

        let stdout = self.run(repo_path, "retrieve Git logs", &args).await?;
        Ok(parse_log_output(&stdout))
    }

    async fn fetch_branches(&self, repo_path: &Path) -> Result<BranchList> {
        let args = vec![
            "branch".to_string(),
            "--list".to_string(),
            "--format=%(HEAD)%(refname:short)".to_string(),
        ];
        let stdout = self.run(repo_path, "retrieve Git branches", &args).await?;
        Ok(parse_branch_output(&stdout))
    }

    async fn fetch_changed_files(&self, repo_path: &Path, commit_id: &str) -> Result<Vec<String>> {
        let args = vec![
            "show".to_string(),
            "--name-only".to_string(),
            "--pretty=format:".to_string(),
            commit_id.to_string(),
        ];
        let stdout = self.run(repo_path, "get files", &args).await?;
        Ok(parse_name_only(&stdout))
    }
}

/// 解析 `LOG_FORMAT` 输出
pub fn parse_log_output(output: &str) -> Vec<Commit> {
    output
        .split(RECORD_SEP)
        .map(|record| record.trim_matches(|c| c == '\n' || c == '\r'))
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let mut parts = record.splitn(4, FIELD_SEP);
            let hash = parts.next()?.trim();
            let date = parts.next()?.trim();
            let author_name = parts.next()?.trim();
            let message = parts.next().unwrap_or("").trim();
            if hash.is_empty() {
                return None;
            }
            Some(Commit::new(hash, date, author_name, message))
        })
        .collect()
}

/// 解析 `%(HEAD)%(refname:short)` 格式的分支输出
pub fn parse_branch_output(output: &str) -> BranchList {
    let mut branches = BranchList::default();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let (is_head, name) = match line.strip_prefix('*') {
            Some(rest) => (true, rest.trim()),
            None => (false, line.trim()),
        };
        // 分离 HEAD 显示为 "(HEAD detached at ...)"
        if name.starts_with('(') {
            continue;
        }
        if is_head {
            branches.current = Some(name.to_string());
        }
        branches.all.push(name.to_string());
    }

    branches
}

pub fn parse_name_only(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
