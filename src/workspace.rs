//! 宿主环境：工作区目录、仓库发现、单选提示和错误提示

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc;
use walkdir::WalkDir;

use crate::git::RepositoryRef;
use crate::ui;

/// 单选列表中的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickItem {
    pub label: String,
    pub description: String,
}

impl From<&RepositoryRef> for PickItem {
    fn from(repo: &RepositoryRef) -> Self {
        Self {
            label: repo.name.clone(),
            description: repo.path.clone(),
        }
    }
}

#[async_trait]
pub trait HostEnvironment: Send + Sync {
    /// 当前工作区的候选目录
    fn workspace_folders(&self) -> Vec<PathBuf>;

    /// 让用户从列表中选择一项，取消时返回 None
    async fn pick(&self, placeholder: &str, items: &[PickItem]) -> Option<usize>;

    /// 显示用户可见的错误
    fn show_error(&self, message: &str);
}

/// 判断目录是否为 Git 仓库（`.git` 可以是目录也可以是 worktree 的文件）
pub fn is_repository(path: &Path) -> bool {
    path.join(".git").exists()
}

/// 目录本身或其上级目录所在仓库的根目录
pub fn enclosing_repository(path: &Path) -> Option<PathBuf> {
    let path = path.canonicalize().ok()?;
    path.ancestors()
        .find(|dir| is_repository(dir))
        .map(Path::to_path_buf)
}

/// 在工作区目录中查找仓库
///
/// 目录位于某个仓库内部时使用该仓库；`scan_depth` 大于 0 时还会查找子目录中的仓库。
pub fn discover_repositories(folders: &[PathBuf], scan_depth: usize) -> Vec<RepositoryRef> {
    let mut seen = HashSet::new();
    let mut repos = Vec::new();

    for folder in folders {
        if let Some(root) = enclosing_repository(folder) {
            if seen.insert(root.clone()) {
                repos.push(RepositoryRef::from_path(&root));
            }
        }
        if scan_depth == 0 {
            continue;
        }

        let walker = WalkDir::new(folder)
            .min_depth(1)
            .max_depth(scan_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git");

        for entry in walker.filter_map(|entry| entry.ok()) {
            if !entry.file_type().is_dir() || !is_repository(entry.path()) {
                continue;
            }
            let path = entry
                .path()
                .canonicalize()
                .unwrap_or_else(|_| entry.path().to_path_buf());
            if seen.insert(path.clone()) {
                repos.push(RepositoryRef::from_path(&path));
            }
        }
    }

    repos
}

/// 用户可见的提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

/// 终端宿主环境：启动阶段在 stdin 上提示，运行阶段把错误转发给界面状态栏
pub struct TerminalEnvironment {
    folders: Vec<PathBuf>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl TerminalEnvironment {
    pub fn new(folders: Vec<PathBuf>) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, receiver) = mpsc::unbounded_channel();
        (Self { folders, notices }, receiver)
    }
}

#[async_trait]
impl HostEnvironment for TerminalEnvironment {
    fn workspace_folders(&self) -> Vec<PathBuf> {
        self.folders.clone()
    }

    async fn pick(&self, placeholder: &str, items: &[PickItem]) -> Option<usize> {
        let placeholder = placeholder.to_string();
        let items = items.to_vec();
        tokio::task::spawn_blocking(move || ui::pick_from_list(&placeholder, &items))
            .await
            .ok()
            .and_then(|result| match result {
                Ok(choice) => choice,
                Err(e) => {
                    tracing::warn!(error = %e, "prompt failed");
                    None
                }
            })
    }

    fn show_error(&self, message: &str) {
        tracing::error!("{}", message);
        // 界面已退出时丢弃
        let _ = self.notices.send(Notice {
            message: message.to_string(),
        });
    }
}
