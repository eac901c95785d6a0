use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(
    name = "git-history",
    version,
    about = "Git 提交历史查看器 - 浏览、搜索提交，切换仓库和分支",
    long_about = "git-history 在终端中显示 Git 提交历史。支持按作者、提交信息或提交 ID 搜索，切换仓库和分支，查看提交修改的文件，并在重新打开时恢复上次的搜索条件和列表位置。"
)]
pub struct Args {
    /// 工作区目录（默认当前目录）
    #[arg(value_name = "FOLDERS")]
    pub folders: Vec<PathBuf>,

    /// 配置文件路径（默认 ~/.git-history/config.toml）
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// 启动时选中的分支
    #[arg(short = 'b', long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// 启动时的搜索条件
    #[arg(short = 's', long, value_name = "TEXT")]
    pub search: Option<String>,

    /// 每次渲染的行数
    #[arg(long = "page-size", value_name = "N")]
    pub page_size: Option<usize>,

    /// 读取的最大提交数（git log -n）
    #[arg(short = 'n', long = "max-commits", value_name = "N")]
    pub max_commits: Option<usize>,

    /// 在工作区目录下查找仓库的深度，0 表示只检查目录本身
    #[arg(long = "scan-depth", value_name = "DEPTH")]
    pub scan_depth: Option<usize>,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// 日志文件路径
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// 忽略保存的快照，使用最新数据
    #[arg(long, default_value_t = false)]
    pub fresh: bool,

    /// 非交互模式：输出 updateGraph 消息的 JSON 后退出
    #[arg(short = 'p', long, default_value_t = false)]
    pub print: bool,
}

impl Args {
    /// 工作区目录，未指定时使用当前目录
    pub fn workspace_folders(&self) -> Vec<PathBuf> {
        if self.folders.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.folders.clone()
        }
    }
}
