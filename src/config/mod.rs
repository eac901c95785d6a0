use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::cli::args::Args;
use crate::history::renderer::{DEFAULT_PAGE_SIZE, DEFAULT_SCROLL_THRESHOLD};
use crate::infrastructure::logging::{parse_level, LogFormat};
use crate::infrastructure::{HistoryError, Result};

const ENV_PREFIX: &str = "GIT_HISTORY_";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub git_binary: PathBuf,
    pub page_size: usize,
    pub scroll_threshold: usize,
    pub scroll_settle_ms: u64,
    pub max_commits: Option<usize>,
    pub scan_depth: usize,
    pub log_level: String,
    pub log_format: String,
    pub log_file: PathBuf,
    pub snapshot_dir: PathBuf,
}

/// 配置文件内容，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    git_binary: Option<PathBuf>,
    page_size: Option<usize>,
    scroll_threshold: Option<usize>,
    scroll_settle_ms: Option<u64>,
    max_commits: Option<usize>,
    scan_depth: Option<usize>,
    log_level: Option<String>,
    log_format: Option<String>,
    log_file: Option<PathBuf>,
    snapshot_dir: Option<PathBuf>,
}

/// 数据目录 ~/.git-history
pub fn base_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".git-history"))
        .unwrap_or_else(|| PathBuf::from(".git-history"))
}

impl Default for Config {
    fn default() -> Self {
        let base = base_dir();
        Config {
            git_binary: PathBuf::from("git"),
            page_size: DEFAULT_PAGE_SIZE,
            scroll_threshold: DEFAULT_SCROLL_THRESHOLD,
            scroll_settle_ms: 50,
            max_commits: None,
            scan_depth: 0,
            log_level: "info".to_string(),
            log_format: "compact".to_string(),
            log_file: base.join("git-history.log"),
            snapshot_dir: base.join("snapshots"),
        }
    }
}

impl Config {
    /// 默认值 → 配置文件 → .env → 环境变量
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        match config_path {
            Some(path) => config.load_from_file(path)?,
            None => {
                let path = base_dir().join("config.toml");
                if path.exists() {
                    config.load_from_file(&path)?;
                }
            }
        }

        config.load_from_env_file();
        config.load_from_env();

        Ok(config)
    }

    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            HistoryError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        self.merge_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(())
    }

    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let file: ConfigFile = toml::from_str(content)?;

        if let Some(binary) = file.git_binary {
            self.git_binary = binary;
        }
        if let Some(page_size) = file.page_size {
            self.page_size = page_size;
        }
        if let Some(threshold) = file.scroll_threshold {
            self.scroll_threshold = threshold;
        }
        if let Some(settle) = file.scroll_settle_ms {
            self.scroll_settle_ms = settle;
        }
        if file.max_commits.is_some() {
            self.max_commits = file.max_commits;
        }
        if let Some(depth) = file.scan_depth {
            self.scan_depth = depth;
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
        if let Some(format) = file.log_format {
            self.log_format = format;
        }
        if let Some(log_file) = file.log_file {
            self.log_file = log_file;
        }
        if let Some(dir) = file.snapshot_dir {
            self.snapshot_dir = dir;
        }
        Ok(())
    }

    pub fn load_from_env_file(&mut self) {
        // 用户目录下的 .env
        let user_env_path = base_dir().join(".env");
        if user_env_path.exists() {
            dotenvy::from_path(user_env_path).ok();
        }

        // 当前目录
        dotenvy::dotenv().ok();
    }

    pub fn load_from_env(&mut self) {
        if let Ok(binary) = env::var(format!("{}GIT_BINARY", ENV_PREFIX)) {
            self.git_binary = PathBuf::from(binary);
        }
        if let Some(page_size) = env_number("PAGE_SIZE") {
            self.page_size = page_size;
        }
        if let Some(threshold) = env_number("SCROLL_THRESHOLD") {
            self.scroll_threshold = threshold;
        }
        if let Some(settle) = env_number("SCROLL_SETTLE_MS") {
            self.scroll_settle_ms = settle;
        }
        if let Some(max) = env_number("MAX_COMMITS") {
            self.max_commits = Some(max);
        }
        if let Some(depth) = env_number("SCAN_DEPTH") {
            self.scan_depth = depth;
        }
        if let Ok(level) = env::var(format!("{}LOG_LEVEL", ENV_PREFIX)) {
            self.log_level = level;
        }
        if let Ok(format) = env::var(format!("{}LOG_FORMAT", ENV_PREFIX)) {
            self.log_format = format;
        }
        if let Ok(path) = env::var(format!("{}LOG_FILE", ENV_PREFIX)) {
            self.log_file = PathBuf::from(path);
        }
        if let Ok(path) = env::var(format!("{}SNAPSHOT_DIR", ENV_PREFIX)) {
            self.snapshot_dir = PathBuf::from(path);
        }
    }

    pub fn update_from_args(&mut self, args: &Args) {
        // 命令行参数优先级最高
        if let Some(page_size) = args.page_size {
            self.page_size = page_size;
        }
        if args.max_commits.is_some() {
            self.max_commits = args.max_commits;
        }
        if let Some(depth) = args.scan_depth {
            self.scan_depth = depth;
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        if let Some(path) = &args.log_file {
            self.log_file = path.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(HistoryError::config("page_size must be greater than 0"));
        }
        if parse_level(&self.log_level).is_none() {
            return Err(HistoryError::config(format!(
                "Unsupported log level: {}",
                self.log_level
            )));
        }
        if LogFormat::parse(&self.log_format).is_none() {
            return Err(HistoryError::config(format!(
                "Unsupported log format: {}",
                self.log_format
            )));
        }
        Ok(())
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }
}

fn env_number<T: FromStr>(name: &str) -> Option<T> {
    let key = format!("{}{}", ENV_PREFIX, name);
    let value = env::var(&key).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(variable = %key, value = %value, "ignoring non-numeric value");
            None
        }
    }
}
