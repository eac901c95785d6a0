use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// 人类可读的格式
    Pretty,
    /// 紧凑格式
    Compact,
}

/// 日志输出目标
///
/// TUI 占用 stdout，所以只支持 stderr 和文件
#[derive(Debug, Clone, PartialEq)]
pub enum LogOutput {
    Stderr,
    File(PathBuf),
}

impl LogFormat {
    pub fn parse(format: &str) -> Option<Self> {
        match format.to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// 解析日志级别字符串
pub fn parse_level(level: &str) -> Option<Level> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// 设置日志系统
pub fn setup_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let env_filter = build_filter(config.level, env::var("RUST_LOG").ok().as_deref())?;

    match &config.output {
        LogOutput::Stderr => {
            let layer = create_fmt_layer(&config, io::stderr, true);
            tracing_subscriber::registry()
                .with(layer.with_filter(env_filter))
                .try_init()?;
        }
        LogOutput::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let layer = create_fmt_layer(&config, Mutex::new(file), false);
            tracing_subscriber::registry()
                .with(layer.with_filter(env_filter))
                .try_init()?;
        }
    }

    Ok(())
}

/// 设置了 RUST_LOG 时完全使用它，否则只开启本 crate 的配置级别
fn build_filter(level: Level, rust_log: Option<&str>) -> anyhow::Result<EnvFilter> {
    match rust_log.filter(|value| !value.trim().is_empty()) {
        Some(directives) => Ok(EnvFilter::try_new(directives)?),
        None => Ok(EnvFilter::try_new(format!(
            "git_history={}",
            level.as_str().to_ascii_lowercase()
        ))?),
    }
}

fn create_fmt_layer<S, W>(
    config: &LoggingConfig,
    make_writer: W,
    ansi: bool,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(make_writer)
        .with_ansi(ansi)
        .with_target(true)
        .with_level(true);

    match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}
