use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 历史视图错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("No workspace open. Please open a Git repository.")]
    NoWorkspace,

    #[error("No Git repositories found in the workspace.")]
    NoRepositoriesFound,

    #[error("No repository folder selected.")]
    NoSelection,

    #[error("{operation} failed: {message}")]
    Fetch { operation: String, message: String },

    #[error("Invalid {target} selection: index {index} (available: {len})")]
    InvalidSelection {
        target: SelectionTarget,
        index: usize,
        len: usize,
    },

    #[error("command channel closed")]
    ChannelClosed,

    #[error("配置错误: {message}")]
    Config { message: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("JSON error: {message}")]
    Json { message: String },
}

/// 选择目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionTarget {
    Repository,
    Branch,
}

impl std::fmt::Display for SelectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionTarget::Repository => write!(f, "repository"),
            SelectionTarget::Branch => write!(f, "branch"),
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl HistoryError {
    /// 创建获取失败错误
    pub fn fetch(operation: impl Into<String>, message: impl Into<String>) -> Self {
        HistoryError::Fetch {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// 创建配置错误
    pub fn config(message: impl Into<String>) -> Self {
        HistoryError::Config {
            message: message.into(),
        }
    }

    pub fn invalid_selection(target: SelectionTarget, index: usize, len: usize) -> Self {
        HistoryError::InvalidSelection { target, index, len }
    }

    /// 会话级终止错误：不重试，直接提示用户
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HistoryError::NoWorkspace | HistoryError::NoRepositoriesFound | HistoryError::NoSelection
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HistoryError::NoWorkspace => ErrorSeverity::Critical,
            HistoryError::NoRepositoriesFound => ErrorSeverity::Critical,
            HistoryError::NoSelection => ErrorSeverity::High,
            HistoryError::ChannelClosed => ErrorSeverity::High,
            HistoryError::Config { .. } => ErrorSeverity::High,
            HistoryError::Fetch { .. } => ErrorSeverity::Medium,
            HistoryError::Io { .. } => ErrorSeverity::Medium,
            HistoryError::Json { .. } => ErrorSeverity::Medium,
            HistoryError::InvalidSelection { .. } => ErrorSeverity::Low,
        }
    }

    /// 展示给用户的简短消息
    pub fn user_message(&self) -> String {
        match self {
            HistoryError::Fetch { operation, .. } => format!("Failed to {}.", operation),
            HistoryError::InvalidSelection { target, index, .. } => {
                format!("Invalid {} selection: {}", target, index)
            }
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for HistoryError {
    fn from(err: std::io::Error) -> Self {
        HistoryError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::Json {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for HistoryError {
    fn from(err: toml::de::Error) -> Self {
        HistoryError::config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_errors() {
        assert!(HistoryError::NoWorkspace.is_terminal());
        assert!(HistoryError::NoRepositoriesFound.is_terminal());
        assert!(HistoryError::NoSelection.is_terminal());
        assert!(!HistoryError::fetch("get files", "boom").is_terminal());
        assert!(!HistoryError::invalid_selection(SelectionTarget::Branch, 5, 2).is_terminal());
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            HistoryError::fetch("get files", "exit status 128").user_message(),
            "Failed to get files."
        );
        assert_eq!(
            HistoryError::invalid_selection(SelectionTarget::Branch, 5, 2).user_message(),
            "Invalid branch selection: 5"
        );
        assert_eq!(
            HistoryError::NoWorkspace.user_message(),
            "No workspace open. Please open a Git repository."
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(HistoryError::NoWorkspace.severity() < HistoryError::fetch("x", "y").severity());
        assert_eq!(
            HistoryError::invalid_selection(SelectionTarget::Repository, 3, 1).severity(),
            ErrorSeverity::Low
        );
    }

    #[test]
    fn test_io_conversion() {
        let err: HistoryError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, HistoryError::Io { .. }));
    }
}
