//! 宿主与显示层之间的命令通道
//!
//! 每个方向各一条有序的 mpsc 队列，消息格式与 `{"command": ...}` 的 JSON 协议一致。

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::git::{Commit, RepositoryRef};
use crate::infrastructure::{HistoryError, Result};

/// 宿主 → 显示层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostMessage {
    UpdateGraph {
        data: Vec<Commit>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repo_list: Option<Vec<RepositoryRef>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repo_index: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branches: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch_index: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    ShowFiles {
        commit_id: String,
        files: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl HostMessage {
    /// 只替换提交列表，选择器保持不变
    pub fn graph(data: Vec<Commit>) -> Self {
        HostMessage::UpdateGraph {
            data,
            repo_list: None,
            repo_index: None,
            branches: None,
            branch_index: None,
            error: None,
        }
    }

    /// 空列表加错误信息
    pub fn graph_error(error: impl Into<String>) -> Self {
        HostMessage::UpdateGraph {
            data: Vec::new(),
            repo_list: None,
            repo_index: None,
            branches: None,
            branch_index: None,
            error: Some(error.into()),
        }
    }

    pub fn command(&self) -> &'static str {
        match self {
            HostMessage::UpdateGraph { .. } => "updateGraph",
            HostMessage::ShowFiles { .. } => "showFiles",
        }
    }
}

/// 显示层 → 宿主
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DisplayMessage {
    Search { text: String },
    ShowFiles { commit_id: String },
    SelectRepo { repo_index: usize },
    SelectBranch { repo_index: usize, branch_index: usize },
    Info { text: String },
}

/// 宿主端
#[derive(Debug)]
pub struct HostEndpoint {
    outgoing: mpsc::UnboundedSender<HostMessage>,
    incoming: mpsc::UnboundedReceiver<DisplayMessage>,
}

/// 显示端
#[derive(Debug)]
pub struct DisplayEndpoint {
    outgoing: mpsc::UnboundedSender<DisplayMessage>,
    incoming: mpsc::UnboundedReceiver<HostMessage>,
}

/// 创建一对相连的端点
pub fn channel() -> (HostEndpoint, DisplayEndpoint) {
    let (host_tx, display_rx) = mpsc::unbounded_channel();
    let (display_tx, host_rx) = mpsc::unbounded_channel();

    (
        HostEndpoint {
            outgoing: host_tx,
            incoming: host_rx,
        },
        DisplayEndpoint {
            outgoing: display_tx,
            incoming: display_rx,
        },
    )
}

impl HostEndpoint {
    pub fn post(&self, message: HostMessage) -> Result<()> {
        self.outgoing
            .send(message)
            .map_err(|_| HistoryError::ChannelClosed)
    }

    /// 显示端关闭后返回 None
    pub async fn recv(&mut self) -> Option<DisplayMessage> {
        self.incoming.recv().await
    }
}

impl DisplayEndpoint {
    pub fn post(&self, message: DisplayMessage) -> Result<()> {
        self.outgoing
            .send(message)
            .map_err(|_| HistoryError::ChannelClosed)
    }

    pub async fn recv(&mut self) -> Option<HostMessage> {
        self.incoming.recv().await
    }

    /// 非阻塞读取，供 UI 主循环每帧调用
    pub fn try_recv(&mut self) -> Option<HostMessage> {
        self.incoming.try_recv().ok()
    }
}
