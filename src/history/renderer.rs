//! 分页渲染：只物化列表的前缀，滚动接近末尾时再追加下一页

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::git::Commit;

pub const DEFAULT_PAGE_SIZE: usize = 200;
pub const DEFAULT_SCROLL_THRESHOLD: usize = 20;

/// 一行提交记录的视图模型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRow {
    pub hash: String,
    pub short_hash: String,
    pub date: String,
    pub author: String,
    pub message: String,
}

impl CommitRow {
    pub fn from_commit(commit: &Commit) -> Self {
        Self {
            hash: commit.hash.clone(),
            short_hash: commit.short_hash().to_string(),
            date: format_local_date(&commit.date),
            author: commit.author_name.clone(),
            message: commit.message.clone(),
        }
    }
}

/// RFC 3339 日期转换为本地时间，无法解析时原样返回
pub fn format_local_date(date: &str) -> String {
    match DateTime::parse_from_rfc3339(date) {
        Ok(parsed) => parsed
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => date.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Empty,
    PagedPartial(usize),
    Complete,
}

#[derive(Debug, Clone)]
pub struct ListRenderer {
    page_size: usize,
    scroll_threshold: usize,
    render_index: usize,
    total: usize,
    rows: Vec<CommitRow>,
    append_in_flight: bool,
    listening: bool,
}

impl Default for ListRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_SCROLL_THRESHOLD)
    }
}

impl ListRenderer {
    pub fn new(page_size: usize, scroll_threshold: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            scroll_threshold,
            render_index: 0,
            total: 0,
            rows: Vec::new(),
            append_in_flight: false,
            listening: false,
        }
    }

    pub fn phase(&self) -> RenderPhase {
        if self.render_index == 0 {
            RenderPhase::Empty
        } else if self.render_index >= self.total {
            RenderPhase::Complete
        } else {
            RenderPhase::PagedPartial(self.render_index)
        }
    }

    pub fn render_index(&self) -> usize {
        self.render_index
    }

    pub fn rows(&self) -> &[CommitRow] {
        &self.rows
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_append_in_flight(&self) -> bool {
        self.append_in_flight
    }

    /// 数据集变化：丢弃已渲染的行，游标归零
    pub fn reset(&mut self) {
        self.render_index = 0;
        self.total = 0;
        self.rows.clear();
        self.append_in_flight = false;
        self.listening = false;
    }

    /// 重新渲染新数据的第一页
    pub fn render(&mut self, data: &[Commit]) {
        self.reset();
        self.total = data.len();
        if data.is_empty() {
            return;
        }
        self.listening = true;
        self.append_page(data);
    }

    /// 从游标处追加一页；到达末尾后停止监听滚动
    pub fn append_page(&mut self, data: &[Commit]) {
        self.total = data.len();
        let end = (self.render_index + self.page_size).min(data.len());
        self.rows
            .extend(data[self.render_index.min(end)..end].iter().map(CommitRow::from_commit));
        self.render_index = end;
        self.append_in_flight = false;

        if self.render_index >= self.total {
            self.detach();
        }
    }

    /// 可重复调用
    fn detach(&mut self) {
        self.listening = false;
    }

    /// 视口位置变化；接近末尾且没有进行中的追加时返回 true 并进入进行中状态
    pub fn on_viewport(&mut self, offset: usize, viewport_height: usize) -> bool {
        if !self.listening || self.append_in_flight {
            return false;
        }
        if !matches!(self.phase(), RenderPhase::PagedPartial(_)) {
            return false;
        }
        if offset + viewport_height + self.scroll_threshold >= self.rows.len() {
            self.append_in_flight = true;
            return true;
        }
        false
    }
}

/// 追加请求的防抖：请求被接受后等待一小段时间再执行
#[derive(Debug, Clone)]
pub struct AppendSchedule {
    settle: Duration,
    due: Option<Instant>,
}

impl AppendSchedule {
    pub fn new(settle: Duration) -> Self {
        Self { settle, due: None }
    }

    pub fn schedule(&mut self, now: Instant) {
        if self.due.is_none() {
            self.due = Some(now + self.settle);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// 到期时返回 true 并清除
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }
}
