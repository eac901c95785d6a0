use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use super::channel::{DisplayEndpoint, DisplayMessage};
use super::display::DisplayState;
use super::snapshot::DisplaySnapshot;
use super::view::{self, AppMode, ViewContext};
use crate::infrastructure::Result;
use crate::workspace::Notice;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const PAGE_STEP: isize = 10;

/// 终端历史视图
pub struct HistoryApp {
    display: DisplayState,
    endpoint: DisplayEndpoint,
    notices: mpsc::UnboundedReceiver<Notice>,
    mode: AppMode,
    search_input: String,
    status: Option<String>,
    viewport_height: usize,
    should_quit: bool,
}

impl HistoryApp {
    pub fn new(
        display: DisplayState,
        endpoint: DisplayEndpoint,
        notices: mpsc::UnboundedReceiver<Notice>,
    ) -> Self {
        Self {
            display,
            endpoint,
            notices,
            mode: AppMode::Normal,
            search_input: String::new(),
            status: None,
            viewport_height: 1,
            should_quit: false,
        }
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// 运行界面直到用户退出，返回退出时的快照
    pub async fn run(mut self) -> Result<DisplaySnapshot> {
        // 设置终端
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_loop(&mut terminal).await;

        // 恢复终端
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result.map(|_| self.display.snapshot())
    }

    async fn run_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            self.pump(Instant::now());

            terminal.draw(|f| self.draw(f))?;

            if event::poll(POLL_INTERVAL)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key, Instant::now())?;
                    }
                }
            }

            if self.should_quit {
                break;
            }
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    /// 收取宿主消息和通知，推进分页追加
    pub fn pump(&mut self, now: Instant) {
        while let Some(message) = self.endpoint.try_recv() {
            tracing::debug!(command = message.command(), "host message received");
            self.display.apply(message);
            // 新数据可能一屏就显示完，需要立即检查是否追加
            self.display.on_viewport(self.viewport_height, now);
        }
        while let Ok(notice) = self.notices.try_recv() {
            self.status = Some(notice.message);
        }
        if self.display.tick(now) {
            self.display.on_viewport(self.viewport_height, now);
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let areas = view::layout(frame.area());
        self.viewport_height = view::table_viewport_height(areas.table).max(1);

        let ctx = ViewContext {
            display: &self.display,
            mode: self.mode,
            search_input: &self.search_input,
            status: self.status.as_deref(),
        };
        view::render(frame, &ctx);
    }

    fn post(&self, message: DisplayMessage) -> Result<()> {
        self.endpoint.post(message)
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Result<()> {
        match self.mode {
            AppMode::Normal => self.handle_normal_key(key, now),
            AppMode::Search => self.handle_search_key(key),
            AppMode::PickRepo(selected) => {
                let len = self.display.repo_list.len();
                match picker_key(key, selected, len) {
                    PickerAction::Move(idx) => self.mode = AppMode::PickRepo(idx),
                    PickerAction::Cancel => self.mode = AppMode::Normal,
                    PickerAction::Confirm(idx) => {
                        self.mode = AppMode::Normal;
                        let message = self.display.select_repo(idx);
                        self.post(message)?;
                    }
                    PickerAction::None => {}
                }
                Ok(())
            }
            AppMode::PickBranch(selected) => {
                let len = self.display.branches.len();
                match picker_key(key, selected, len) {
                    PickerAction::Move(idx) => self.mode = AppMode::PickBranch(idx),
                    PickerAction::Cancel => self.mode = AppMode::Normal,
                    PickerAction::Confirm(idx) => {
                        self.mode = AppMode::Normal;
                        for message in self.display.select_branch(idx) {
                            self.post(message)?;
                        }
                    }
                    PickerAction::None => {}
                }
                Ok(())
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent, now: Instant) -> Result<()> {
        let height = self.viewport_height;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Down | KeyCode::Char('j') => self.display.move_selection(1, height, now),
            KeyCode::Up | KeyCode::Char('k') => self.display.move_selection(-1, height, now),
            KeyCode::PageDown => self.display.move_selection(PAGE_STEP.max(height as isize), height, now),
            KeyCode::PageUp => self.display.move_selection(-PAGE_STEP.max(height as isize), height, now),
            KeyCode::Home | KeyCode::Char('g') => self.display.move_selection(isize::MIN / 2, height, now),
            KeyCode::End | KeyCode::Char('G') => self.display.move_selection(isize::MAX / 2, height, now),
            KeyCode::Char('/') => {
                self.search_input = self.display.search_text.clone();
                self.mode = AppMode::Search;
            }
            KeyCode::Enter => {
                if let Some(message) = self.display.request_files() {
                    self.post(message)?;
                }
            }
            KeyCode::Char('R') => {
                if !self.display.repo_list.is_empty() {
                    self.mode = AppMode::PickRepo(self.display.repo_index.unwrap_or(0));
                }
            }
            KeyCode::Char('B') => {
                if !self.display.branches.is_empty() {
                    self.mode = AppMode::PickBranch(self.display.branch_index.unwrap_or(0));
                }
            }
            KeyCode::Char('r') => {
                self.status = None;
                if let Some(message) = self.display.refresh() {
                    self.post(message)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.search_input.clear();
                self.mode = AppMode::Normal;
            }
            KeyCode::Enter => {
                self.display.search_text = std::mem::take(&mut self.search_input);
                self.mode = AppMode::Normal;
                let message = self.display.search();
                self.post(message)?;
            }
            KeyCode::Backspace => {
                self.search_input.pop();
            }
            KeyCode::Char(c) => self.search_input.push(c),
            _ => {}
        }
        Ok(())
    }
}

enum PickerAction {
    None,
    Move(usize),
    Confirm(usize),
    Cancel,
}

fn picker_key(key: KeyEvent, selected: usize, len: usize) -> PickerAction {
    if len == 0 {
        return PickerAction::Cancel;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => PickerAction::Cancel,
        KeyCode::Down | KeyCode::Char('j') => PickerAction::Move((selected + 1).min(len - 1)),
        KeyCode::Up | KeyCode::Char('k') => PickerAction::Move(selected.saturating_sub(1)),
        KeyCode::Enter => PickerAction::Confirm(selected.min(len - 1)),
        _ => PickerAction::None,
    }
}
