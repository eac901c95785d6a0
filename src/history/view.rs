// 历史视图渲染
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
    Frame,
};

use super::display::{DisplayState, FilesEntry};

/// 界面模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Normal,
    Search,
    PickRepo(usize),
    PickBranch(usize),
}

pub struct ViewContext<'a> {
    pub display: &'a DisplayState,
    pub mode: AppMode,
    pub search_input: &'a str,
    pub status: Option<&'a str>,
}

/// 各区域的位置
pub struct ViewAreas {
    pub header: Rect,
    pub search: Rect,
    pub table: Rect,
    pub files: Rect,
    pub status: Rect,
}

pub fn layout(area: Rect) -> ViewAreas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(rows[2]);

    ViewAreas {
        header: rows[0],
        search: rows[1],
        table: body[0],
        files: body[1],
        status: rows[3],
    }
}

/// 表格可见的数据行数（去掉边框和表头）
pub fn table_viewport_height(table: Rect) -> usize {
    table.height.saturating_sub(3) as usize
}

pub fn render(frame: &mut Frame, ctx: &ViewContext) {
    let areas = layout(frame.area());

    render_header(frame, areas.header, ctx.display);
    render_search(frame, areas.search, ctx);
    render_table(frame, areas.table, ctx.display);
    render_files(frame, areas.files, ctx.display);
    render_status(frame, areas.status, ctx);

    match ctx.mode {
        AppMode::PickRepo(selected) => {
            let labels: Vec<String> = ctx
                .display
                .repo_list
                .iter()
                .map(|repo| format!("{}  {}", repo.name, repo.path))
                .collect();
            render_picker(frame, "Repository", &labels, selected);
        }
        AppMode::PickBranch(selected) => {
            render_picker(frame, "Branch", &ctx.display.branches, selected);
        }
        _ => {}
    }
}

fn render_header(frame: &mut Frame, area: Rect, display: &DisplayState) {
    let repo = display
        .current_repository()
        .map(|r| r.name.as_str())
        .unwrap_or("-");
    let branch = display.current_branch().unwrap_or("-");
    let renderer = display.renderer();

    let lines = vec![
        Line::from(Span::styled(
            "Git history",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Repository: ", Style::default().fg(Color::DarkGray)),
            Span::styled(repo.to_string(), Style::default().fg(Color::Cyan)),
            Span::styled("  Branch: ", Style::default().fg(Color::DarkGray)),
            Span::styled(branch.to_string(), Style::default().fg(Color::Green)),
            Span::styled(
                format!("  ({}/{} commits)", renderer.render_index(), display.commits.len()),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_search(frame: &mut Frame, area: Rect, ctx: &ViewContext) {
    let editing = ctx.mode == AppMode::Search;
    let (text, style) = if editing {
        (ctx.search_input, Style::default().fg(Color::Yellow))
    } else if ctx.display.search_text.is_empty() {
        ("Search by author, message or commit ID (/)", Style::default().fg(Color::DarkGray))
    } else {
        (ctx.display.search_text.as_str(), Style::default())
    };

    let block = Block::default()
        .title("Search")
        .borders(Borders::ALL)
        .border_style(if editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        });
    frame.render_widget(Paragraph::new(text).style(style).block(block), area);
}

fn render_table(frame: &mut Frame, area: Rect, display: &DisplayState) {
    let block = Block::default().title("Commits").borders(Borders::ALL);
    let rows = display.renderer().rows();

    if rows.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No commits found.",
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let height = table_viewport_height(area);
    let start = display.scroll_offset.min(rows.len().saturating_sub(1));
    let end = (start + height).min(rows.len());

    let table_rows = rows[start..end].iter().enumerate().map(|(i, row)| {
        let style = if start + i == display.selected_row {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(row.date.clone()),
            Cell::from(row.author.clone()),
            Cell::from(row.message.clone()),
            Cell::from(Span::styled(row.short_hash.clone(), Style::default().fg(Color::DarkGray))),
        ])
        .style(style)
    });

    let header = Row::new(vec!["Date", "Author", "Message", "Commit ID"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let table = Table::new(
        table_rows,
        [
            Constraint::Length(19),
            Constraint::Length(18),
            Constraint::Min(20),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(block);

    frame.render_widget(table, area);
}

fn render_files(frame: &mut Frame, area: Rect, display: &DisplayState) {
    let block = Block::default().title("Files").borders(Borders::ALL);

    let lines: Vec<Line> = match display
        .selected_commit_id()
        .and_then(|id| display.files.get(id))
    {
        None => vec![Line::from(Span::styled(
            "Press Enter to view files",
            Style::default().fg(Color::DarkGray),
        ))],
        Some(FilesEntry::Loading) => vec![Line::from("Loading...")],
        Some(FilesEntry::Error(error)) => vec![Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        ))],
        Some(FilesEntry::Files(files)) if files.is_empty() => vec![Line::from(Span::styled(
            "No files changed.",
            Style::default().add_modifier(Modifier::ITALIC),
        ))],
        Some(FilesEntry::Files(files)) => files.iter().map(|f| Line::from(f.as_str())).collect(),
    };

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_status(frame: &mut Frame, area: Rect, ctx: &ViewContext) {
    let line = if let Some(error) = &ctx.display.error {
        Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red)))
    } else if let Some(status) = ctx.status {
        Line::from(Span::styled(status.to_string(), Style::default().fg(Color::Yellow)))
    } else {
        Line::from(Span::styled(
            "q quit  / search  Enter files  R repository  B branch  r refresh",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_picker(frame: &mut Frame, title: &str, labels: &[String], selected: usize) {
    let area = centered_rect(60, 50, frame.area());
    let items: Vec<ListItem> = labels.iter().map(|l| ListItem::new(l.as_str())).collect();
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow));
    let mut state = ListState::default().with_selected(Some(selected));

    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
