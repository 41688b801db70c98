//! TUI views and rendering
//!
//! All rendering logic is contained here. Views draw the AppState and never
//! modify it.

use chrono::{DateTime, Local};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use tracing::trace;

use super::state::AppState;
use crate::domain::Task;
use crate::illustrator::DATA_URI_PREFIX;
use crate::state::View;

/// Example goal shown in the empty input box
pub const INPUT_PLACEHOLDER: &str = "例如：我一直在刷视频，想去洗澡睡觉...";

/// Calm palette
mod colors {
    use ratatui::style::Color;

    pub const HEADER: Color = Color::Rgb(120, 150, 120); // Sage
    pub const ACCENT: Color = Color::Rgb(196, 120, 90); // Clay
    pub const DONE: Color = Color::Rgb(110, 170, 110);
    pub const KEYBIND: Color = Color::Rgb(120, 150, 120);
    pub const ERROR: Color = Color::Rgb(200, 80, 80);
    pub const SELECTED_BG: Color = Color::Rgb(45, 45, 40);
    pub const DIM: Color = Color::DarkGray;
}

/// Main render function
pub fn render(state: &AppState, frame: &mut Frame) {
    trace!(view = ?state.view(), "render: called");
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    render_header(state, frame, chunks[0]);

    match state.view() {
        View::Input => render_input_view(state, frame, chunks[1]),
        View::Active => render_active_view(state, frame, chunks[1]),
        View::History => render_history_view(state, frame, chunks[1]),
    }

    render_footer(state, frame, chunks[2]);

    if let Some(notice) = &state.snapshot.notice {
        render_notice(&notice.message, frame, frame.area());
    }
}

fn render_header(state: &AppState, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(
        " MicroStep",
        Style::default().fg(colors::HEADER).add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::styled(" │ ", Style::default().fg(colors::DIM)));

    for (view, name) in [(View::Input, "开始"), (View::Active, "行动"), (View::History, "足迹")] {
        let style = if view == state.view() {
            Style::default().fg(colors::ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors::DIM)
        };
        spans.push(Span::styled(format!(" {} ", name), style));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_input_view(state: &AppState, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let tagline = Paragraph::new(vec![
        Line::from(Span::styled(
            "千里之行，始于足下。",
            Style::default().fg(colors::HEADER).add_modifier(Modifier::BOLD),
        )),
        Line::from("告诉我你想做什么，我们把它变简单。"),
    ])
    .block(Block::default().borders(Borders::NONE));
    frame.render_widget(tagline, chunks[0]);

    let content = if state.snapshot.plan_pending {
        Line::from(vec![
            Span::styled(state.spinner(), Style::default().fg(colors::ACCENT)),
            Span::styled(" 正在拆解...", Style::default().fg(colors::DIM)),
        ])
    } else if state.input.is_empty() {
        Line::from(vec![
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            Span::styled(INPUT_PLACEHOLDER, Style::default().fg(colors::DIM)),
        ])
    } else {
        Line::from(vec![
            Span::raw(state.input.as_str()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ])
    };

    let input = Paragraph::new(content).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" 开始行动 ")
            .border_style(Style::default().fg(colors::ACCENT)),
    );
    frame.render_widget(input, chunks[1]);
}

fn render_active_view(state: &AppState, frame: &mut Frame, area: Rect) {
    let Some(task) = state.active_task() else {
        let empty = Paragraph::new("没有正在进行的任务").style(Style::default().fg(colors::DIM));
        frame.render_widget(empty, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Title + overall encouragement
            Constraint::Length(3), // Progress
            Constraint::Min(0),    // Steps
        ])
        .split(chunks[0]);

    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            task.title(),
            Style::default().fg(colors::HEADER).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(task.overall_encouragement(), Style::default().fg(colors::DIM))),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, left[0]);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" 进度 "))
        .gauge_style(Style::default().fg(colors::DONE))
        .percent(u16::from(task.progress_percent()))
        .label(format!(
            "{}/{}  {}%",
            task.completed_count(),
            task.steps().len(),
            task.progress_percent()
        ));
    frame.render_widget(gauge, left[1]);

    render_steps(state, task, frame, left[2]);
    render_side_panel(task, frame, chunks[1]);
}

fn render_steps(state: &AppState, task: &Task, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = task
        .steps()
        .iter()
        .map(|step| {
            let (mark, text_style) = if step.is_completed() {
                (
                    Span::styled("[✓] ", Style::default().fg(colors::DONE)),
                    Style::default().fg(colors::DIM).add_modifier(Modifier::CROSSED_OUT),
                )
            } else {
                (Span::styled("[ ] ", Style::default().fg(colors::ACCENT)), Style::default())
            };
            ListItem::new(vec![
                Line::from(vec![mark, Span::styled(step.text(), text_style)]),
                Line::from(Span::styled(
                    format!("    {}", step.encouragement()),
                    Style::default().fg(colors::DIM).add_modifier(Modifier::ITALIC),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" 小步骤 "))
        .highlight_style(Style::default().bg(colors::SELECTED_BG));

    let mut list_state = ListState::default().with_selected(Some(state.step_selected));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_side_panel(task: &Task, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(5)])
        .split(area);

    let illustration = match task.image_url() {
        Some(url) => Line::from(Span::styled(
            illustration_label(url),
            Style::default().fg(colors::DONE),
        )),
        None => Line::from(Span::styled("正在为你的行动绘制灵感...", Style::default().fg(colors::DIM))),
    };
    let panel = Paragraph::new(vec![Line::from(""), illustration])
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" 灵感 "));
    frame.render_widget(panel, chunks[0]);

    if task.is_completed() {
        let banner = Paragraph::new(vec![
            Line::from(Span::styled(
                "太棒了！",
                Style::default().fg(colors::ACCENT).add_modifier(Modifier::BOLD),
            )),
            Line::from("你迈出了一大步。休息一下，或者去历史记录看看你的成就。"),
        ])
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors::ACCENT)),
        );
        frame.render_widget(banner, chunks[1]);
    }
}

fn render_history_view(state: &AppState, frame: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" 行动足迹 ");

    if state.snapshot.tasks.is_empty() {
        let empty = Paragraph::new("还没有记录，去迈出第一步吧。")
            .style(Style::default().fg(colors::DIM))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = state
        .snapshot
        .tasks
        .iter()
        .map(|task| {
            let badge = if task.is_completed() {
                Span::styled("✓ 已完成", Style::default().fg(colors::DONE))
            } else {
                Span::styled("继续", Style::default().fg(colors::ACCENT))
            };
            ListItem::new(Line::from(vec![
                Span::styled(format_date(task.created_at()), Style::default().fg(colors::DIM)),
                Span::raw("  "),
                Span::styled(task.title(), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("  {}/{}  ", task.completed_count(), task.steps().len()),
                    Style::default().fg(colors::DIM),
                ),
                badge,
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(colors::SELECTED_BG));
    let mut list_state = ListState::default().with_selected(Some(state.history_selected));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_footer(state: &AppState, frame: &mut Frame, area: Rect) {
    let content = if let Some(error) = &state.error_message {
        Line::from(Span::styled(format!(" {}", error), Style::default().fg(colors::ERROR)))
    } else {
        let keybinds: &[(&str, &str)] = match state.view() {
            View::Input => &[("[Enter]", "开始"), ("[Tab]", "足迹"), ("[Esc]", "清空/退出")],
            View::Active => &[("[j/k]", "移动"), ("[Space]", "完成"), ("[Esc]", "返回"), ("[q]", "退出")],
            View::History => &[("[j/k]", "移动"), ("[Enter]", "继续"), ("[Esc]", "返回"), ("[q]", "退出")],
        };
        let mut spans = Vec::new();
        for (key, label) in keybinds {
            spans.push(Span::styled(format!(" {}", key), Style::default().fg(colors::KEYBIND)));
            spans.push(Span::raw(format!(" {} ", label)));
        }
        Line::from(spans)
    };

    let footer = Paragraph::new(content).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

fn render_notice(message: &str, frame: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 25, area);
    frame.render_widget(Clear, popup);

    let content = vec![
        Line::from(""),
        Line::from(message),
        Line::from(""),
        Line::from(Span::styled("按任意键继续", Style::default().fg(colors::DIM))),
    ];
    let dialog = Paragraph::new(content).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" 提示 ")
            .border_style(Style::default().fg(colors::ERROR)),
    );
    frame.render_widget(dialog, popup);
}

/// Helper to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
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
        .split(popup_layout[1])[1]
}

/// Approximate decoded size of a base64 data URI, in KB
fn image_size_kb(url: &str) -> usize {
    let payload = url.strip_prefix(DATA_URI_PREFIX).unwrap_or(url);
    (payload.len() * 3 / 4).div_ceil(1024)
}

/// Status line for a task that has its illustration
pub fn illustration_label(url: &str) -> String {
    format!("插画已就绪 ({} KB)", image_size_kb(url))
}

/// Local date for an epoch-millis timestamp
pub fn format_date(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
