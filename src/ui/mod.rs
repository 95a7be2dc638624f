use crate::ai::{AskTarget, ProviderKind};
use crate::app_state::{App, FocusArea, InputMode, PaneStatus};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    // 创建布局
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(3), // 顶部标题栏
            Constraint::Min(0),    // 中间内容区域
            Constraint::Min(8),    // 底部命令/日志区域
        ])
        .split(f.size());

    render_top_bar(f, chunks[0]);

    // 中间内容区域（左侧目标菜单 + 三个回答面板）
    let middle_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(0)])
        .split(chunks[1]);

    render_target_menu(f, middle_chunks[0], app);
    render_panes(f, middle_chunks[1], app);

    render_bottom_bar(f, chunks[2], app);
}

fn render_top_bar(f: &mut Frame, area: Rect) {
    let title = Block::default()
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Cyan));

    let title_text = Line::from(vec![
        Span::styled(
            " Code Council ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" - 三方 AI 问答对比"),
    ]);

    let paragraph = Paragraph::new(title_text)
        .block(title)
        .alignment(ratatui::layout::Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_target_menu(f: &mut Frame, area: Rect, app: &App) {
    let menu_items: Vec<ListItem> = ["全部提问", "ChatGPT", "DeepSeek", "Gemini"]
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let is_selected = i == app.menu_selected_index;
            let is_active = match (i, app.target) {
                (0, AskTarget::All) => true,
                (i, AskTarget::One(kind)) if i > 0 => kind.index() + 1 == i,
                _ => false,
            };

            let style = if is_selected {
                // 光标所在的菜单项
                if app.focus_area == FocusArea::Menu {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                }
            } else if is_active {
                // 当前生效的提问目标
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };

            let prefix = if is_active { "● " } else { "○ " };
            ListItem::new(format!("{}{}", prefix, text)).style(style)
        })
        .collect();

    let title = if app.focus_area == FocusArea::Menu {
        "目标 (Enter/c 确认)"
    } else {
        "目标 (← 切换)"
    };

    let menu =
        List::new(menu_items).block(Block::default().borders(Borders::ALL).title(title).style(
            if app.focus_area == FocusArea::Menu {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            },
        ));

    f.render_widget(menu, area);
}

fn render_panes(f: &mut Frame, area: Rect, app: &App) {
    let pane_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(area);

    for kind in ProviderKind::ALL {
        render_pane(f, pane_chunks[kind.index()], app, kind);
    }
}

fn render_pane(f: &mut Frame, area: Rect, app: &App, kind: ProviderKind) {
    let pane = &app.panes[kind.index()];
    let is_focused = app.focus_area == FocusArea::MainView && app.focused_pane == kind.index();

    let (glyph, glyph_color) = match pane.status {
        PaneStatus::Idle => ("○", Color::Gray),
        PaneStatus::Thinking => ("▶", Color::Cyan),
        PaneStatus::Answered(_) => ("✓", Color::Green),
        PaneStatus::Failed(_) => ("✗", Color::Red),
    };

    let title = if is_focused {
        format!("{} {} (↑↓ 滚动)", glyph, kind.label())
    } else {
        format!("{} {}", glyph, kind.label())
    };

    let content: Vec<Line> = match &pane.status {
        PaneStatus::Idle => vec![Line::from(Span::styled(
            "等待提问…（/ 进入命令模式，ask <问题>）",
            Style::default().fg(Color::DarkGray),
        ))],
        PaneStatus::Thinking => {
            // 打字指示器：用 tick 驱动的点号动画
            let dots = match app.tick % 4 {
                0 => "·",
                1 => "··",
                2 => "···",
                _ => " ··",
            };
            vec![Line::from(vec![
                Span::styled(
                    format!("{} 正在输入 ", kind.label()),
                    Style::default()
                        .fg(Color::Gray)
                        .add_modifier(Modifier::ITALIC),
                ),
                Span::styled(dots, Style::default().fg(glyph_color)),
            ])]
        }
        PaneStatus::Answered(text) => text.lines().map(|l| Line::from(l.to_string())).collect(),
        PaneStatus::Failed(error) => vec![Line::from(Span::styled(
            format!("✗ 请求失败: {}", error),
            Style::default().fg(Color::Red),
        ))],
    };

    let paragraph = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title(title).style(
            if is_focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            },
        ))
        .wrap(Wrap { trim: false })
        .scroll((pane.scroll, 0));

    f.render_widget(paragraph, area);
}

fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let bottom_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    // 命令输入区域
    let command_prompt = if app.input_mode == InputMode::Command {
        let mut spans = vec![Span::styled(
            "命令: ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )];
        // 光标是字符下标，切分前先换算成字节边界
        let (left, right) = app.command_input.split_at(app.cursor_byte_offset());
        spans.push(Span::raw(left));
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(right));

        // 如果有建议，添加浅灰色幽灵文本
        if let Some(hint) = app.get_completion_hint() {
            spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
        }

        vec![
            Line::from(spans),
            Line::from("Enter执行 Esc取消 Tab补全 ←→光标 Home/End ↑历史 ↓下一条"),
        ]
    } else {
        vec![
            Line::from(vec![
                Span::styled("命令: ", Style::default().fg(Color::Yellow)),
                Span::raw(format!(
                    "(按 / 进入命令模式)  当前目标: {}",
                    app.target.label()
                )),
            ]),
            Line::from("/命令 f切目标 e示例 x清空 1/2/3选面板 Tab轮换 ↑↓滚动 q退出"),
        ]
    };
    let command_paragraph = Paragraph::new(command_prompt).block(
        Block::default()
            .borders(Borders::ALL)
            .title(if app.input_mode == InputMode::Command {
                "命令输入模式"
            } else {
                "命令输入"
            })
            .style(if app.input_mode == InputMode::Command {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            }),
    );
    f.render_widget(command_paragraph, bottom_chunks[0]);

    // 日志区域 - 最新的在顶部，最多 20 条
    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        .rev()
        .take(20)
        .map(|msg| {
            let style = if msg.starts_with('✓') {
                Style::default().fg(Color::Green)
            } else if msg.starts_with('✗') {
                Style::default().fg(Color::Red)
            } else if msg.starts_with('⚠') {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(msg.as_str()).style(style)
        })
        .collect();

    let log = List::new(log_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("日志 (共 {} 条)", app.log_messages.len()))
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(log, bottom_chunks[1]);
}
