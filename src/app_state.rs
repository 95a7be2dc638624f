use crate::ai::{AskTarget, ProviderKind};
use crate::commands::app_command::EXAMPLE_QUESTION;
use crate::commands::AppCommand;
use crossterm::event::KeyCode;
use std::str::FromStr;
use tokio::sync::mpsc;

#[derive(PartialEq, Debug, Clone)]
pub enum InputMode {
    Normal,
    Command,
}

#[derive(PartialEq, Debug, Clone)]
pub enum FocusArea {
    Menu,     // 焦点在左侧目标菜单
    MainView, // 焦点在回答面板
}

/// 单个回答面板的状态。
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PaneStatus {
    #[default]
    Idle,
    /// 请求在途，渲染打字指示器
    Thinking,
    Answered(String),
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct Pane {
    pub status: PaneStatus,
    pub scroll: u16,
}

#[derive(Debug)]
pub enum AppEvent {
    Log(String),
    Message(String),
    Error(String),
    Thinking(ProviderKind),
    Answer { kind: ProviderKind, text: String },
    AnswerFailed { kind: ProviderKind, error: String },
}

pub struct App {
    pub input_mode: InputMode,
    pub focus_area: FocusArea,
    pub menu_selected_index: usize,
    pub target: AskTarget,
    pub panes: [Pane; 3],
    pub focused_pane: usize,
    pub tick: u64,
    pub command_input: String,
    pub command_cursor: usize,
    pub command_history: Vec<String>,
    pub command_history_index: Option<usize>,
    pub log_messages: Vec<String>,
    pub cmd_tx: mpsc::UnboundedSender<AppCommand>,
    pub evt_rx: Option<mpsc::UnboundedReceiver<AppEvent>>, // Option so the loop can take it out
}

impl App {
    pub fn new(
        startup_info: Vec<String>,
        cmd_tx: mpsc::UnboundedSender<AppCommand>,
        evt_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> App {
        let mut log_messages = vec!["应用已启动".to_string()];
        log_messages.extend(startup_info);

        App {
            input_mode: InputMode::Normal,
            focus_area: FocusArea::Menu,
            menu_selected_index: 0,
            target: AskTarget::All,
            panes: Default::default(),
            focused_pane: 0,
            tick: 0,
            command_input: String::new(),
            command_cursor: 0,
            command_history: Vec::new(),
            command_history_index: None,
            log_messages,
            cmd_tx,
            evt_rx: Some(evt_rx),
        }
    }

    pub fn add_log(&mut self, msg: String) {
        self.log_messages.push(msg);
    }

    /// 光标按字符计数；编辑和渲染前换算成字节偏移，
    /// 否则输入中文等多字节字符会切在字符中间直接 panic。
    pub fn cursor_byte_offset(&self) -> usize {
        byte_offset(&self.command_input, self.command_cursor)
    }

    fn input_char_count(&self) -> usize {
        self.command_input.chars().count()
    }

    /// 把后台事件落到 UI 状态上。
    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Log(msg) | AppEvent::Message(msg) => self.log_messages.push(msg),
            AppEvent::Error(msg) => self.log_messages.push(format!("✗ {}", msg)),
            AppEvent::Thinking(kind) => {
                let pane = &mut self.panes[kind.index()];
                pane.status = PaneStatus::Thinking;
                pane.scroll = 0;
            }
            AppEvent::Answer { kind, text } => {
                let pane = &mut self.panes[kind.index()];
                pane.status = PaneStatus::Answered(text);
                pane.scroll = 0;
                self.log_messages.push(format!("✓ {} 已回答", kind.label()));
            }
            AppEvent::AnswerFailed { kind, error } => {
                let pane = &mut self.panes[kind.index()];
                pane.status = PaneStatus::Failed(error.clone());
                pane.scroll = 0;
                self.log_messages
                    .push(format!("✗ {} 失败: {}", kind.label(), error));
            }
        }
    }

    /// 清空三个面板和输入框（对应原页面的 Clear 按钮）。
    pub fn clear_panes(&mut self) {
        self.panes = Default::default();
        self.command_input.clear();
        self.command_cursor = 0;
    }

    /// 获取当前的补全建议。
    pub fn get_completion_hint(&self) -> Option<String> {
        let commands = vec![
            "ask", "use", "clear", "example", "key", "keys", "mode", "help", "quit",
        ];
        let input = self.command_input.trim_start();

        if input.is_empty() {
            return None;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.len() == 1 && !input.ends_with(' ') {
            for cmd in commands {
                if cmd.starts_with(parts[0]) && cmd != parts[0] {
                    return Some(cmd[parts[0].len()..].to_string());
                }
            }
            return None;
        }

        match parts[0] {
            "use" => {
                let subs = ["all", "chatgpt", "deepseek", "gemini"];
                let cur = parts.get(1).copied().unwrap_or("");
                for s in subs {
                    if s.starts_with(cur) && s != cur {
                        return Some(s[cur.len()..].to_string());
                    }
                }
                None
            }
            "key" => {
                let subs = ["chatgpt", "deepseek", "gemini"];
                let cur = parts.get(1).copied().unwrap_or("");
                for s in subs {
                    if s.starts_with(cur) && s != cur {
                        return Some(s[cur.len()..].to_string());
                    }
                }
                None
            }
            _ => None,
        }
    }

    /// f 键循环切换提问目标（类似原页面顶部的 AI 按钮组）。
    pub fn cycle_target(&mut self) {
        self.target = match self.target {
            AskTarget::All => AskTarget::One(ProviderKind::ChatGpt),
            AskTarget::One(ProviderKind::ChatGpt) => AskTarget::One(ProviderKind::DeepSeek),
            AskTarget::One(ProviderKind::DeepSeek) => AskTarget::One(ProviderKind::Gemini),
            AskTarget::One(ProviderKind::Gemini) => AskTarget::All,
        };
        self.sync_menu_to_target();
        self.forward_target();
    }

    fn sync_menu_to_target(&mut self) {
        self.menu_selected_index = match self.target {
            AskTarget::All => 0,
            AskTarget::One(kind) => kind.index() + 1,
        };
    }

    fn set_target_from_menu(&mut self) {
        self.target = match self.menu_selected_index {
            0 => AskTarget::All,
            i => AskTarget::One(ProviderKind::ALL[i - 1]),
        };
        self.forward_target();
    }

    // 目标同时保存在 App（菜单高亮）和后台 actor（实际分发），Use 命令两边同步
    fn forward_target(&mut self) {
        let _ = self.cmd_tx.send(AppCommand::Use {
            target: self.target,
        });
        self.add_log(format!("提问目标: {}", self.target.label()));
    }

    fn fill_example(&mut self) {
        self.input_mode = InputMode::Command;
        self.command_input = format!("ask {}", EXAMPLE_QUESTION);
        self.command_cursor = self.input_char_count();
    }

    /// 返回 true 表示应退出应用（quit 命令和 q 键走同一条路）。
    fn submit_command(&mut self) -> bool {
        let cmd_owned = self.command_input.trim().to_string();
        if cmd_owned.is_empty() {
            self.command_input.clear();
            self.command_cursor = 0;
            self.input_mode = InputMode::Normal;
            return false;
        }

        self.command_history.push(cmd_owned.clone());
        self.command_history_index = None;
        self.command_input.clear();
        self.command_cursor = 0;
        self.input_mode = InputMode::Normal;

        match AppCommand::from_str(&cmd_owned) {
            Ok(AppCommand::Quit) => return true,
            Ok(AppCommand::Use { target }) => {
                self.target = target;
                self.sync_menu_to_target();
                self.forward_target();
            }
            Ok(AppCommand::Clear) => {
                self.clear_panes();
                self.add_log("已清空回答面板".to_string());
            }
            Ok(AppCommand::Example) => {
                self.fill_example();
            }
            Ok(AppCommand::Unknown(msg)) => {
                self.add_log(format!("✗ {}", msg));
            }
            Ok(cmd) => {
                let _ = self.cmd_tx.send(cmd);
            }
            Err(_) => {
                let _ = self.cmd_tx.send(AppCommand::Unknown(cmd_owned));
            }
        }
        false
    }

    pub fn handle_key_event(&mut self, key: KeyCode) -> bool {
        if self.input_mode == InputMode::Command {
            match key {
                KeyCode::Enter => {
                    return self.submit_command();
                }
                KeyCode::Esc => {
                    self.command_input.clear();
                    self.command_cursor = 0;
                    self.input_mode = InputMode::Normal;
                    return false;
                }
                KeyCode::Tab => {
                    if let Some(hint) = self.get_completion_hint() {
                        let insert = format!("{} ", hint);
                        let at = self.cursor_byte_offset();
                        self.command_input.insert_str(at, &insert);
                        self.command_cursor += insert.chars().count();
                    }
                    return false;
                }
                KeyCode::Up => {
                    if self.command_history.is_empty() {
                        return false;
                    }
                    let next = match self.command_history_index {
                        None => self.command_history.len().saturating_sub(1),
                        Some(i) => i.saturating_sub(1),
                    };
                    self.command_history_index = Some(next);
                    if let Some(cmd) = self.command_history.get(next) {
                        self.command_input = cmd.clone();
                        self.command_cursor = self.input_char_count();
                    }
                    return false;
                }
                KeyCode::Down => {
                    if self.command_history.is_empty() {
                        return false;
                    }
                    let next = match self.command_history_index {
                        None => return false,
                        Some(i) => {
                            let n = i + 1;
                            if n >= self.command_history.len() {
                                self.command_history_index = None;
                                self.command_input.clear();
                                self.command_cursor = 0;
                                return false;
                            }
                            n
                        }
                    };
                    self.command_history_index = Some(next);
                    if let Some(cmd) = self.command_history.get(next) {
                        self.command_input = cmd.clone();
                        self.command_cursor = self.input_char_count();
                    }
                    return false;
                }
                KeyCode::Backspace => {
                    if self.command_cursor > 0 {
                        let idx = byte_offset(&self.command_input, self.command_cursor - 1);
                        self.command_input.remove(idx);
                        self.command_cursor -= 1;
                    }
                    return false;
                }
                KeyCode::Delete => {
                    if self.command_cursor < self.input_char_count() {
                        let idx = self.cursor_byte_offset();
                        self.command_input.remove(idx);
                    }
                    return false;
                }
                KeyCode::Left => {
                    if self.command_cursor > 0 {
                        self.command_cursor -= 1;
                    }
                    return false;
                }
                KeyCode::Right => {
                    if self.command_cursor < self.input_char_count() {
                        self.command_cursor += 1;
                    }
                    return false;
                }
                KeyCode::Home => {
                    self.command_cursor = 0;
                    return false;
                }
                KeyCode::End => {
                    self.command_cursor = self.input_char_count();
                    return false;
                }
                KeyCode::Char(c) => {
                    let at = self.cursor_byte_offset();
                    self.command_input.insert(at, c);
                    self.command_cursor += 1;
                    return false;
                }
                _ => return false,
            }
        }

        // 正常模式下的按键处理
        match key {
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Command;
                self.command_input.clear();
                self.command_cursor = 0;
                false
            }
            KeyCode::Char('q') => {
                true // 退出应用
            }
            KeyCode::Left => {
                self.focus_area = FocusArea::Menu;
                false
            }
            KeyCode::Right => {
                self.focus_area = FocusArea::MainView;
                false
            }
            KeyCode::Tab => {
                if self.focus_area == FocusArea::MainView {
                    self.focused_pane = (self.focused_pane + 1) % 3;
                }
                false
            }
            KeyCode::Char('1') | KeyCode::Char('2') | KeyCode::Char('3') => {
                if let KeyCode::Char(c) = key {
                    self.focus_area = FocusArea::MainView;
                    self.focused_pane = (c as usize - '1' as usize).min(2);
                }
                false
            }
            KeyCode::Up => {
                if self.focus_area == FocusArea::Menu {
                    if self.menu_selected_index > 0 {
                        self.menu_selected_index -= 1;
                    }
                } else {
                    let pane = &mut self.panes[self.focused_pane];
                    pane.scroll = pane.scroll.saturating_sub(1);
                }
                false
            }
            KeyCode::Down => {
                if self.focus_area == FocusArea::Menu {
                    let menu_items_count = 4; // 全部 + 三个成员
                    if self.menu_selected_index < menu_items_count - 1 {
                        self.menu_selected_index += 1;
                    }
                } else {
                    let pane = &mut self.panes[self.focused_pane];
                    pane.scroll = pane.scroll.saturating_add(1);
                }
                false
            }
            KeyCode::Enter | KeyCode::Char('c') => {
                if self.focus_area == FocusArea::Menu {
                    self.set_target_from_menu();
                    // 确认后自动切换焦点到回答面板
                    self.focus_area = FocusArea::MainView;
                }
                false
            }
            KeyCode::Char('f') => {
                self.cycle_target();
                false
            }
            KeyCode::Char('e') => {
                self.fill_example();
                false
            }
            KeyCode::Char('x') => {
                self.clear_panes();
                false
            }
            _ => false,
        }
    }
}

/// 第 char_idx 个字符的起始字节偏移；越界时取串尾。
fn byte_offset(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (_evt_tx, evt_rx) = mpsc::unbounded_channel();
        (App::new(Vec::new(), cmd_tx, evt_rx), cmd_rx)
    }

    #[test]
    fn thinking_then_answer_updates_the_right_pane() {
        let (mut app, _rx) = test_app();
        app.apply_event(AppEvent::Thinking(ProviderKind::DeepSeek));
        assert_eq!(
            app.panes[ProviderKind::DeepSeek.index()].status,
            PaneStatus::Thinking
        );

        app.apply_event(AppEvent::Answer {
            kind: ProviderKind::DeepSeek,
            text: "回答".to_string(),
        });
        assert_eq!(
            app.panes[ProviderKind::DeepSeek.index()].status,
            PaneStatus::Answered("回答".to_string())
        );
        // 其他面板不受影响
        assert_eq!(app.panes[ProviderKind::ChatGpt.index()].status, PaneStatus::Idle);
        assert_eq!(app.panes[ProviderKind::Gemini.index()].status, PaneStatus::Idle);
    }

    #[test]
    fn one_failure_leaves_other_answers_intact() {
        let (mut app, _rx) = test_app();
        app.apply_event(AppEvent::Answer {
            kind: ProviderKind::ChatGpt,
            text: "ok".to_string(),
        });
        app.apply_event(AppEvent::AnswerFailed {
            kind: ProviderKind::Gemini,
            error: "429".to_string(),
        });
        assert_eq!(
            app.panes[ProviderKind::ChatGpt.index()].status,
            PaneStatus::Answered("ok".to_string())
        );
        assert!(matches!(
            app.panes[ProviderKind::Gemini.index()].status,
            PaneStatus::Failed(_)
        ));
    }

    #[test]
    fn cycle_target_walks_all_then_each_member() {
        let (mut app, mut rx) = test_app();
        assert_eq!(app.target, AskTarget::All);
        app.cycle_target();
        assert_eq!(app.target, AskTarget::One(ProviderKind::ChatGpt));
        app.cycle_target();
        app.cycle_target();
        app.cycle_target();
        assert_eq!(app.target, AskTarget::All);
        // 每次切换都同步给后台
        assert!(matches!(
            rx.try_recv().unwrap(),
            AppCommand::Use { .. }
        ));
    }

    #[test]
    fn completion_hint_distinguishes_key_and_keys() {
        let (mut app, _rx) = test_app();
        app.command_input = "k".to_string();
        assert_eq!(app.get_completion_hint().as_deref(), Some("ey"));
        app.command_input = "use chat".to_string();
        assert_eq!(app.get_completion_hint().as_deref(), Some("gpt"));
    }

    #[test]
    fn multibyte_input_keeps_cursor_on_char_boundaries() {
        let (mut app, _rx) = test_app();
        app.handle_key_event(KeyCode::Char('/'));
        app.handle_key_event(KeyCode::Char('中'));
        app.handle_key_event(KeyCode::Char('a'));
        app.handle_key_event(KeyCode::Char('文'));
        assert_eq!(app.command_input, "中a文");
        assert_eq!(app.command_cursor, 3);

        // 光标左移后在中间插入
        app.handle_key_event(KeyCode::Left);
        app.handle_key_event(KeyCode::Char('问'));
        assert_eq!(app.command_input, "中a问文");

        // 回退删掉的是一个完整字符
        app.handle_key_event(KeyCode::Backspace);
        assert_eq!(app.command_input, "中a文");

        app.handle_key_event(KeyCode::Home);
        app.handle_key_event(KeyCode::Delete);
        assert_eq!(app.command_input, "a文");

        // 渲染路径拿到的字节偏移必须落在字符边界上
        app.handle_key_event(KeyCode::End);
        assert!(app
            .command_input
            .is_char_boundary(app.cursor_byte_offset()));
    }

    #[test]
    fn history_recall_of_chinese_command_keeps_cursor_valid() {
        let (mut app, _rx) = test_app();
        app.handle_key_event(KeyCode::Char('/'));
        for c in "ask 什么是生命周期".chars() {
            app.handle_key_event(KeyCode::Char(c));
        }
        app.handle_key_event(KeyCode::Enter);

        app.handle_key_event(KeyCode::Char('/'));
        app.handle_key_event(KeyCode::Up);
        assert_eq!(app.command_input, "ask 什么是生命周期");
        assert_eq!(app.command_cursor, app.command_input.chars().count());
        // 历史召回后继续编辑不会切在字符中间
        app.handle_key_event(KeyCode::Char('?'));
        assert_eq!(app.command_input, "ask 什么是生命周期?");
    }

    #[test]
    fn quit_command_exits_like_the_q_key() {
        let (mut app, _rx) = test_app();
        app.handle_key_event(KeyCode::Char('/'));
        for c in "quit".chars() {
            app.handle_key_event(KeyCode::Char(c));
        }
        assert!(app.handle_key_event(KeyCode::Enter));

        // exit 别名同样直接退出
        let (mut app2, _rx2) = test_app();
        app2.handle_key_event(KeyCode::Char('/'));
        for c in "exit".chars() {
            app2.handle_key_event(KeyCode::Char(c));
        }
        assert!(app2.handle_key_event(KeyCode::Enter));
    }

    #[test]
    fn example_command_prefills_ask() {
        let (mut app, _rx) = test_app();
        app.command_input = "example".to_string();
        app.submit_command();
        assert_eq!(app.input_mode, InputMode::Command);
        assert!(app.command_input.starts_with("ask "));
        assert!(app.command_input.contains("REST API"));
    }

    #[test]
    fn clear_resets_panes_and_input() {
        let (mut app, _rx) = test_app();
        app.apply_event(AppEvent::Answer {
            kind: ProviderKind::ChatGpt,
            text: "ok".to_string(),
        });
        app.command_input = "half-typed".to_string();
        app.clear_panes();
        assert!(app.panes.iter().all(|p| p.status == PaneStatus::Idle));
        assert!(app.command_input.is_empty());
    }
}
