use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tokio::sync::mpsc;

use code_council::ai::{AskTarget, CouncilMode};
use code_council::app_state::{App, AppEvent};
use code_council::commands::AppCommand;
use code_council::council::CouncilService;
use code_council::keystore::{mask_key, KeyStore};
use code_council::ui::draw;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> io::Result<()> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_dir = std::path::PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(format!("council-{}.log", ts));
    let log_file = std::fs::File::create(log_path)?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file))) // 重定向输出到文件，别污染 TUI
        .filter_level(log::LevelFilter::Warn)
        .filter_module("code_council", log::LevelFilter::Info)
        .init();

    // 加载环境变量
    let mut startup_info = Vec::new();
    if code_council::load_env_file(&mut startup_info) {
        startup_info.push("✓ 已加载 .env 环境变量".to_string());
    }

    // 运行模式
    let mode = CouncilMode::from_env();
    startup_info.push(format!("提问模式: {}", mode.label()));

    // 本地密钥存储（localStorage 的终端版）
    let keys_path = KeyStore::default_path();
    let store = match KeyStore::load(&keys_path) {
        Ok(store) => {
            startup_info.push(format!("密钥文件: {}", keys_path.display()));
            store
        }
        Err(e) => {
            // 损坏的密钥文件不致命：提示后按空存储继续，不覆盖原文件
            startup_info.push(format!("✗ 密钥文件损坏，按空存储继续: {}", e));
            KeyStore::empty(&keys_path)
        }
    };
    if mode == CouncilMode::Direct {
        startup_info.push("密钥状态:".to_string());
        startup_info.extend(store.describe());
    }

    // 创建核心 Channel
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<AppCommand>();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<AppEvent>();

    // 启动单后台任务模型 (Actor)：持有密钥存储和议会服务
    let evt_tx_bg = evt_tx.clone();
    tokio::spawn(async move {
        let service = CouncilService::new(mode, evt_tx_bg.clone());
        let mut store = store;
        let mut target = AskTarget::All;

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                AppCommand::Ask { question } => {
                    service.ask(&store, &question, target);
                }
                AppCommand::Use { target: t } => {
                    target = t;
                }
                AppCommand::SetKey { provider, key } => {
                    store.set(provider, &key);
                    match store.save() {
                        Ok(()) => {
                            let _ = evt_tx_bg.send(AppEvent::Message(format!(
                                "✓ 已保存 {} 密钥 {}",
                                provider.label(),
                                mask_key(&key)
                            )));
                        }
                        Err(e) => {
                            let _ = evt_tx_bg
                                .send(AppEvent::Error(format!("保存密钥失败: {}", e)));
                        }
                    }
                }
                AppCommand::ListKeys => {
                    let _ = evt_tx_bg.send(AppEvent::Message("密钥状态:".to_string()));
                    for line in store.describe() {
                        let _ = evt_tx_bg.send(AppEvent::Message(line));
                    }
                }
                AppCommand::Mode => {
                    let _ = evt_tx_bg.send(AppEvent::Message(format!(
                        "当前模式: {}",
                        service.mode().label()
                    )));
                }
                AppCommand::Help => {
                    let _ = evt_tx_bg.send(AppEvent::Message(
                        "可用命令: ask <问题> | use <all|chatgpt|deepseek|gemini> | key <成员> <密钥> | keys | mode | clear | example | help | quit"
                            .to_string(),
                    ));
                }
                AppCommand::Unknown(msg) => {
                    let _ = evt_tx_bg.send(AppEvent::Error(msg));
                }
                // Quit/Clear/Example 在 App 内本地处理，不会走到这里
                AppCommand::Quit | AppCommand::Clear | AppCommand::Example => {}
            }
        }
    });

    // TUI 初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 创建 App 状态
    let mut app = App::new(startup_info, cmd_tx, evt_rx);

    // 主循环
    let rx = app.evt_rx.take().unwrap();
    let res = run_app_loop(&mut terminal, &mut app, rx).await;

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

async fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut evt_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        app.tick = app.tick.wrapping_add(1); // 驱动打字指示器动画
        terminal.draw(|f| draw(f, app))?;

        while let Ok(event) = evt_rx.try_recv() {
            app.apply_event(event);
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if app.handle_key_event(key.code) {
                        return Ok(());
                    }
                }
            }
        }
    }
}
