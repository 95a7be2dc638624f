pub mod ai;
pub mod app_state;
pub mod commands;
pub mod council;
pub mod keystore;
pub mod ui;

pub use app_state::AppEvent;

/// 手动解析 .env 文件（避免 dotenv crate 的递归栈问题）。
/// 返回启动日志行，供 TUI 的日志面板展示。
pub fn load_env_file(info: &mut Vec<String>) -> bool {
    let current_dir = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    info.push(format!("当前工作目录: {}", current_dir.display()));

    let env_path = current_dir.join(".env");
    if !env_path.exists() {
        info.push(format!("⚠ 未找到 .env 文件: {}", env_path.display()));
        info.push("⚠ 尝试从系统环境变量读取".to_string());
        return false;
    }

    match std::fs::read_to_string(&env_path) {
        Ok(content) => {
            info.push(format!("✓ 读取 .env 文件: {}", env_path.display()));
            let mut loaded = false;
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some(equal_pos) = line.find('=') {
                    let key = line[..equal_pos].trim();
                    let value = line[equal_pos + 1..].trim();
                    let value = value.trim_matches(|c| c == '"' || c == '\'');
                    std::env::set_var(key, value);
                    loaded = true;
                }
            }
            loaded
        }
        Err(_) => {
            info.push("⚠ 无法读取 .env 文件".to_string());
            false
        }
    }
}
