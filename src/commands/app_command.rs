use crate::ai::{AskTarget, ProviderKind};
use std::str::FromStr;

pub const EXAMPLE_QUESTION: &str = "Explain how REST API works with Node.js and Express.";

#[derive(Debug, Clone)]
pub enum AppCommand {
    Ask {
        question: String,
    },
    /// 切换提问目标（全部或单个成员），在 App 内本地处理
    Use {
        target: AskTarget,
    },
    /// 清空三个面板和输入框，在 App 内本地处理
    Clear,
    /// 填入示例问题，在 App 内本地处理
    Example,
    SetKey {
        provider: ProviderKind,
        key: String,
    },
    ListKeys,
    Mode,
    Help,
    Quit,
    Unknown(String),
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0] {
            "ask" => {
                let question = parts[1..].join(" ");
                if question.is_empty() {
                    Ok(AppCommand::Unknown("用法: ask <问题>".to_string()))
                } else {
                    Ok(AppCommand::Ask { question })
                }
            }
            "use" => match parts.get(1).and_then(|t| AskTarget::from_str(t).ok()) {
                Some(target) => Ok(AppCommand::Use { target }),
                None => Ok(AppCommand::Unknown(
                    "用法: use <all|chatgpt|deepseek|gemini>".to_string(),
                )),
            },
            "clear" => Ok(AppCommand::Clear),
            "example" => Ok(AppCommand::Example),
            "key" => {
                let provider = parts.get(1).and_then(|p| ProviderKind::from_str(p).ok());
                let key = parts.get(2).map(|k| k.to_string());
                match (provider, key) {
                    (Some(provider), Some(key)) if !key.is_empty() => {
                        Ok(AppCommand::SetKey { provider, key })
                    }
                    _ => Ok(AppCommand::Unknown(
                        "用法: key <chatgpt|deepseek|gemini> <密钥>".to_string(),
                    )),
                }
            }
            "keys" => Ok(AppCommand::ListKeys),
            "mode" => Ok(AppCommand::Mode),
            "help" => Ok(AppCommand::Help),
            "quit" | "exit" => Ok(AppCommand::Quit),
            _ => Ok(AppCommand::Unknown(format!(
                "未知命令: {}（输入 help 查看可用命令）",
                parts[0]
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_joins_the_rest_of_the_line() {
        match AppCommand::from_str("ask  how does  async work").unwrap() {
            AppCommand::Ask { question } => assert_eq!(question, "how does async work"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn ask_without_question_is_usage_error() {
        assert!(matches!(
            AppCommand::from_str("ask").unwrap(),
            AppCommand::Unknown(_)
        ));
    }

    #[test]
    fn use_accepts_aliases() {
        match AppCommand::from_str("use gpt").unwrap() {
            AppCommand::Use { target } => {
                assert_eq!(target, AskTarget::One(ProviderKind::ChatGpt))
            }
            other => panic!("unexpected: {:?}", other),
        }
        match AppCommand::from_str("use ALL").unwrap() {
            AppCommand::Use { target } => assert_eq!(target, AskTarget::All),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn key_requires_provider_and_value() {
        match AppCommand::from_str("key deepseek sk-123").unwrap() {
            AppCommand::SetKey { provider, key } => {
                assert_eq!(provider, ProviderKind::DeepSeek);
                assert_eq!(key, "sk-123");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            AppCommand::from_str("key deepseek").unwrap(),
            AppCommand::Unknown(_)
        ));
        assert!(matches!(
            AppCommand::from_str("key claude sk-123").unwrap(),
            AppCommand::Unknown(_)
        ));
    }

    #[test]
    fn unknown_command_keeps_the_word() {
        match AppCommand::from_str("frobnicate").unwrap() {
            AppCommand::Unknown(msg) => assert!(msg.contains("frobnicate")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
