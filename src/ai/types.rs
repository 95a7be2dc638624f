use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// 议会的三个成员（外部 AI 供应商）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    ChatGpt,
    DeepSeek,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::ChatGpt,
        ProviderKind::DeepSeek,
        ProviderKind::Gemini,
    ];

    /// 路由/命令中使用的小写标识。
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::ChatGpt => "chatgpt",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// 面板标题中展示的名称。
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::ChatGpt => "ChatGPT",
            ProviderKind::DeepSeek => "DeepSeek",
            ProviderKind::Gemini => "Gemini",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            ProviderKind::ChatGpt => 0,
            ProviderKind::DeepSeek => 1,
            ProviderKind::Gemini => 2,
        }
    }

    /// 直连模式下读取密钥的环境变量名。
    pub fn env_key(&self) -> &'static str {
        match self {
            ProviderKind::ChatGpt => "OPENAI_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chatgpt" | "gpt" | "openai" => Ok(ProviderKind::ChatGpt),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "gemini" => Ok(ProviderKind::Gemini),
            _ => Err(()),
        }
    }
}

/// 一次提问的目标：全部成员或单个成员。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AskTarget {
    All,
    One(ProviderKind),
}

impl AskTarget {
    pub fn members(&self) -> Vec<ProviderKind> {
        match self {
            AskTarget::All => ProviderKind::ALL.to_vec(),
            AskTarget::One(kind) => vec![*kind],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AskTarget::All => "全部",
            AskTarget::One(kind) => kind.label(),
        }
    }
}

impl FromStr for AskTarget {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(AskTarget::All);
        }
        ProviderKind::from_str(s).map(AskTarget::One)
    }
}

#[derive(Clone, Debug)]
pub struct AskRequest {
    pub question: String,
    pub max_tokens: u32,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        let max_tokens = std::env::var("COUNCIL_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);
        Self {
            question: question.into(),
            max_tokens,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AskResponse {
    pub text: String,
    pub raw: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("missing env {0}")]
    MissingEnv(&'static str),
    #[error("http error: {0}")]
    Http(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("rate limited")]
    RateLimited,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn ask(&self, req: AskRequest) -> Result<AskResponse, LlmError>;
}
