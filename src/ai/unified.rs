use crate::ai::types::{AskRequest, AskResponse, LlmError, LlmProvider, ProviderKind};
use crate::ai::{ChatGptProvider, DeepSeekProvider, GeminiProvider, MockProvider, RelayProvider};
use crate::keystore::KeyStore;
use async_trait::async_trait;

/// 运行模式：对应仓库历史上的三种实现路线。
/// Direct  —— 客户端直连供应商（密钥在本地）
/// Relay   —— 走持有密钥的中继端点
/// Mock    —— 不联网，延迟后返回编造文本
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CouncilMode {
    Direct,
    Relay(String),
    Mock,
}

impl CouncilMode {
    pub fn from_env() -> Self {
        let which = std::env::var("COUNCIL_MODE")
            .unwrap_or_else(|_| "direct".to_string())
            .to_lowercase();
        match which.as_str() {
            "relay" => {
                let base = std::env::var("RELAY_BASE_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8787".to_string());
                CouncilMode::Relay(base)
            }
            "mock" | "offline" => CouncilMode::Mock,
            _ => CouncilMode::Direct,
        }
    }

    pub fn label(&self) -> String {
        match self {
            CouncilMode::Direct => "direct（客户端直连）".to_string(),
            CouncilMode::Relay(base) => format!("relay（中继 {}）", base),
            CouncilMode::Mock => "mock（离线演示）".to_string(),
        }
    }
}

#[derive(Clone)]
pub enum InnerProvider {
    ChatGpt(ChatGptProvider),
    DeepSeek(DeepSeekProvider),
    Gemini(GeminiProvider),
    Relay(RelayProvider),
    Mock(MockProvider),
}

#[derive(Clone)]
pub struct AnyProvider {
    inner: InnerProvider,
}

impl AnyProvider {
    /// 按当前模式为某个成员构造供应商。
    /// 直连模式下密钥优先取本地存储，其次取环境变量。
    pub fn for_kind(
        kind: ProviderKind,
        mode: &CouncilMode,
        store: &KeyStore,
    ) -> Result<Self, LlmError> {
        let inner = match mode {
            CouncilMode::Mock => InnerProvider::Mock(MockProvider::new(kind)),
            CouncilMode::Relay(base) => {
                InnerProvider::Relay(RelayProvider::new(kind, base.clone())?)
            }
            CouncilMode::Direct => match kind {
                ProviderKind::ChatGpt => InnerProvider::ChatGpt(match store.get(kind) {
                    Some(key) => ChatGptProvider::new(key)?,
                    None => ChatGptProvider::from_env()?,
                }),
                ProviderKind::DeepSeek => InnerProvider::DeepSeek(match store.get(kind) {
                    Some(key) => DeepSeekProvider::new(key)?,
                    None => DeepSeekProvider::from_env()?,
                }),
                ProviderKind::Gemini => InnerProvider::Gemini(match store.get(kind) {
                    Some(key) => GeminiProvider::new(key)?,
                    None => GeminiProvider::from_env()?,
                }),
            },
        };
        Ok(Self { inner })
    }
}

#[async_trait]
impl LlmProvider for AnyProvider {
    async fn ask(&self, req: AskRequest) -> Result<AskResponse, LlmError> {
        match &self.inner {
            InnerProvider::ChatGpt(p) => p.ask(req).await,
            InnerProvider::DeepSeek(p) => p.ask(req).await,
            InnerProvider::Gemini(p) => p.ask(req).await,
            InnerProvider::Relay(p) => p.ask(req).await,
            InnerProvider::Mock(p) => p.ask(req).await,
        }
    }
}
