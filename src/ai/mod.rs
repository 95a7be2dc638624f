pub mod chatgpt;
pub mod deepseek;
pub mod gemini;
pub mod mock;
pub mod relay;
pub mod types;
pub mod unified;

pub use chatgpt::ChatGptProvider;
pub use deepseek::DeepSeekProvider;
pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use relay::RelayProvider;
pub use types::{AskRequest, AskResponse, AskTarget, LlmError, LlmProvider, ProviderKind};
pub use unified::{AnyProvider, CouncilMode};

pub(crate) fn build_llm_http_client() -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();

    if let Ok(raw) = std::env::var("LLM_PROXY") {
        let t = raw.trim();
        if !t.is_empty() {
            let url = if t.contains("://") {
                t.to_string()
            } else {
                format!("socks5h://{}", t)
            };
            let proxy = reqwest::Proxy::all(&url).map_err(|e| LlmError::Http(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
    }

    builder.build().map_err(|e| LlmError::Http(e.to_string()))
}

/// 按分隔符拆出多把密钥（支持逗号/分号/空白分隔）。
pub(crate) fn split_api_keys(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(|c| c == ',' || c == ';' || c == '\n' || c == '\t' || c == ' ')
            .map(|x| x.trim().to_string())
            .filter(|x| !x.is_empty())
            .collect::<Vec<_>>()
    })
    .unwrap_or_default()
}
