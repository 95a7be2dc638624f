use crate::ai::chatgpt::extract_chat_text;
use crate::ai::types::{AskRequest, AskResponse, LlmError, LlmProvider};
use crate::ai::{build_llm_http_client, split_api_keys};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// DeepSeek 走同一套 chat/completions 协议，只是端点和模型不同。
#[derive(Clone)]
pub struct DeepSeekProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    api_keys: Vec<String>,
    index: Arc<AtomicUsize>,
}

impl DeepSeekProvider {
    pub fn from_env() -> Result<Self, LlmError> {
        let api_keys = split_api_keys(std::env::var("DEEPSEEK_API_KEYS").ok());
        let api_key = if api_keys.is_empty() {
            std::env::var("DEEPSEEK_API_KEY")
                .map_err(|_| LlmError::MissingEnv("DEEPSEEK_API_KEY"))?
        } else {
            api_keys[0].clone()
        };
        let mut p = Self::new(api_key)?;
        p.api_keys = api_keys;
        Ok(p)
    }

    pub fn new(api_key: String) -> Result<Self, LlmError> {
        let base_url = std::env::var("DEEPSEEK_BASE_URL")
            .unwrap_or_else(|_| "https://api.deepseek.com".to_string());
        let model =
            std::env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string());
        Ok(Self {
            client: build_llm_http_client()?,
            api_key,
            base_url,
            model,
            api_keys: Vec::new(),
            index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn next_key(&self) -> String {
        if self.api_keys.is_empty() {
            self.api_key.clone()
        } else {
            let i = self.index.fetch_add(1, Ordering::Relaxed);
            self.api_keys[i % self.api_keys.len()].clone()
        }
    }
}

#[async_trait]
impl LlmProvider for DeepSeekProvider {
    async fn ask(&self, req: AskRequest) -> Result<AskResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": req.question}
            ],
            "max_tokens": req.max_tokens
        });

        let resp = self
            .client
            .post(url)
            .bearer_auth(self.next_key())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(LlmError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => return Err(LlmError::RateLimited),
            _ => {}
        }

        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Http(format!("{} {}", status.as_u16(), raw)));
        }

        let v: Value = serde_json::from_str(&raw)
            .map_err(|e| LlmError::InvalidResponse(format!("json parse failed: {e}, raw={raw}")))?;
        let text = extract_chat_text(&v)
            .ok_or_else(|| LlmError::InvalidResponse(format!("missing choices[0] content, raw={raw}")))?;

        Ok(AskResponse {
            text,
            raw: Some(raw),
        })
    }
}
