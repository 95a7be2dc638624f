use crate::ai::types::{AskRequest, AskResponse, LlmError, LlmProvider};
use crate::ai::{build_llm_http_client, split_api_keys};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct ChatGptProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    api_keys: Vec<String>,
    index: Arc<AtomicUsize>,
}

impl ChatGptProvider {
    pub fn from_env() -> Result<Self, LlmError> {
        let api_keys = split_api_keys(std::env::var("OPENAI_API_KEYS").ok());
        let api_key = if api_keys.is_empty() {
            std::env::var("OPENAI_API_KEY").map_err(|_| LlmError::MissingEnv("OPENAI_API_KEY"))?
        } else {
            api_keys[0].clone()
        };
        let mut p = Self::new(api_key)?;
        p.api_keys = api_keys;
        Ok(p)
    }

    pub fn new(api_key: String) -> Result<Self, LlmError> {
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());
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
impl LlmProvider for ChatGptProvider {
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

/// 从 chat/completions 响应里取正文。
/// 兼容 choices[0].message.content（字符串或 parts 数组）、choices[0].content
/// 和旧式的 choices[0].text。
pub fn extract_chat_text(v: &Value) -> Option<String> {
    let choice0 = v.get("choices").and_then(|c| c.get(0))?;

    let content = choice0
        .get("message")
        .and_then(|m| m.get("content"))
        .or_else(|| choice0.get("content"));

    match content {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(arr)) => {
            let parts: Vec<String> = arr
                .iter()
                .filter_map(|it| {
                    it.get("text")
                        .and_then(|x| x.as_str())
                        .or_else(|| it.as_str())
                        .map(|t| t.to_string())
                })
                .collect();
            Some(parts.join("\n"))
        }
        _ => choice0
            .get("text")
            .and_then(|t| t.as_str())
            .map(|s| s.to_string()),
    }
}
