use crate::ai::build_llm_http_client;
use crate::ai::types::{AskRequest, AskResponse, LlmError, LlmProvider};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

/// Gemini 的 generateContent 接口。密钥放在查询串里而不是请求头。
#[derive(Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key =
            std::env::var("GEMINI_API_KEY").map_err(|_| LlmError::MissingEnv("GEMINI_API_KEY"))?;
        Self::new(api_key)
    }

    pub fn new(api_key: String) -> Result<Self, LlmError> {
        let base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1".to_string());
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-pro".to_string());
        Ok(Self {
            client: build_llm_http_client()?,
            api_key,
            base_url,
            model,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn ask(&self, req: AskRequest) -> Result<AskResponse, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );
        let body = serde_json::json!({
            "contents": [
                {"parts": [{"text": req.question}]}
            ]
        });

        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            // 错误里不带 URL，密钥在查询串里
            .map_err(|e| LlmError::Http(e.without_url().to_string()))?;

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
        let text = extract_gemini_text(&v).ok_or_else(|| {
            LlmError::InvalidResponse(format!("missing candidates[0] content, raw={raw}"))
        })?;

        Ok(AskResponse {
            text,
            raw: Some(raw),
        })
    }
}

/// 取 candidates[0].content.parts[*].text，多个 part 用换行拼接。
/// 兼容 content 直接是字符串的旧返回。
pub fn extract_gemini_text(v: &Value) -> Option<String> {
    let content = v
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c0| c0.get("content"))?;

    match content {
        Value::String(s) => Some(s.clone()),
        _ => {
            let parts = content.get("parts")?.as_array()?;
            let texts: Vec<String> = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()).map(|s| s.to_string()))
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n"))
            }
        }
    }
}
