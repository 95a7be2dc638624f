use crate::ai::build_llm_http_client;
use crate::ai::types::{AskRequest, AskResponse, LlmError, LlmProvider, ProviderKind};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// 中继端点的请求体：只带一个问题字段。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayQuery {
    pub query: String,
}

/// 中继端点的响应体：成功只有 text，失败只有 error。
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RelayReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 中继模式的客户端：密钥留在 relay 服务端，这里只转发问题。
#[derive(Clone)]
pub struct RelayProvider {
    client: reqwest::Client,
    base_url: String,
    kind: ProviderKind,
}

impl RelayProvider {
    pub fn new(kind: ProviderKind, base_url: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_llm_http_client()?,
            base_url,
            kind,
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/api/{}",
            self.base_url.trim_end_matches('/'),
            self.kind.as_str()
        )
    }
}

#[async_trait]
impl LlmProvider for RelayProvider {
    async fn ask(&self, req: AskRequest) -> Result<AskResponse, LlmError> {
        let body = RelayQuery {
            query: req.question,
        };

        let resp = self
            .client
            .post(self.endpoint())
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
            // 失败体可能不是 JSON（比如网关吐 HTML），尽量取 error 字段
            let msg = serde_json::from_str::<RelayReply>(&raw)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| format!("{} {}", status.as_u16(), raw));
            return Err(LlmError::Http(msg));
        }

        let reply: RelayReply = serde_json::from_str(&raw)
            .map_err(|e| LlmError::InvalidResponse(format!("json parse failed: {e}, raw={raw}")))?;

        let text = reply
            .text
            .ok_or_else(|| LlmError::InvalidResponse(format!("missing text field, raw={raw}")))?;

        Ok(AskResponse {
            text,
            raw: Some(raw),
        })
    }
}
