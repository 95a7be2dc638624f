use anyhow::Context;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::str::FromStr;

use code_council::ai::relay::{RelayQuery, RelayReply};
use code_council::ai::{AnyProvider, AskRequest, CouncilMode, LlmError, LlmProvider, ProviderKind};
use code_council::keystore::KeyStore;

/// 持有密钥的中继服务：浏览器版里的三个 serverless 端点在这里
/// 合并成一个 axum 进程。密钥只从服务端环境变量读取，绝不回显。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut info = Vec::new();
    code_council::load_env_file(&mut info);
    for line in info {
        log::info!("{}", line);
    }

    let bind = std::env::var("RELAY_BIND").unwrap_or_else(|_| "127.0.0.1:8787".to_string());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/:provider", post(ask_provider));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("无法监听 {}", bind))?;
    log::info!("中继服务已启动: http://{}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ask_provider(
    Path(provider): Path<String>,
    Json(body): Json<RelayQuery>,
) -> (StatusCode, Json<RelayReply>) {
    let kind = match ProviderKind::from_str(&provider) {
        Ok(kind) => kind,
        Err(()) => {
            return reply_error(StatusCode::NOT_FOUND, format!("unknown provider: {}", provider))
        }
    };

    let query = body.query.trim();
    if query.is_empty() {
        return reply_error(StatusCode::BAD_REQUEST, "No query provided".to_string());
    }

    // 空的本地存储：中继端密钥只认环境变量
    let store = KeyStore::empty("relay-no-keystore");
    let provider = match AnyProvider::for_kind(kind, &CouncilMode::Direct, &store) {
        Ok(p) => p,
        Err(LlmError::MissingEnv(var)) => {
            log::error!("{} 缺少密钥环境变量 {}", kind.label(), var);
            return reply_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{} API key not set", kind.label()),
            );
        }
        Err(e) => {
            return reply_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    match provider.ask(AskRequest::new(query)).await {
        Ok(resp) => {
            log::info!("{} 转发成功, {} 字", kind.label(), resp.text.chars().count());
            (
                StatusCode::OK,
                Json(RelayReply {
                    text: Some(resp.text),
                    error: None,
                }),
            )
        }
        Err(e) => {
            log::warn!("{} 上游失败: {}", kind.label(), e);
            reply_error(StatusCode::BAD_GATEWAY, upstream_error_text(&e))
        }
    }
}

/// 回给调用方的错误只带上游状态码和标准原因短语，
/// 上游响应体（可能很大，也可能含敏感内容）只进服务端日志。
fn upstream_error_text(e: &LlmError) -> String {
    match e {
        LlmError::Unauthorized => "401 Unauthorized".to_string(),
        LlmError::RateLimited => "429 Too Many Requests".to_string(),
        LlmError::Http(msg) => {
            let code = msg
                .split_whitespace()
                .next()
                .and_then(|s| s.parse::<u16>().ok())
                .and_then(|c| StatusCode::from_u16(c).ok());
            match code {
                Some(status) => format!(
                    "{} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Upstream Error")
                ),
                None => "upstream request failed".to_string(),
            }
        }
        _ => "invalid upstream response".to_string(),
    }
}

fn reply_error(status: StatusCode, message: String) -> (StatusCode, Json<RelayReply>) {
    (
        status,
        Json(RelayReply {
            text: None,
            error: Some(message),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(q: &str) -> Json<RelayQuery> {
        Json(RelayQuery {
            query: q.to_string(),
        })
    }

    #[tokio::test]
    async fn empty_query_is_rejected_with_400() {
        let (status, Json(reply)) =
            ask_provider(Path("chatgpt".to_string()), query("   ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.error.as_deref(), Some("No query provided"));
        assert!(reply.text.is_none());
    }

    #[tokio::test]
    async fn unknown_provider_is_404() {
        let (status, Json(reply)) =
            ask_provider(Path("claude".to_string()), query("hello")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(reply.error.unwrap().contains("claude"));
    }

    #[tokio::test]
    async fn missing_server_side_key_is_500() {
        std::env::remove_var("GEMINI_API_KEY");
        let (status, Json(reply)) =
            ask_provider(Path("gemini".to_string()), query("hello")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply.error.as_deref(), Some("Gemini API key not set"));
    }

    #[test]
    fn upstream_error_body_is_never_forwarded() {
        // 上游 4xx/5xx：只回状态码 + 原因短语，不带响应体
        let e = LlmError::Http(
            "404 {\"error\":{\"message\":\"model not found, key sk-secret\"}}".to_string(),
        );
        assert_eq!(upstream_error_text(&e), "404 Not Found");

        assert_eq!(
            upstream_error_text(&LlmError::Unauthorized),
            "401 Unauthorized"
        );
        assert_eq!(
            upstream_error_text(&LlmError::RateLimited),
            "429 Too Many Requests"
        );

        // 连状态码都没有（连接失败之类）给个笼统说法
        let e2 = LlmError::Http("connection refused".to_string());
        assert_eq!(upstream_error_text(&e2), "upstream request failed");

        // 解析失败的原始报文同样不能漏出去
        let e3 = LlmError::InvalidResponse("missing choices[0], raw={secret}".to_string());
        assert_eq!(upstream_error_text(&e3), "invalid upstream response");
    }
}
