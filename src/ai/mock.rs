use crate::ai::types::{AskRequest, AskResponse, LlmError, LlmProvider, ProviderKind};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// 离线演示模式：不发任何网络请求，延迟片刻后返回编造的回答。
#[derive(Clone)]
pub struct MockProvider {
    kind: ProviderKind,
    delay_ms: (u64, u64),
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            delay_ms: (600, 1800),
        }
    }

    /// 测试用：固定的短延迟。
    pub fn with_delay_ms(kind: ProviderKind, min: u64, max: u64) -> Self {
        Self {
            kind,
            delay_ms: (min, max),
        }
    }

    fn canned_answer(&self, question: &str) -> String {
        let topic: String = question.chars().take(60).collect();
        match self.kind {
            ProviderKind::ChatGpt => format!(
                "关于「{}」：可以先拆分问题，再分别查阅官方文档验证。\
                 （离线演示回答，未发起真实请求）",
                topic
            ),
            ProviderKind::DeepSeek => format!(
                "「{}」的关键在于理解其底层模型，建议写一个最小可运行示例来观察行为。\
                 （离线演示回答，未发起真实请求）",
                topic
            ),
            ProviderKind::Gemini => format!(
                "针对「{}」，一个常见思路是对比两三种实现方式的取舍后再做选择。\
                 （离线演示回答，未发起真实请求）",
                topic
            ),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn ask(&self, req: AskRequest) -> Result<AskResponse, LlmError> {
        let (min, max) = self.delay_ms;
        let wait = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        tokio::time::sleep(Duration::from_millis(wait)).await;

        Ok(AskResponse {
            text: self.canned_answer(&req.question),
            raw: None,
        })
    }
}
