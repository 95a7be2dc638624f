use crate::ai::{AnyProvider, AskRequest, AskTarget, CouncilMode, LlmProvider};
use crate::app_state::AppEvent;
use crate::keystore::KeyStore;
use tokio::sync::mpsc;

/// 议会服务：把一个问题同时发给选中的成员。
/// 三路调用互不影响：每个成员一个独立任务，各自回填自己的面板。
pub struct CouncilService {
    mode: CouncilMode,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
}

impl CouncilService {
    pub fn new(mode: CouncilMode, evt_tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { mode, evt_tx }
    }

    pub fn mode(&self) -> &CouncilMode {
        &self.mode
    }

    /// 发起一次提问。每个目标成员保证恰好收到一个
    /// Answer 或 AnswerFailed 事件，面板不会停在"输入中"。
    pub fn ask(&self, store: &KeyStore, question: &str, target: AskTarget) {
        let question = question.trim();
        if question.is_empty() {
            let _ = self
                .evt_tx
                .send(AppEvent::Error("请先输入问题再提问".to_string()));
            return;
        }

        log::info!("提问 [{}]: {}", target.label(), question);

        let mut handles = Vec::new();
        for kind in target.members() {
            let provider = match AnyProvider::for_kind(kind, &self.mode, store) {
                Ok(p) => p,
                Err(e) => {
                    // 构造失败（通常是缺密钥）直接落到该面板，不影响其他成员
                    let _ = self.evt_tx.send(AppEvent::AnswerFailed {
                        kind,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let _ = self.evt_tx.send(AppEvent::Thinking(kind));

            let tx = self.evt_tx.clone();
            let req = AskRequest::new(question);
            handles.push(tokio::spawn(async move {
                match provider.ask(req).await {
                    Ok(resp) => {
                        log::info!("{} 回答 {} 字", kind.label(), resp.text.chars().count());
                        let _ = tx.send(AppEvent::Answer {
                            kind,
                            text: resp.text,
                        });
                    }
                    Err(e) => {
                        log::warn!("{} 调用失败: {}", kind.label(), e);
                        let _ = tx.send(AppEvent::AnswerFailed {
                            kind,
                            error: e.to_string(),
                        });
                    }
                }
            }));
        }

        // 等三路都返回后记一条日志（对应原页面的 Promise.all）
        if !handles.is_empty() {
            let tx = self.evt_tx.clone();
            let label = target.label();
            tokio::spawn(async move {
                let _ = futures::future::join_all(handles).await;
                let _ = tx.send(AppEvent::Log(format!("本轮提问已全部返回 [{}]", label)));
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ProviderKind;
    use std::collections::HashSet;

    fn mock_service() -> (CouncilService, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (CouncilService::new(CouncilMode::Mock, tx), rx)
    }

    #[tokio::test]
    async fn ask_all_resolves_every_pane() {
        let (svc, mut rx) = mock_service();
        let store = KeyStore::load(std::env::temp_dir().join("no-such-keys.json")).unwrap();
        svc.ask(&store, "什么是借用检查器？", AskTarget::All);

        let mut thinking = HashSet::new();
        let mut answered = HashSet::new();
        while answered.len() < 3 {
            match rx.recv().await.expect("event stream closed early") {
                AppEvent::Thinking(kind) => {
                    thinking.insert(kind);
                }
                AppEvent::Answer { kind, text } => {
                    assert!(!text.is_empty());
                    answered.insert(kind);
                }
                AppEvent::AnswerFailed { kind, error } => {
                    panic!("mock provider must not fail: {} {}", kind.label(), error)
                }
                _ => {}
            }
        }
        assert_eq!(thinking.len(), 3);
        assert_eq!(answered.len(), 3);
    }

    #[tokio::test]
    async fn ask_one_only_touches_that_pane() {
        let (svc, mut rx) = mock_service();
        let store = KeyStore::load(std::env::temp_dir().join("no-such-keys.json")).unwrap();
        svc.ask(&store, "hello", AskTarget::One(ProviderKind::Gemini));

        match rx.recv().await.unwrap() {
            AppEvent::Thinking(kind) => assert_eq!(kind, ProviderKind::Gemini),
            other => panic!("expected Thinking, got {:?}", other),
        }
        match rx.recv().await.unwrap() {
            AppEvent::Answer { kind, .. } => assert_eq!(kind, ProviderKind::Gemini),
            other => panic!("expected Answer, got {:?}", other),
        }
        // 收尾只剩一条"全部返回"日志，不会再碰任何面板
        match rx.recv().await.unwrap() {
            AppEvent::Log(_) => {}
            other => panic!("expected completion log, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn blank_question_is_rejected_before_any_call() {
        let (svc, mut rx) = mock_service();
        let store = KeyStore::load(std::env::temp_dir().join("no-such-keys.json")).unwrap();
        svc.ask(&store, "   ", AskTarget::All);

        match rx.recv().await.unwrap() {
            AppEvent::Error(_) => {}
            other => panic!("expected Error, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }
}
