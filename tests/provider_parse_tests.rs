use serde_json::json;
use std::str::FromStr;

use code_council::ai::chatgpt::extract_chat_text;
use code_council::ai::gemini::extract_gemini_text;
use code_council::ai::relay::{RelayQuery, RelayReply};
use code_council::ai::{AskRequest, AskTarget, LlmProvider, MockProvider, ProviderKind};

#[test]
fn parse_chatgpt_response_variants() {
    // standard: choices[0].message.content as a string
    let j = json!({
        "choices": [ { "message": { "content": "Hello from chatgpt" } } ]
    });
    assert_eq!(extract_chat_text(&j).as_deref(), Some("Hello from chatgpt"));

    // content parts array
    let j2 = json!({
        "choices": [ { "message": { "content": [
            { "type": "text", "text": "part one" },
            { "type": "text", "text": "part two" }
        ] } } ]
    });
    assert_eq!(extract_chat_text(&j2).as_deref(), Some("part one\npart two"));

    // legacy completions shape: choices[0].text
    let j3 = json!({ "choices": [ { "text": "Legacy text" } ] });
    assert_eq!(extract_chat_text(&j3).as_deref(), Some("Legacy text"));

    // no choices at all
    let j4 = json!({ "error": { "message": "boom" } });
    assert!(extract_chat_text(&j4).is_none());
}

#[test]
fn parse_gemini_response_variants() {
    // standard: candidates[0].content.parts[*].text joined with newlines
    let j = json!({
        "candidates": [ { "content": { "parts": [
            { "text": "first" },
            { "text": "second" }
        ] } } ]
    });
    assert_eq!(extract_gemini_text(&j).as_deref(), Some("first\nsecond"));

    // tolerated: content directly a string
    let j2 = json!({ "candidates": [ { "content": "Gemini says hi" } ] });
    assert_eq!(extract_gemini_text(&j2).as_deref(), Some("Gemini says hi"));

    // blocked prompt: candidates present but no parts
    let j3 = json!({ "candidates": [ { "content": { "role": "model" } } ] });
    assert!(extract_gemini_text(&j3).is_none());

    let j4 = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
    assert!(extract_gemini_text(&j4).is_none());
}

#[test]
fn relay_wire_format_matches_the_edge_functions() {
    // request body is exactly {"query": ...}
    let q = RelayQuery {
        query: "why rust".to_string(),
    };
    assert_eq!(serde_json::to_value(&q).unwrap(), json!({"query": "why rust"}));

    // success carries only text, failure only error
    let ok: RelayReply = serde_json::from_str(r#"{"text":"fine"}"#).unwrap();
    assert_eq!(ok.text.as_deref(), Some("fine"));
    assert!(ok.error.is_none());

    let err: RelayReply = serde_json::from_str(r#"{"error":"401 Unauthorized"}"#).unwrap();
    assert_eq!(err.error.as_deref(), Some("401 Unauthorized"));
    assert!(err.text.is_none());

    let out = serde_json::to_value(RelayReply {
        text: Some("fine".to_string()),
        error: None,
    })
    .unwrap();
    assert_eq!(out, json!({"text": "fine"}));
}

#[test]
fn ask_target_parsing_and_members() {
    assert_eq!(AskTarget::from_str("all").unwrap().members().len(), 3);
    assert_eq!(
        AskTarget::from_str("gemini").unwrap().members(),
        vec![ProviderKind::Gemini]
    );
    assert!(AskTarget::from_str("claude").is_err());

    assert_eq!(ProviderKind::from_str("GPT").unwrap(), ProviderKind::ChatGpt);
    assert_eq!(ProviderKind::ChatGpt.as_str(), "chatgpt");
}

#[tokio::test]
async fn mock_provider_answers_every_member_without_network() {
    for kind in ProviderKind::ALL {
        let p = MockProvider::with_delay_ms(kind, 0, 0);
        let resp = p
            .ask(AskRequest::new("什么是所有权？"))
            .await
            .expect("mock never fails");
        assert!(!resp.text.is_empty());
        assert!(resp.raw.is_none());
        // the canned answer quotes the question back
        assert!(resp.text.contains("所有权"));
    }
}
