//! End-to-end pipeline tests: a fixture chunk source feeds an `Adapter`'s
//! stream factory, and the resulting `StreamIterator` is drained to
//! canonical events.

use serde_json::json;
use streamcore::{Adapter, AdapterConfig, FinishReason, Message, StreamEvent, ToolsInput};

fn fixture_adapter(chunks: Vec<serde_json::Value>) -> Adapter {
    let config = AdapterConfig::builder().default_model("test-model").build().unwrap();

    let factory: streamcore::StreamFactory = std::sync::Arc::new(move |_client, _base_url, _request| {
        let owned = chunks.clone();
        Box::pin(async move {
            let parsed: Vec<streamcore::Result<streamcore::OpenAIChunk>> = owned
                .into_iter()
                .map(|v| Ok(serde_json::from_value(v).unwrap()))
                .collect();
            let stream: streamcore::ChunkSource = Box::pin(futures::stream::iter(parsed));
            Ok(stream)
        })
    });

    Adapter::with_stream_factory(reqwest::Client::new(), "http://localhost:1234/v1", config, factory)
}

#[tokio::test]
async fn test_plain_text_stream_ends_with_final() {
    let adapter = fixture_adapter(vec![
        json!({"choices":[{"index":0,"delta":{"content":"Hel"}}]}),
        json!({"choices":[{"index":0,"delta":{"content":"lo"}}]}),
        json!({"choices":[{"index":0,"delta":{},"finish_reason":"stop"}],"usage":{"total_tokens":7}}),
    ]);

    let messages = vec![Message::user("hi").unwrap()];
    let mut stream = adapter.stream(&messages, None, Default::default()).await.unwrap();

    let mut tokens = Vec::new();
    let mut final_event = None;
    while let Some(event) = stream.next_event().await.unwrap() {
        match event {
            StreamEvent::Token(t) => tokens.push(t.content),
            StreamEvent::Final(f) => final_event = Some(f),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    assert_eq!(tokens, vec!["Hel".to_string(), "lo".to_string()]);
    let final_event = final_event.unwrap();
    assert_eq!(final_event.output, "Hello");
    assert_eq!(final_event.finish_reason, Some(FinishReason::Stop));
    assert!(stream.is_closed());
}

#[tokio::test]
async fn test_tool_call_then_result_then_stop() {
    let adapter = fixture_adapter(vec![
        json!({"choices":[{"index":0,"delta":{"tool_calls":[
            {"index":0,"id":"call-1","type":"function","function":{"name":"sum","arguments":"{\"a\":1"}}
        ]}}]}),
        json!({"choices":[{"index":0,"delta":{"tool_calls":[
            {"index":0,"function":{"arguments":",\"b\":2}"}}
        ]},"finish_reason":"tool_calls"}]}),
        json!({"tool_result":{"id":"call-1","output":"3"}}),
        json!({"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}),
    ]);

    let messages = vec![Message::user("add 1 and 2").unwrap()];
    let mut stream = adapter.stream(&messages, None, Default::default()).await.unwrap();

    let mut saw_tool_call = false;
    let mut saw_tool_result = false;
    while let Some(event) = stream.next_event().await.unwrap() {
        match event {
            StreamEvent::ToolCall(c) => {
                assert_eq!(c.call_id, "call-1");
                assert_eq!(c.name, "sum");
                saw_tool_call = true;
            }
            StreamEvent::ToolResult(r) => {
                assert_eq!(r.output, "3");
                saw_tool_result = true;
            }
            StreamEvent::Final(f) => {
                assert_eq!(f.output, "3");
            }
            StreamEvent::Token(_) => panic!("no token events expected"),
        }
    }

    assert!(saw_tool_call);
    assert!(saw_tool_result);
}

#[tokio::test]
async fn test_transport_error_propagates_and_closes_stream() {
    let config = AdapterConfig::builder().default_model("test-model").build().unwrap();
    let factory: streamcore::StreamFactory = std::sync::Arc::new(|_client, _base_url, _request| {
        Box::pin(async move {
            let chunks: Vec<streamcore::Result<streamcore::OpenAIChunk>> = vec![Err(
                streamcore::AdapterError::transport("fixture", std::io::Error::other("disconnected")),
            )];
            let stream: streamcore::ChunkSource = Box::pin(futures::stream::iter(chunks));
            Ok(stream)
        })
    });
    let adapter = Adapter::with_stream_factory(reqwest::Client::new(), "http://localhost:1234/v1", config, factory);

    let messages = vec![Message::user("hi").unwrap()];
    let mut stream = adapter.stream(&messages, None, Default::default()).await.unwrap();

    let err = stream.next_event().await.unwrap_err();
    assert!(matches!(err, streamcore::AdapterError::Transport { .. }));
    assert!(stream.is_closed());
}

#[tokio::test]
async fn test_build_request_carries_tool_specs() {
    let config = AdapterConfig::builder().default_model("test-model").build().unwrap();
    let adapter = Adapter::new(reqwest::Client::new(), "http://localhost:1234/v1", config);

    let spec = streamcore::ToolSpec::new(
        "sum",
        Some("adds two numbers".to_string()),
        json!({"type": "object", "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}}, "required": ["a", "b"]}),
    )
    .unwrap();

    let messages = vec![Message::user("add 1 and 2").unwrap()];
    let request = adapter
        .build_request(&messages, Some(ToolsInput::Specs(vec![spec])), Default::default(), true)
        .unwrap();

    let tools = request.tools.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["function"]["name"], "sum");
}
