use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rulesmith_engine::{
    ConnectionParams, DiscoveryError, HttpTransport, ToolRegistry, ToolTransport, TransportError,
    TransportSettings,
};

fn params(server: &MockServer) -> ConnectionParams {
    ConnectionParams {
        endpoint: format!("{}/mcp", server.uri()),
        oid: "org-1".to_string(),
        api_key: "key-secret-value".to_string(),
        uid: None,
    }
}

fn transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(params(server), TransportSettings::default()).expect("transport")
}

fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result,
    }))
}

#[tokio::test]
async fn list_tools_parses_descriptors_from_json_body() {
    rulesmith_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({"method": "tools/list"})))
        .respond_with(rpc_result(json!({
            "tools": [
                {
                    "name": "generate_dr_rule_detection",
                    "description": "Generate detection YAML",
                    "inputSchema": {"type": "object", "required": ["query"]}
                },
                {
                    "name": "generate_dr_rule_respond",
                    "inputSchema": {"type": "object", "required": ["query"]}
                }
            ]
        })))
        .mount(&server)
        .await;

    let tools = transport(&server).list_tools().await.expect("tools");
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].name, "generate_dr_rule_detection");
    assert_eq!(tools[0].required_inputs, vec!["query".to_string()]);
}

#[tokio::test]
async fn call_tool_decodes_event_stream_bodies() {
    let server = MockServer::start().await;
    let sse = "event: message\ndata: {\"ping\": true}\n\ndata: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"structuredContent\":{\"detection\":\"event: LOGIN_FAIL\"}}}\n\n";
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let result = transport(&server)
        .call_tool("generate_dr_rule_detection", json!({"query": "q"}))
        .await
        .expect("call");
    assert_eq!(result["structuredContent"]["detection"], "event: LOGIN_FAIL");
}

#[tokio::test]
async fn remote_error_object_surfaces_with_message_intact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": {"code": -32001, "message": "authentication rejected"}
        })))
        .mount(&server)
        .await;

    let err = transport(&server)
        .call_tool("generate_dr_rule_detection", json!({"query": "q"}))
        .await
        .unwrap_err();
    match err {
        TransportError::Remote { code, message } => {
            assert_eq!(code, -32001);
            assert_eq!(message, "authentication rejected");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_success_status_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let err = transport(&server)
        .call_tool("generate_dr_rule_detection", json!({"query": "q"}))
        .await
        .unwrap_err();
    match err {
        TransportError::HttpStatus { code, body } => {
            assert_eq!(code, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_calls_time_out_instead_of_hanging() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {}})),
        )
        .mount(&server)
        .await;

    let settings = TransportSettings {
        request_timeout: Duration::from_millis(50),
        ..TransportSettings::default()
    };
    let transport = HttpTransport::new(params(&server), settings).expect("transport");
    let err = transport
        .call_tool("generate_dr_rule_detection", json!({"query": "q"}))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Timeout));
}

#[tokio::test]
async fn session_id_from_handshake_is_replayed_on_later_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(
            rpc_result(json!({"protocolVersion": "2024-11-05"}))
                .insert_header("Mcp-Session-Id", "sess-42"),
        )
        .mount(&server)
        .await;

    let transport = transport(&server);
    transport.handshake().await.expect("handshake");
    transport
        .call_tool("generate_dr_rule_detection", json!({"query": "q"}))
        .await
        .expect("call");

    let requests = server.received_requests().await.expect("requests");
    assert_eq!(requests.len(), 2);
    assert!(requests[0].headers.get("Mcp-Session-Id").is_none());
    assert_eq!(
        requests[1]
            .headers
            .get("Mcp-Session-Id")
            .and_then(|v| v.to_str().ok()),
        Some("sess-42")
    );
    // The bearer token carries key and org; make sure it is sent at all.
    assert!(requests[1].headers.get("Authorization").is_some());
}

#[tokio::test]
async fn discovery_failure_aborts_before_any_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let transport = transport(&server);
    let err = ToolRegistry::discover(&transport).await.unwrap_err();
    assert!(matches!(
        err,
        DiscoveryError::Transport(TransportError::HttpStatus { code: 500, .. })
    ));
}

#[tokio::test]
async fn invalid_endpoint_is_rejected_at_construction() {
    let params = ConnectionParams {
        endpoint: "not a url".to_string(),
        oid: "o".to_string(),
        api_key: "k".to_string(),
        uid: None,
    };
    let err = HttpTransport::new(params, TransportSettings::default()).unwrap_err();
    assert!(matches!(err, TransportError::InvalidEndpoint(_)));
}
