//! Host HTTP protocol tests against a mock rollup server

use rollup_ledger::{
    codec, config::HostConfig, Address, Balance, Config, Error, HttpRollupHost, Metrics,
    NextRequest, RequestKind, RequestLoop, RollupHost, Status,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn host_for(server: &MockServer) -> HttpRollupHost {
    let config = HostConfig {
        url: format!("{}/", server.uri()),
        ..Default::default()
    };
    HttpRollupHost::new(&config).unwrap()
}

fn hex_text(text: &str) -> String {
    codec::to_hex(text.as_bytes())
}

async fn bodies(server: &MockServer, route: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_finish_idle_on_202() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/finish"))
        .and(body_json(json!({"status": "accept"})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let host = host_for(&server);
    assert_eq!(host.base_url(), server.uri());

    let next = host.finish(Status::Accept).await.unwrap();
    assert!(matches!(next, NextRequest::Idle));
}

#[tokio::test]
async fn test_finish_advance_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/finish"))
        .and(body_json(json!({"status": "reject"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_type": "advance_state",
            "data": {
                "payload": hex_text(r#"{"action":"deposit"}"#),
                "metadata": {
                    "msg_sender": "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed",
                    "input_index": 7,
                    "block_number": 42,
                    "timestamp": 1700000000
                }
            }
        })))
        .mount(&server)
        .await;

    let next = host_for(&server).finish(Status::Reject).await.unwrap();
    let NextRequest::Ready(input) = next else {
        panic!("expected a ready request, got {next:?}");
    };
    assert_eq!(input.kind, RequestKind::Advance);
    assert_eq!(input.payload, br#"{"action":"deposit"}"#.to_vec());
    assert_eq!(
        input.sender.map(|s| s.to_string()),
        Some("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string())
    );
    assert_eq!(input.metadata.input_index, Some(7));
    assert_eq!(input.metadata.block_number, Some(42));
}

#[tokio::test]
async fn test_finish_inspect_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/finish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_type": "inspect_state",
            "data": {"payload": hex_text("{}")}
        })))
        .mount(&server)
        .await;

    let next = host_for(&server).finish(Status::Accept).await.unwrap();
    let NextRequest::Ready(input) = next else {
        panic!("expected a ready request, got {next:?}");
    };
    assert_eq!(input.kind, RequestKind::Inspect);
    assert!(input.sender.is_none());
    assert_eq!(input.payload, b"{}".to_vec());
}

#[tokio::test]
async fn test_finish_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/finish"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = host_for(&server).finish(Status::Accept).await;
    assert!(matches!(result, Err(Error::HostUnavailable(msg)) if msg.contains("500")));
}

#[tokio::test]
async fn test_finish_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/finish"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let next = host_for(&server).finish(Status::Accept).await.unwrap();
    assert!(matches!(next, NextRequest::Invalid(msg) if msg.contains("Malformed finish response")));
}

#[tokio::test]
async fn test_request_loop_rejects_undecodable_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/finish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_type": "advance_state",
            "data": {}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/finish"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/report"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.host.url = server.uri();
    config.polling.backoff_ms = 1;
    let mut rollup = RequestLoop::new(
        HttpRollupHost::new(&config.host).unwrap(),
        &config,
        Metrics::new().unwrap(),
    );

    let status = rollup.step(Status::Accept).await;
    assert_eq!(status, Status::Reject);

    let reports = bodies(&server, "/report").await;
    assert_eq!(reports.len(), 1);
    let text = codec::from_hex(reports[0]["payload"].as_str().unwrap()).unwrap();
    assert!(String::from_utf8(text).unwrap().starts_with("Error: Malformed finish response"));

    // The rejection is carried into the next exchange
    let status = rollup.step(status).await;
    assert_eq!(status, Status::Reject);
    let finishes = bodies(&server, "/finish").await;
    assert_eq!(finishes.len(), 2);
    assert_eq!(finishes[1], json!({"status": "reject"}));
}

#[tokio::test]
async fn test_outputs_are_hex_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notice"))
        .and(body_json(json!({"payload": hex_text("Deposit OK")})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/report"))
        .and(body_json(json!({"payload": hex_text("Unrecognized structure")})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let host = host_for(&server);
    host.notice("Deposit OK").await.unwrap();
    host.report("Unrecognized structure").await.unwrap();
}

#[tokio::test]
async fn test_voucher_payload_is_big_endian_amount() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/voucher"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let destination = Address::new([0xbb; 20]);
    host_for(&server)
        .voucher(destination, Balance::from(256u64))
        .await
        .unwrap();

    let sent = bodies(&server, "/voucher").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["destination"], destination.to_string());

    let payload = codec::from_hex(sent[0]["payload"].as_str().unwrap()).unwrap();
    assert_eq!(payload.len(), 32);
    assert_eq!(&payload[30..], &[0x01, 0x00]);
    assert!(payload[..30].iter().all(|b| *b == 0));
}

#[tokio::test]
async fn test_output_rejected_by_host() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/report"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad payload"))
        .mount(&server)
        .await;

    let result = host_for(&server).report("anything").await;
    assert!(matches!(result, Err(Error::HostUnavailable(msg)) if msg.contains("bad payload")));
}

#[tokio::test]
async fn test_request_loop_settles_against_host() {
    let server = MockServer::start().await;
    let loser = Address::new([0x0a; 20]);
    let winner = Address::new([0x0b; 20]);

    let settle = json!({"win": winner.to_string(), "loss": loser.to_string()}).to_string();
    Mock::given(method("POST"))
        .and(path("/finish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_type": "advance_state",
            "data": {
                "payload": hex_text(&settle),
                "metadata": {"msg_sender": winner.to_string(), "input_index": 0}
            }
        })))
        .mount(&server)
        .await;
    for route in ["/notice", "/report", "/voucher"] {
        Mock::given(method("POST"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
    }

    let mut config = Config::default();
    config.host.url = server.uri();
    config.polling.backoff_ms = 1;

    let mut ledger = rollup_ledger::Ledger::new();
    ledger.credit(loser, Balance::from(100u64)).unwrap();
    ledger.commit();

    let metrics = Metrics::new().unwrap();
    let mut rollup = RequestLoop::with_ledger(
        HttpRollupHost::new(&config.host).unwrap(),
        &config,
        metrics.clone(),
        ledger,
    );

    let status = rollup.step(Status::Accept).await;
    assert_eq!(status, Status::Accept);
    assert_eq!(rollup.ledger().query(&loser), Balance::zero());
    assert_eq!(rollup.ledger().query(&winner), Balance::from(100u64));

    let vouchers = bodies(&server, "/voucher").await;
    assert_eq!(vouchers.len(), 1);
    assert_eq!(vouchers[0]["destination"], winner.to_string());

    let notices = bodies(&server, "/notice").await;
    assert_eq!(notices.len(), 1);
    let text = codec::from_hex(notices[0]["payload"].as_str().unwrap()).unwrap();
    assert_eq!(
        String::from_utf8(text).unwrap(),
        format!("Voucher issued: {winner} gets 100")
    );

    assert!(bodies(&server, "/report").await.is_empty());
    assert_eq!(metrics.outputs_total.with_label_values(&["voucher"]).get(), 1);
    assert_eq!(metrics.outputs_total.with_label_values(&["notice"]).get(), 1);
}
