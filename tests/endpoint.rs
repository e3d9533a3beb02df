mod common;

use std::time::Duration;

use chrono::Utc;
use common::{closed_port, FakeTsdb};
use pretty_assertions::assert_eq;
use serde_json::json;
use tsdb_client::{
    CancellationToken, DataPoint, Endpoint, ErrorEnvelope, PutResponse, Query, Request, Tags,
    TimeValue, TsdbError,
};

const TWO_POINTS: &str = r#"[{"metric":"m","tags":{},"aggregateTags":[],
    "dps":{"1600000000":1.5,"1600000060":2.5}}]"#;

fn simple_request() -> Request {
    Request::new("1h-ago".parse().unwrap()).query(Query::new("sum", "m"))
}

#[test_log::test(tokio::test)]
async fn test_query_relative_start() {
    let server = FakeTsdb::start(200, TWO_POINTS).await;
    let endpoint = Endpoint::dial("127.0.0.1", server.port()).unwrap();

    let response = endpoint.query(&simple_request()).await.unwrap();

    assert_eq!(response.len(), 1);
    let points: Vec<_> = response.results()[0].dps.iter().collect();
    assert_eq!(points, vec![(1600000000, 1.5), (1600000060, 2.5)]);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/api/query");
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(
        requests[0].json(),
        json!({
            "start": "1h-ago",
            "queries": [{"aggregator": "sum", "metric": "m", "rate": false, "tags": {}}]
        })
    );
}

#[test_log::test(tokio::test)]
async fn test_put_sends_numeric_timestamps() {
    let server = FakeTsdb::start(204, "").await;
    let endpoint = Endpoint::dial("127.0.0.1", server.port()).unwrap();

    let now = Utc::now().timestamp();
    let tags = Tags::new().with("host", "web01").with("dc", "lga");
    let points: Vec<DataPoint> = [(30, 80), (20, 90), (10, 100)]
        .into_iter()
        .map(|(ago, value)| {
            let ts = TimeValue::from_unix_seconds(now - ago).unwrap();
            DataPoint::new(ts, "sys.cpu.nice", value as i64).with_tags(tags.clone())
        })
        .collect();

    let reply = endpoint.put(&points).await.unwrap();
    assert_eq!(reply, PutResponse::Empty);

    let requests = server.requests();
    assert_eq!(requests[0].path, "/api/put");
    let body = requests[0].json();
    let sent = body.as_array().expect("put body is an array");
    assert_eq!(sent.len(), 3);
    for (point, ago) in sent.iter().zip([30, 20, 10]) {
        assert!(point["timestamp"].is_number());
        assert_eq!(point["timestamp"].as_i64(), Some(now - ago));
        assert_eq!(point["metric"], "sys.cpu.nice");
        assert_eq!(point["tags"], json!({"host": "web01", "dc": "lga"}));
    }
    assert_eq!(sent[2]["value"], json!(100));
}

#[test_log::test(tokio::test)]
async fn test_put_summary_reply() {
    let server = FakeTsdb::start(200, r#"{"success":1,"failed":0}"#).await;
    let endpoint = Endpoint::dial("127.0.0.1", server.port()).unwrap();
    let point = DataPoint::new(TimeValue::now(), "m", 1.0);

    match endpoint.put(&[point]).await.unwrap() {
        PutResponse::Summary(summary) => {
            assert_eq!(summary.success, 1);
            assert_eq!(summary.failed, 0);
        }
        other => panic!("unexpected reply: {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn test_server_error_keeps_status_and_body() {
    let body = r#"{"error":{"code":400,"message":"bad"}}"#;
    let server = FakeTsdb::start(400, body).await;
    let endpoint = Endpoint::dial("127.0.0.1", server.port()).unwrap();

    match endpoint.query(&simple_request()).await {
        Err(TsdbError::Server { status, body: text }) => {
            assert_eq!(status, 400);
            assert_eq!(text, body);
            assert_eq!(ErrorEnvelope::parse(text.as_bytes()).unwrap().error.message, "bad");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn test_internal_error() {
    let server = FakeTsdb::start(500, r#"{"error":{"message":"boom"}}"#).await;
    let endpoint = Endpoint::dial("127.0.0.1", server.port()).unwrap();

    assert!(matches!(
        endpoint.query(&simple_request()).await,
        Err(TsdbError::Server { status: 500, .. })
    ));
}

#[test_log::test(tokio::test)]
async fn test_truncated_body_is_decode_error() {
    let server = FakeTsdb::start(200, r#"[{"metric":"m","tags":{},"dps":{"1600000000":1."#).await;
    let endpoint = Endpoint::dial("127.0.0.1", server.port()).unwrap();

    assert!(matches!(
        endpoint.query(&simple_request()).await,
        Err(TsdbError::Decode { .. })
    ));
}

#[test_log::test(tokio::test)]
async fn test_connection_refused_is_transport_error() {
    let endpoint = Endpoint::dial("127.0.0.1", closed_port().await).unwrap();

    assert!(matches!(
        endpoint.query(&simple_request()).await,
        Err(TsdbError::Transport(_))
    ));
}

#[test_log::test(tokio::test)]
async fn test_cancel_slow_query() {
    let server = FakeTsdb::start_with_delay(200, TWO_POINTS, Duration::from_secs(30)).await;
    let endpoint = Endpoint::dial("127.0.0.1", server.port()).unwrap();
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let result = endpoint.query_with_cancel(&simple_request(), &token).await;
    assert!(matches!(result, Err(TsdbError::Canceled)));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test_log::test(tokio::test)]
async fn test_concurrent_queries_share_endpoint() {
    let server = FakeTsdb::start(200, TWO_POINTS).await;
    let endpoint = std::sync::Arc::new(Endpoint::dial("127.0.0.1", server.port()).unwrap());

    let calls = (0..4).map(|_| {
        let endpoint = endpoint.clone();
        tokio::spawn(async move { endpoint.query(&simple_request()).await })
    });
    for call in futures::future::join_all(calls).await {
        assert_eq!(call.unwrap().unwrap().len(), 1);
    }
    assert_eq!(server.requests().len(), 4);
}
