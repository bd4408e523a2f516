//! Backend client and poller behavior against a mock evaluation server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use uxlens::api::{ApiClient, ApiClientConfig, FetchError, RunsQuery};
use uxlens::models::RunStatus;
use uxlens::poller::{AcquisitionEvent, PollState, ResultPoller};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn fixture_payload() -> Value {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/evaluation_payload.json");
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn client_for(server: &MockServer, token: Option<&str>) -> ApiClient {
    ApiClient::new(ApiClientConfig {
        base_url: server.uri(),
        auth_token: token.map(String::from),
        timeout_seconds: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_get_evaluation_returns_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/evaluation/run-42"))
        .and(query_param("include_details", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture_payload()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, None);
    let payload = assert_ok!(client.get_evaluation("run-42").await);
    assert_eq!(payload["run_id"], "run-42");
}

#[tokio::test]
async fn test_not_found_means_not_ready() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/evaluation/run-42"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not Found"})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, None);
    let err = assert_err!(client.get_evaluation("run-42").await);
    assert_eq!(err, FetchError::NotFoundYet);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unauthorized_carries_detail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/evaluation/run-42"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some("stale"));
    let err = assert_err!(client.get_evaluation("run-42").await);
    assert_eq!(err, FetchError::Unauthorized("Token expired".to_string()));
}

#[tokio::test]
async fn test_server_error_without_detail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/evaluation/run-42"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>boom</html>"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, None);
    let err = assert_err!(client.get_evaluation("run-42").await);
    assert_eq!(
        err,
        FetchError::Http {
            status: 500,
            detail: "HTTP error! status: 500".to_string(),
        }
    );
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/evaluation/run-42"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"run_id": "run-42"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Some("secret-token"));
    assert_ok!(client.get_evaluation("run-42").await);
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/evaluation/run-42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, None);
    let err = assert_err!(client.get_evaluation("run-42").await);
    assert!(matches!(err, FetchError::Malformed(_)));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let client = ApiClient::new(ApiClientConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        auth_token: None,
        timeout_seconds: 2,
    })
    .unwrap();

    let err = assert_err!(client.get_evaluation("run-42").await);
    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn test_list_runs_sends_filters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/runs"))
        .and(query_param("limit", "5"))
        .and(query_param("status", "completed"))
        .and(query_param("order", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "runs": [{
                "run_id": "run-42",
                "status": "completed",
                "target_url": "https://shop.example.com",
                "created_at": "2024-05-01T10:00:00Z",
                "execution_time": 95.0
            }],
            "total": 12,
            "limit": 5,
            "offset": 0
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, None);
    let mut query = RunsQuery::latest(Some(5));
    query.status = Some(RunStatus::Completed);

    let response = assert_ok!(client.list_runs(&query).await);
    assert_eq!(response.total, 12);
    assert_eq!(response.runs.len(), 1);
    assert_eq!(response.runs[0].status, RunStatus::Completed);
}

#[tokio::test]
async fn test_poller_waits_for_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/evaluation/run-42"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/evaluation/run-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture_payload()))
        .mount(&mock_server)
        .await;

    let client = Arc::new(client_for(&mock_server, None));
    let mut poller = ResultPoller::new(client, Duration::from_millis(10));
    let mut subscription = poller.acquire("run-42");

    let mut pending = 0;
    let evaluation = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match subscription.next().await {
                Some(AcquisitionEvent::Pending) => pending += 1,
                Some(AcquisitionEvent::Ready(evaluation)) => return evaluation,
                Some(AcquisitionEvent::Failed(e)) => panic!("unexpected failure: {}", e),
                Some(AcquisitionEvent::Loading) => {}
                None => panic!("subscription closed without a result"),
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(pending, 2);
    assert_eq!(evaluation.run_id, "run-42");
    assert_eq!(evaluation.node_evaluations.len(), 3);
    assert_eq!(poller.state(), PollState::Ready);
}

#[tokio::test]
async fn test_poller_stops_on_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/evaluation/run-42"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Forbidden"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Arc::new(client_for(&mock_server, None));
    let mut poller = ResultPoller::new(client, Duration::from_millis(10));
    let mut subscription = poller.acquire("run-42");

    let failure = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match subscription.next().await {
                Some(AcquisitionEvent::Failed(e)) => return e,
                Some(AcquisitionEvent::Ready(_)) => panic!("unexpected result"),
                Some(_) => {}
                None => panic!("subscription closed without a result"),
            }
        }
    })
    .await
    .unwrap();

    assert!(failure.is_unauthorized());
    assert_eq!(poller.state(), PollState::Failed);
}
