//! Transport tests against a wiremock server.

use cja_client::rate_limit::RateLimitConfig;
use cja_client::retry::{RetryOn5xx, RetryOnRetryable};
use cja_client::{Client, CjaConfig, Error, RequestMetadata, RetryPredicate, RetryStrategy};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .build()
        .unwrap()
}

fn retrying_client(server: &MockServer, max_retries: usize) -> Client {
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .retry_strategy(RetryStrategy::Linear {
            delay: Duration::from_millis(10),
            max_retries,
        })
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_credentials_are_sent_as_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/aresconfig/users/me"))
        .and(header("authorization", "Bearer token-123"))
        .and(header("x-api-key", "api-key"))
        .and(header("x-gw-ims-org-id", "ORG@AdobeOrg"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "me"})))
        .expect(1)
        .mount(&server)
        .await;

    let config =
        CjaConfig::new("ORG@AdobeOrg", "api-key", "token-123").with_endpoint(server.uri());
    let client = Client::builder().config(&config).unwrap().build().unwrap();

    let response = client.get::<Value>("/aresconfig/users/me").await.unwrap();
    assert_eq!(response.data["login"], "me");
    assert_eq!(response.attempts, 1);
    assert!(!response.was_retried());
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;
    let body = json!({"name": "segment", "definition": {}});

    Mock::given(method("POST"))
        .and(path("/filters/validate"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"valid": true})))
        .mount(&server)
        .await;

    let response = client(&server)
        .post::<Value, Value>("/filters/validate", &body)
        .await
        .unwrap();
    assert_eq!(response.data, json!({"valid": true}));
}

#[tokio::test]
async fn test_query_parameters_and_base_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/proxy/filters"))
        .and(query_param("limit", "10"))
        .and(query_param("includeType", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(format!("{}/proxy/", server.uri()))
        .unwrap()
        .build()
        .unwrap();
    let metadata = RequestMetadata::get("/filters")
        .with_query_param("limit", 10)
        .with_query_param("includeType", "all");

    let response = client.call::<(), Value>(metadata, None).await.unwrap();
    assert_eq!(response.data["content"], json!([]));
}

#[tokio::test]
async fn test_empty_body_decodes_as_null() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/filters/s1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let response = client(&server).delete::<Value>("/filters/s1").await.unwrap();
    assert_eq!(response.status.as_u16(), 204);
    assert_eq!(response.data, Value::Null);
}

#[tokio::test]
async fn test_http_error_4xx_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/datagroups/dataviews/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .expect(1)
        .mount(&server)
        .await;

    let result = retrying_client(&server, 3)
        .get::<Value>("/datagroups/dataviews/missing")
        .await;

    match result {
        Err(Error::HttpError {
            status,
            raw_response,
            ..
        }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(raw_response, "Not found");
        }
        other => panic!("Expected HttpError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_deserialization_error_keeps_raw_body() {
    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct DataView {
        id: String,
    }

    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/datagroups/dataviews/dv1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .get::<DataView>("/datagroups/dataviews/dv1")
        .await
        .unwrap_err();
    assert_eq!(err.raw_response(), Some("<html>oops</html>"));
    assert_eq!(err.status().map(|s| s.as_u16()), Some(200));
    assert!(matches!(err, Error::DeserializationFailed { .. }));
}

#[tokio::test]
async fn test_retry_on_5xx_then_success() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_mock = calls.clone();

    Mock::given(method("GET"))
        .and(path("/calculatedmetrics/functions"))
        .respond_with(move |_req: &wiremock::Request| {
            if calls_in_mock.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(503).set_body_string("busy")
            } else {
                ResponseTemplate::new(200).set_body_json(json!([{"id": "abs"}]))
            }
        })
        .mount(&server)
        .await;

    let response = retrying_client(&server, 3)
        .get::<Value>("/calculatedmetrics/functions")
        .await
        .unwrap();

    assert_eq!(response.data[0]["id"], "abs");
    assert_eq!(response.attempts, 3);
    assert!(response.was_retried());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_max_retries_exceeded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Server error"))
        .expect(3)
        .mount(&server)
        .await;

    let result = retrying_client(&server, 2)
        .post::<Value, Value>("/reports", &json!({}))
        .await;

    match result {
        Err(Error::MaxRetriesExceeded {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 3);
            assert_eq!(last_error.status().map(|s| s.as_u16()), Some(500));
        }
        other => panic!("Expected MaxRetriesExceeded, got {:?}", other),
    }
}

#[tokio::test]
async fn test_custom_retry_predicate() {
    struct OnlyServiceUnavailable;

    impl RetryPredicate for OnlyServiceUnavailable {
        fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
            error.status().map_or(false, |s| s.as_u16() == 503)
        }
    }

    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/filters"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .retry_strategy(RetryStrategy::Linear {
            delay: Duration::from_millis(10),
            max_retries: 3,
        })
        .retry_predicate(Box::new(OnlyServiceUnavailable))
        .build()
        .unwrap();

    let err = client.get::<Value>("/filters").await.unwrap_err();
    assert!(matches!(err, Error::HttpError { .. }));
}

#[tokio::test]
async fn test_timeout_maps_to_timeout_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .timeout(Duration::from_millis(50))
        .retry_predicate(Box::new(RetryOn5xx))
        .build()
        .unwrap();

    let err = client.get::<Value>("/slow").await.unwrap_err();
    assert!(matches!(err, Error::Timeout));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_rate_limit_retry_after_is_honoured() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_mock = calls.clone();

    Mock::given(method("GET"))
        .and(path("/filters"))
        .respond_with(move |_req: &wiremock::Request| {
            if calls_in_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "1")
                    .set_body_string("Too many requests")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"content": []}))
            }
        })
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .retry_strategy(RetryStrategy::Linear {
            delay: Duration::from_millis(10),
            max_retries: 2,
        })
        .retry_predicate(Box::new(RetryOnRetryable))
        .build()
        .unwrap();

    let start = Instant::now();
    let response = client.get::<Value>("/filters").await.unwrap();
    assert_eq!(response.attempts, 2);
    assert!(start.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn test_rate_limit_disabled_uses_strategy_delay() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_mock = calls.clone();

    Mock::given(method("GET"))
        .and(path("/filters"))
        .respond_with(move |_req: &wiremock::Request| {
            if calls_in_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(429).insert_header("retry-after", "30")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"content": []}))
            }
        })
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .retry_strategy(RetryStrategy::Linear {
            delay: Duration::from_millis(20),
            max_retries: 2,
        })
        .rate_limit_config(RateLimitConfig::disabled())
        .build()
        .unwrap();

    let start = Instant::now();
    let response = client.get::<Value>("/filters").await.unwrap();
    assert_eq!(response.attempts, 2);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_custom_schedule_bounds_rate_limited_retries() {
    fn one_retry(attempt: usize) -> Option<Duration> {
        (attempt <= 1).then_some(Duration::from_millis(10))
    }

    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/filters"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .expect(2)
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .retry_strategy(RetryStrategy::Custom {
            delay_fn: one_retry,
        })
        .build()
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), client.get::<Value>("/filters"))
        .await
        .expect("throttled call should give up");

    match result {
        Err(Error::MaxRetriesExceeded {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 2);
            assert_eq!(last_error.status().map(|s| s.as_u16()), Some(429));
        }
        other => panic!("Expected MaxRetriesExceeded, got {:?}", other),
    }
}
