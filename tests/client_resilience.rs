//! Retry and classification behavior of the API client against a
//! programmable mock upstream.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Method;

use newsfilter_scraper::client::{ApiClient, ApiError, ArticleQuery};
use newsfilter_scraper::config::ApiConfig;

mod common;
use common::{start_mock_upstream, MockResponse};

fn client_config(addr: std::net::SocketAddr, retry_attempts: u32, backoff_secs: f64) -> ApiConfig {
    ApiConfig {
        base_url: format!("http://{addr}"),
        api_key: "test-key".to_string(),
        timeout_secs: 5,
        retry_attempts,
        retry_backoff_secs: backoff_secs,
    }
}

#[tokio::test]
async fn test_server_errors_retry_with_backoff_then_succeed() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let addr = start_mock_upstream(move |_req| {
        let cc = cc.clone();
        async move {
            if cc.fetch_add(1, Ordering::SeqCst) < 2 {
                MockResponse::status(500)
            } else {
                MockResponse::json(200, "{}")
            }
        }
    })
    .await;

    let base = 0.05;
    let client = ApiClient::new(client_config(addr, 3, base)).unwrap();
    let start = Instant::now();
    let response = client
        .execute(Method::GET, "/articles", &[], None, true)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(response.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // Slept base*2^0 then base*2^1 between the three attempts.
    assert!(
        elapsed >= Duration::from_secs_f64(base * 3.0),
        "expected at least {}s of backoff, saw {:?}",
        base * 3.0,
        elapsed
    );
}

#[tokio::test]
async fn test_server_error_exhaustion_is_classified() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let addr = start_mock_upstream(move |_req| {
        cc.fetch_add(1, Ordering::SeqCst);
        async { MockResponse::status(503) }
    })
    .await;

    let client = ApiClient::new(client_config(addr, 2, 0.01)).unwrap();
    let err = client
        .execute(Method::GET, "/articles", &[], None, true)
        .await
        .unwrap_err();

    match err {
        ApiError::ServerError { status, attempts } => {
            assert_eq!(status, 503);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected ServerError, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_rate_limit_waits_without_spending_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let addr = start_mock_upstream(move |_req| {
        let cc = cc.clone();
        async move {
            if cc.fetch_add(1, Ordering::SeqCst) == 0 {
                MockResponse::status(429).with_header("Retry-After", "1")
            } else {
                MockResponse::json(200, "{}")
            }
        }
    })
    .await;

    // Zero retry attempts: only the 429 path can explain a second request.
    let client = ApiClient::new(client_config(addr, 0, 1.0)).unwrap();
    let start = Instant::now();
    let response = client
        .execute(Method::GET, "/articles", &[], None, true)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(response.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(
        elapsed >= Duration::from_secs(1),
        "expected the Retry-After cooldown, saw {elapsed:?}"
    );
}

#[tokio::test]
async fn test_fatal_client_error_returns_immediately() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let addr = start_mock_upstream(move |_req| {
        cc.fetch_add(1, Ordering::SeqCst);
        async { MockResponse::json(404, r#"{"message":"no such endpoint"}"#) }
    })
    .await;

    let client = ApiClient::new(client_config(addr, 3, 1.0)).unwrap();
    let start = Instant::now();
    let err = client
        .execute(Method::GET, "/missing", &[], None, true)
        .await
        .unwrap_err();

    match err {
        ApiError::Fatal { status, .. } => assert_eq!(status, 404),
        other => panic!("expected Fatal, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // No backoff sleeps on the fatal path.
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_connection_failure_exhaustion_is_classified() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(client_config(addr, 1, 0.01)).unwrap();
    let err = client
        .execute(Method::GET, "/articles", &[], None, true)
        .await
        .unwrap_err();

    match err {
        ApiError::NetworkError { attempts, .. } => assert_eq!(attempts, 2),
        ApiError::Timeout { attempts } => assert_eq!(attempts, 2),
        other => panic!("expected a network classification, got {other:?}"),
    }
}

#[tokio::test]
async fn test_data_call_authenticates_implicitly() {
    let health_calls = Arc::new(AtomicU32::new(0));
    let hc = health_calls.clone();
    let addr = start_mock_upstream(move |req| {
        let hc = hc.clone();
        async move {
            match req.route() {
                "/health" => {
                    assert_eq!(req.header("authorization"), Some("Bearer test-key"));
                    hc.fetch_add(1, Ordering::SeqCst);
                    MockResponse::json(200, "{}")
                }
                "/articles" => MockResponse::json(
                    200,
                    r#"{"articles":[{
                        "id":"a1","title":"T","sourceUrl":"https://e.com/a1",
                        "publishedAt":"2024-03-10T12:00:00Z",
                        "source":{"id":"w","name":"Wire"}
                    }]}"#,
                ),
                _ => MockResponse::status(404),
            }
        }
    })
    .await;

    let mut client = ApiClient::new(client_config(addr, 0, 0.01)).unwrap();
    let articles = client
        .get_articles(&ArticleQuery {
            limit: 10,
            offset: 0,
            ..ArticleQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].id, "a1");
    assert_eq!(health_calls.load(Ordering::SeqCst), 1);

    // A second call reuses the session; no second probe.
    let _ = client
        .get_articles(&ArticleQuery {
            limit: 10,
            offset: 0,
            ..ArticleQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(health_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_probe_blocks_data_calls() {
    let addr = start_mock_upstream(|req| async move {
        match req.route() {
            "/health" => MockResponse::status(401),
            _ => MockResponse::json(200, r#"{"articles":[]}"#),
        }
    })
    .await;

    let mut client = ApiClient::new(client_config(addr, 0, 0.01)).unwrap();
    assert!(matches!(
        client.authenticate().await,
        Err(ApiError::AuthenticationFailed(_))
    ));
    assert!(matches!(
        client.get_articles(&ArticleQuery::default()).await,
        Err(ApiError::AuthenticationFailed(_))
    ));
}

#[tokio::test]
async fn test_query_parameters_reach_the_upstream() {
    let addr = start_mock_upstream(|req| async move {
        assert_eq!(req.route(), "/articles");
        assert!(req.path.contains("limit=25"), "path was {}", req.path);
        assert!(req.path.contains("offset=50"), "path was {}", req.path);
        assert!(req.path.contains("symbol=AAPL"), "path was {}", req.path);
        MockResponse::json(200, r#"{"articles":[]}"#)
    })
    .await;

    let client = ApiClient::new(client_config(addr, 0, 0.01)).unwrap();
    let query = [
        ("limit".to_string(), "25".to_string()),
        ("offset".to_string(), "50".to_string()),
        ("symbol".to_string(), "AAPL".to_string()),
    ];
    let response = client
        .execute(Method::GET, "/articles", &query, None, true)
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
