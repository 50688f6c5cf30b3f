use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use hcaas_core::{HcaasError, LockedExecutor, LockedRequest, RetryPolicy, deadline_for};
use reqwest::Method;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor() -> LockedExecutor {
    LockedExecutor::new(reqwest::Client::new()).with_policy(RetryPolicy {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
    })
}

fn post(server: &MockServer) -> LockedRequest {
    LockedRequest::new(Method::POST, format!("{}/resource", server.uri()), "t0k")
        .json(&json!({"group": "ops"}))
        .expect("encode body")
}

fn locked() -> ResponseTemplate {
    ResponseTemplate::new(500).set_body_string("event locked: healthcheck is busy")
}

async fn hits(server: &MockServer) -> usize {
    server.received_requests().await.expect("recording enabled").len()
}

#[tokio::test]
async fn success_takes_exactly_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resource"))
        .and(header("Authorization", "t0k"))
        .and(body_json(json!({"group": "ops"})))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    executor()
        .execute(&post(&server), Duration::from_secs(5))
        .await
        .expect("request succeeds");
    assert_eq!(hits(&server).await, 1);
}

#[tokio::test]
async fn lock_conflicts_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(locked())
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    executor()
        .execute(&post(&server), Duration::from_secs(5))
        .await
        .expect("succeeds once the lock is released");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    // the body is replayed on every attempt
    assert!(requests.iter().all(|r| r.body == br#"{"group":"ops"}"#));
}

#[tokio::test]
async fn retry_stops_at_first_non_lock_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(locked())
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid group"))
        .mount(&server)
        .await;

    let err = executor()
        .execute(&post(&server), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, HcaasError::Api { status: 422, ref body } if body == "invalid group"));
    assert_eq!(hits(&server).await, 2);
}

#[tokio::test]
async fn client_errors_fail_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("event locked"))
        .mount(&server)
        .await;

    let err = executor()
        .execute(&post(&server), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(hits(&server).await, 1);
}

#[tokio::test]
async fn server_errors_without_marker_fail_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = executor()
        .execute(&post(&server), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.to_string().contains("maintenance"));
    assert_eq!(hits(&server).await, 1);
}

#[tokio::test]
async fn persistent_lock_ends_in_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(locked())
        .mount(&server)
        .await;

    let started = Instant::now();
    let err = executor()
        .execute(&post(&server), Duration::from_millis(300))
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    match err {
        HcaasError::Timeout { attempts, last, .. } => {
            assert!(attempts >= 2);
            assert!(last.contains("event locked"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn hanging_attempt_is_cut_off_at_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let started = Instant::now();
    let err = executor()
        .execute(&post(&server), Duration::from_millis(200))
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(err, HcaasError::Timeout { attempts: 1, .. }));
}

#[tokio::test]
async fn timeout_shorter_than_safety_margin_never_sends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = executor()
        .execute(&post(&server), deadline_for(Duration::from_secs(45)))
        .await
        .unwrap_err();
    assert!(matches!(err, HcaasError::Timeout { attempts: 0, .. }));
    assert_eq!(hits(&server).await, 0);
}

#[tokio::test]
async fn connection_refused_is_a_transport_error() {
    // nothing listens on the discard port
    let request = LockedRequest::new(Method::DELETE, "http://127.0.0.1:9/resource", "t0k");
    let err = executor()
        .execute(&request, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, HcaasError::Transport(_)));
}

/// Executor whose client turns every redirect into an error with `message`,
/// so the lock marker only shows up in the `reqwest::Error` source chain.
fn redirect_refusing_executor(message: &'static str) -> LockedExecutor {
    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::custom(move |attempt| {
            attempt.error(message)
        }))
        .build()
        .expect("client builds");
    LockedExecutor::new(http).with_policy(RetryPolicy {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
    })
}

fn redirect() -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("Location", "/elsewhere")
}

#[tokio::test]
async fn lock_marker_in_transport_error_source_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resource"))
        .respond_with(redirect())
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resource"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    redirect_refusing_executor("event locked: healthcheck is busy")
        .execute(&post(&server), Duration::from_secs(5))
        .await
        .expect("retried past the transport-level lock");
    assert_eq!(hits(&server).await, 2);
}

#[tokio::test]
async fn transport_error_without_marker_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resource"))
        .respond_with(redirect())
        .mount(&server)
        .await;

    let err = redirect_refusing_executor("redirects are not allowed")
        .execute(&post(&server), Duration::from_secs(5))
        .await
        .unwrap_err();
    match err {
        HcaasError::Transport(message) => assert!(message.contains("redirects are not allowed")),
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(hits(&server).await, 1);
}

/// Serves one response whose headers announce more body bytes than are
/// sent before the socket closes.
async fn truncated_body_server(accepted: Arc<AtomicUsize>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 512\r\n\r\nevent")
                .await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}/resource")
}

#[tokio::test]
async fn body_read_failure_is_a_transport_error() {
    let accepted = Arc::new(AtomicUsize::new(0));
    let url = truncated_body_server(Arc::clone(&accepted)).await;

    let err = executor()
        .execute(&LockedRequest::new(Method::DELETE, url, "t0k"), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, HcaasError::Transport(_)), "got {err:?}");
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}
