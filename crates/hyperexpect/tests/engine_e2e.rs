//! End-to-end tests of request execution through an in-process handler.
//!
//! These cover the interplay of the retry loop, redirect handling, timeouts
//! and cancellation as seen from the public session API.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream;
use http::{Response as HttpResponse, StatusCode};
use http_body_util::{BodyExt, Full};
use hyperexpect::transport::RequestBody;
use hyperexpect::{
    Binder, CancelToken, CollectReporter, Config, Expect, RedirectPolicy, RetryPolicy,
};

type Reply = HttpResponse<Full<Bytes>>;

fn reply(status: StatusCode, body: &'static str) -> Reply {
    HttpResponse::builder()
        .status(status)
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

fn redirect(status: StatusCode, location: &str) -> Reply {
    HttpResponse::builder()
        .status(status)
        .header("location", location)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// A collecting session over `binder` with fast retries.
fn session(binder: Binder) -> (Expect, CollectReporter) {
    hyperexpect_telemetry::init_test_logging();
    let reporter = CollectReporter::new();
    let e = Expect::new(
        Config::new("http://example.test")
            .test_name("engine_e2e")
            .client(binder)
            .reporter(reporter.clone())
            .retry_delay(Duration::from_millis(1), Duration::from_millis(5)),
    );
    (e, reporter)
}

/// Routes used by the redirect tests.
///
/// `/redirect/{code}` answers with that status pointing at `/content`;
/// `/chain` hops twice before reaching `/content`. `/content` echoes a
/// non-empty request body and otherwise answers `default_response`.
async fn redirects(req: http::Request<RequestBody>) -> Reply {
    let path = req.uri().path().to_string();
    let body = req.into_body().collect().await.unwrap().to_bytes();
    match path.as_str() {
        "/chain" => redirect(StatusCode::FOUND, "/chain/2"),
        "/chain/2" => redirect(StatusCode::FOUND, "/content"),
        "/content" if !body.is_empty() => HttpResponse::new(Full::new(body)),
        "/content" => reply(StatusCode::OK, "default_response"),
        other => match other.strip_prefix("/redirect/") {
            Some(code) => {
                let code: u16 = code.parse().unwrap();
                redirect(StatusCode::from_u16(code).unwrap(), "/content")
            }
            None => reply(StatusCode::NOT_FOUND, ""),
        },
    }
}

#[tokio::test]
async fn test_retry_after_server_error() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let (e, reporter) = session(Binder::new(move |_req: http::Request<RequestBody>| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n == 0 {
                reply(StatusCode::SERVICE_UNAVAILABLE, "busy")
            } else {
                reply(StatusCode::OK, "ok")
            }
        }
    }));

    e.get("/flaky")
        .with_retry_policy(RetryPolicy::RetryAllErrors)
        .with_max_retries(1)
        .expect()
        .await
        .status(200u16)
        .text()
        .is_equal("ok");

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(reporter.is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_retries_exhausted_returns_last_response() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let (e, reporter) = session(Binder::new(move |_req: http::Request<RequestBody>| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { reply(StatusCode::INTERNAL_SERVER_ERROR, "down") }
    }));

    e.get("/down")
        .with_max_retries(2)
        .expect()
        .await
        .status(500u16);

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(reporter.is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_client_errors_not_retried_by_default() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let (e, _reporter) = session(Binder::new(move |_req: http::Request<RequestBody>| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { reply(StatusCode::BAD_REQUEST, "bad") }
    }));

    e.get("/bad").with_max_retries(3).expect().await.status(400u16);

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_budget_spans_redirects() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let (e, reporter) = session(Binder::new(move |req: http::Request<RequestBody>| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let path = req.uri().path().to_string();
        async move {
            match (path.as_str(), n) {
                ("/a", 0) | ("/b", 2) => reply(StatusCode::SERVICE_UNAVAILABLE, "busy"),
                ("/a", _) => redirect(StatusCode::FOUND, "/b"),
                _ => reply(StatusCode::OK, "ok"),
            }
        }
    }));

    e.get("/a")
        .with_retry_policy(RetryPolicy::RetryTimeoutAndServerErrors)
        .with_max_retries(1)
        .expect()
        .await
        .status(503u16)
        .text()
        .is_equal("busy");

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(reporter.is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_follow_all_redirects_resends_body() {
    let (e, reporter) = session(Binder::new(redirects));

    e.post("/redirect/301")
        .with_text("custom_response")
        .with_redirect_policy(RedirectPolicy::FollowAllRedirects)
        .expect()
        .await
        .status(200u16)
        .text()
        .is_equal("custom_response");

    assert!(reporter.is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_without_body_policy_stops_at_redirect_with_body() {
    let (e, reporter) = session(Binder::new(redirects));

    for code in [301u16, 308] {
        e.post(&format!("/redirect/{code}"))
            .with_text("custom_response")
            .with_redirect_policy(RedirectPolicy::FollowRedirectsWithoutBody)
            .expect()
            .await
            .status(code);
    }

    assert!(reporter.is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_permanent_redirect_with_body() {
    let (e, reporter) = session(Binder::new(redirects));

    e.post("/redirect/308")
        .with_text("custom_response")
        .with_redirect_policy(RedirectPolicy::DontFollowRedirects)
        .expect()
        .await
        .status(308u16);
    e.post("/redirect/308")
        .with_text("custom_response")
        .with_redirect_policy(RedirectPolicy::FollowAllRedirects)
        .expect()
        .await
        .status(200u16)
        .text()
        .is_equal("custom_response");

    assert!(reporter.is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_permanent_redirect_without_body_keeps_method() {
    let (e, reporter) = session(Binder::new(|req: http::Request<RequestBody>| async move {
        match req.uri().path() {
            "/old" => redirect(StatusCode::PERMANENT_REDIRECT, "/new"),
            _ => reply(StatusCode::OK, if req.method() == http::Method::DELETE {
                "deleted"
            } else {
                "other"
            }),
        }
    }));

    e.delete("/old")
        .expect()
        .await
        .status(200u16)
        .text()
        .is_equal("deleted");

    assert!(reporter.is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_found_redirect_switches_post_to_get() {
    let (e, reporter) = session(Binder::new(redirects));

    e.post("/redirect/302")
        .expect()
        .await
        .status(200u16)
        .text()
        .is_equal("default_response");

    assert!(reporter.is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_dont_follow_redirects() {
    let (e, reporter) = session(Binder::new(redirects));

    let response = e
        .get("/redirect/302")
        .with_redirect_policy(RedirectPolicy::DontFollowRedirects)
        .expect()
        .await;
    response.status(302u16);
    response.header("Location").is_equal("/content");

    assert!(reporter.is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_max_redirects() {
    let (e, reporter) = session(Binder::new(redirects));

    e.get("/chain")
        .with_max_redirects(2)
        .expect()
        .await
        .status(200u16);
    e.get("/chain").expect().await.status(200u16);
    assert!(reporter.is_empty(), "{:?}", reporter.messages());

    let response = e.get("/chain").with_max_redirects(1).expect().await;
    assert!(response.is_failed());
    let messages = reporter.messages();
    assert_eq!(messages.len(), 1, "{messages:?}");
    assert!(messages[0].contains("stopped after 1 redirects"), "{}", messages[0]);
}

#[tokio::test]
async fn test_cancel_wins_over_timeout() {
    let (e, reporter) = session(Binder::new(|_req: http::Request<RequestBody>| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        reply(StatusCode::OK, "late")
    }));

    let token = CancelToken::new();
    token.cancel_after(Duration::from_millis(20));
    let response = e
        .get("/slow")
        .with_timeout(Duration::from_millis(500))
        .with_cancel(token)
        .expect()
        .await;

    assert!(response.is_failed());
    let messages = reporter.messages();
    assert_eq!(messages.len(), 1, "{messages:?}");
    assert!(messages[0].contains("request cancelled"), "{}", messages[0]);
}

#[tokio::test]
async fn test_timeout_reports_once() {
    let (e, reporter) = session(Binder::new(|_req: http::Request<RequestBody>| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        reply(StatusCode::OK, "late")
    }));

    let response = e
        .get("/slow")
        .with_timeout(Duration::from_millis(20))
        .with_retry_policy(RetryPolicy::DontRetry)
        .expect()
        .await;
    response.status(200u16).text().is_equal("late");

    let messages = reporter.messages();
    assert_eq!(messages.len(), 1, "{messages:?}");
    assert!(messages[0].contains("timed out"), "{}", messages[0]);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_waits_between_attempts() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let reporter = CollectReporter::new();
    let e = Expect::new(
        Config::new("http://example.test")
            .reporter(reporter.clone())
            .client(Binder::new(move |_req: http::Request<RequestBody>| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { reply(StatusCode::BAD_GATEWAY, "") }
            }))
            .max_retries(3)
            .retry_delay(Duration::from_millis(100), Duration::from_millis(250)),
    );

    let started = tokio::time::Instant::now();
    e.get("/").expect().await.status(502u16);

    // 100 + 200 + 250
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    assert!(started.elapsed() >= Duration::from_millis(550));
    assert!(reporter.is_empty(), "{:?}", reporter.messages());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let reporter = CollectReporter::new();
    let e = Expect::new(
        Config::new("http://example.test")
            .reporter(reporter.clone())
            .client(Binder::new(move |_req: http::Request<RequestBody>| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { reply(StatusCode::BAD_GATEWAY, "") }
            }))
            .max_retries(3)
            .retry_delay(Duration::from_secs(2), Duration::from_secs(2)),
    );

    let token = CancelToken::new();
    token.cancel_after(Duration::from_millis(50));
    let started = tokio::time::Instant::now();
    let response = e.get("/").with_cancel(token).expect().await;

    assert!(response.is_failed());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(2));
    let messages = reporter.messages();
    assert_eq!(messages.len(), 1, "{messages:?}");
    assert!(messages[0].contains("request cancelled"), "{}", messages[0]);
}

#[tokio::test]
async fn test_chunked_body_reaches_handler() {
    let (e, reporter) = session(Binder::new(|req: http::Request<RequestBody>| async move {
        let chunked = req.body().is_chunked();
        let body = req.into_body().collect().await.unwrap().to_bytes();
        let text = format!("{chunked}:{}", String::from_utf8_lossy(&body));
        HttpResponse::new(Full::new(Bytes::from(text)))
    }));

    e.post("/upload")
        .with_chunked(stream::iter(
            ["ab", "cd", "ef"].map(|chunk| Ok::<_, Infallible>(Bytes::from(chunk))),
        ))
        .expect()
        .await
        .text()
        .is_equal("true:abcdef");

    assert!(reporter.is_empty(), "{:?}", reporter.messages());
}

#[tokio::test]
async fn test_chunked_body_not_replayed() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let (e, reporter) = session(Binder::new(move |req: http::Request<RequestBody>| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            match req.uri().path() {
                "/upload" => redirect(StatusCode::PERMANENT_REDIRECT, "/content"),
                _ => reply(StatusCode::SERVICE_UNAVAILABLE, "busy"),
            }
        }
    }));
    let chunks = || stream::iter([Ok::<_, Infallible>(Bytes::from_static(b"data"))]);

    e.post("/upload")
        .with_chunked(chunks())
        .with_redirect_policy(RedirectPolicy::FollowAllRedirects)
        .expect()
        .await
        .status(308u16);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    e.post("/busy")
        .with_chunked(chunks())
        .with_retry_policy(RetryPolicy::RetryAllErrors)
        .with_max_retries(3)
        .expect()
        .await
        .status(503u16);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    assert!(reporter.is_empty(), "{:?}", reporter.messages());
}
