//! HTTP-level tests for `/api/service_data`.
//!
//! The router is driven with `tower::ServiceExt::oneshot` against an in-memory
//! row source, so no database is needed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use proptest::prelude::*;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use service_data_api::{build_router, FetchError, ServiceDetailRow, ServiceDetailsSource};

// ── In-memory source ───────────────────────────────────────────

#[derive(Default)]
struct FakeSource {
    rows: HashMap<i64, Vec<ServiceDetailRow>>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeSource {
    fn with_rows(service_id: i64, rows: JsonValue) -> Self {
        let mut map = HashMap::new();
        map.insert(service_id, serde_json::from_value(rows).unwrap());
        Self {
            rows: map,
            ..Default::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceDetailsSource for FakeSource {
    async fn fetch(&self, service_id: i64) -> Result<Vec<ServiceDetailRow>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FetchError::ConnectTimeout(Duration::from_secs(10)));
        }
        Ok(self.rows.get(&service_id).cloned().unwrap_or_default())
    }
}

fn example_rows() -> JsonValue {
    json!([
        {"service_id": 1, "category": "A", "option": "x", "keyword": "k1", "price": 10},
        {"service_id": 1, "category": "A", "option": "y", "keyword": "k2", "price": 20},
        {"service_id": 1, "category": "B", "option": "x", "keyword": "k3", "price": 15}
    ])
}

// ── Helpers ────────────────────────────────────────────────────

async fn get(source: Arc<FakeSource>, uri: &str) -> (StatusCode, Vec<u8>) {
    let app = build_router(source);
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

fn as_json(bytes: &[u8]) -> JsonValue {
    serde_json::from_slice(bytes).unwrap()
}

// ── Tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_worked_example() {
    let source = Arc::new(FakeSource::with_rows(1, example_rows()));
    let (status, body) = get(source.clone(), "/api/service_data?service_id=1").await;

    assert_eq!(status, StatusCode::OK);
    let rows = example_rows();
    assert_eq!(
        as_json(&body),
        json!({
            "grouped_data": {"A": [rows[0], rows[1]], "B": [rows[2]]},
            "option_price_map": {"x": 15, "y": 20},
            "keyword_price_map": {"k1": 10, "k2": 20, "k3": 15},
            "option_keyword_map": {"x": "k3", "y": "k2"}
        })
    );
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_body_key_order() {
    let source = Arc::new(FakeSource::with_rows(
        5,
        json!([
            {"service_id": 5, "category": "Z", "option": "o", "keyword": "k", "price": 1},
            {"service_id": 5, "category": "B", "option": "p", "keyword": "l", "price": 2}
        ]),
    ));
    let (_, body) = get(source, "/api/service_data?service_id=5").await;
    let text = String::from_utf8(body).unwrap();

    assert!(text.starts_with(r#"{"grouped_data":{"Z":[{"service_id":5,"category":"Z""#));
    let grouped = text.find("\"grouped_data\"").unwrap();
    let option_price = text.find("\"option_price_map\"").unwrap();
    let keyword_price = text.find("\"keyword_price_map\"").unwrap();
    let option_keyword = text.find("\"option_keyword_map\"").unwrap();
    assert!(grouped < option_price && option_price < keyword_price);
    assert!(keyword_price < option_keyword);
    assert!(text.find("\"Z\"").unwrap() < text.find("\"B\"").unwrap());
}

#[tokio::test]
async fn test_repeated_requests_are_byte_identical() {
    let source = Arc::new(FakeSource::with_rows(1, example_rows()));
    let (_, first) = get(source.clone(), "/api/service_data?service_id=1").await;
    let (_, second) = get(source.clone(), "/api/service_data?service_id=1").await;
    assert_eq!(first, second);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_empty_result_is_not_found() {
    let source = Arc::new(FakeSource::with_rows(1, example_rows()));
    let (status, body) = get(source.clone(), "/api/service_data?service_id=2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(as_json(&body), json!({"error": "No data found"}));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_fetch_failure_is_not_found() {
    let source = Arc::new(FakeSource::failing());
    let (status, body) = get(source.clone(), "/api/service_data?service_id=1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(as_json(&body), json!({"error": "No data found"}));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_missing_parameter() {
    for uri in [
        "/api/service_data",
        "/api/service_data?",
        "/api/service_data?other=1",
        "/api/service_data?service_id=",
    ] {
        let source = Arc::new(FakeSource::default());
        let (status, body) = get(source.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            as_json(&body),
            json!({"error": "Invalid service_id parameter"})
        );
        assert_eq!(source.calls(), 0, "{uri}");
    }
}

#[tokio::test]
async fn test_zero_is_missing() {
    let source = Arc::new(FakeSource::default());
    let (status, body) = get(source.clone(), "/api/service_data?service_id=000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        as_json(&body),
        json!({"error": "Missing service_id parameter"})
    );
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_repeated_parameter_uses_first_value() {
    for uri in [
        "/api/service_data?service_id=1&service_id=1",
        "/api/service_data?service_id=1&service_id=abc",
        "/api/service_data?other=x&service_id=1&service_id=2",
    ] {
        let source = Arc::new(FakeSource::with_rows(1, example_rows()));
        let (status, body) = get(source.clone(), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(as_json(&body)["option_keyword_map"], json!({"x": "k3", "y": "k2"}));
        assert_eq!(source.calls(), 1, "{uri}");
    }

    let source = Arc::new(FakeSource::with_rows(1, example_rows()));
    let (status, body) = get(source.clone(), "/api/service_data?service_id=abc&service_id=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        as_json(&body),
        json!({"error": "Invalid service_id parameter"})
    );
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_non_ascii_digits_are_invalid() {
    // Arabic-Indic "١٢", then a bare invalid UTF-8 byte
    for uri in [
        "/api/service_data?service_id=%D9%A1%D9%A2",
        "/api/service_data?service_id=%FF",
    ] {
        let source = Arc::new(FakeSource::with_rows(12, example_rows()));
        let (status, body) = get(source.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            as_json(&body),
            json!({"error": "Invalid service_id parameter"})
        );
        assert_eq!(source.calls(), 0, "{uri}");
    }
}

#[tokio::test]
async fn test_out_of_range_is_not_found_without_query() {
    let source = Arc::new(FakeSource::default());
    let (status, body) = get(
        source.clone(),
        "/api/service_data?service_id=99999999999999999999999",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(as_json(&body), json!({"error": "No data found"}));
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_health() {
    let source = Arc::new(FakeSource::failing());
    let (status, body) = get(source.clone(), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), json!({"status": "ok"}));
    assert_eq!(source.calls(), 0);
}

// ── Properties ─────────────────────────────────────────────────

fn percent_encode(raw: &str) -> String {
    raw.bytes().map(|b| format!("%{b:02X}")).collect()
}

proptest! {
    #[test]
    fn prop_non_numeric_is_rejected_without_query(raw in "\\PC*".prop_filter(
        "must contain a non-digit",
        |s| s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()),
    )) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let source = Arc::new(FakeSource::with_rows(1, example_rows()));
        let uri = format!("/api/service_data?service_id={}", percent_encode(&raw));
        let (status, body) = rt.block_on(get(source.clone(), &uri));

        prop_assert_eq!(status, StatusCode::BAD_REQUEST);
        prop_assert_eq!(as_json(&body), json!({"error": "Invalid service_id parameter"}));
        prop_assert_eq!(source.calls(), 0);
    }

    #[test]
    fn prop_unknown_id_is_not_found(id in 2i64..i64::MAX) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let source = Arc::new(FakeSource::with_rows(1, example_rows()));
        let uri = format!("/api/service_data?service_id={id}");
        let (status, body) = rt.block_on(get(source.clone(), &uri));

        prop_assert_eq!(status, StatusCode::NOT_FOUND);
        prop_assert_eq!(as_json(&body), json!({"error": "No data found"}));
        prop_assert_eq!(source.calls(), 1);
    }
}
