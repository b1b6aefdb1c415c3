use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use smart_compose::AppState;
use smart_compose::cache::{
    FeedbackRecord, RateLimitPolicy, RateLimiter, ReconnectPolicy, SuggestionCache,
};
use smart_compose::middleware::AdmissionControl;
use smart_compose::router::create_router;
use smart_compose::store::{KeyValueStore, MemoryStore, StoreClient, StoreError};
use smart_compose::suggest::{GenerationError, SuggestionGenerator, SuggestionService};
use tower::ServiceExt;

struct EchoGenerator;

#[async_trait]
impl SuggestionGenerator for EchoGenerator {
    async fn generate(
        &self,
        text: &str,
        _history: Option<&[FeedbackRecord]>,
    ) -> Result<String, GenerationError> {
        if text.contains("fail") {
            return Err(GenerationError::Upstream {
                status: 429,
                body: "quota exhausted".into(),
            });
        }
        Ok(format!("{text} continued."))
    }
}

/// 可以切换为不可用的存储
#[derive(Default)]
struct SwitchableStore {
    inner: MemoryStore,
    down: AtomicBool,
}

impl SwitchableStore {
    fn guard(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Transport("connection reset by peer".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStore for SwitchableStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.guard()
    }

    async fn reconnect(&self) -> Result<(), StoreError> {
        self.guard()
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.guard()?;
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        self.guard()?;
        self.inner.set_ex(key, value, ttl_secs).await
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        self.guard()?;
        self.inner.del(key).await
    }

    async fn record_hit(
        &self,
        key: &str,
        member: &str,
        now: f64,
        window_secs: u64,
    ) -> Result<u64, StoreError> {
        self.guard()?;
        self.inner.record_hit(key, member, now, window_secs).await
    }
}

async fn app_with<S: KeyValueStore + 'static>(store: Option<Arc<S>>) -> Router {
    let (cache, admission) = match store {
        Some(store) => {
            let store: Arc<dyn KeyValueStore> = store;
            let limiter = RateLimiter::connect(
                store.clone(),
                RateLimitPolicy::default(),
                ReconnectPolicy {
                    attempts: 3,
                    delay: Duration::ZERO,
                },
            )
            .await
            .unwrap();
            (
                Some(SuggestionCache::new(StoreClient::new(store))),
                Some(AdmissionControl::new(Arc::new(limiter))),
            )
        }
        None => (None, None),
    };

    let state = AppState {
        suggestions: SuggestionService::new(cache, Arc::new(EchoGenerator), 5),
    };
    create_router(state, admission, None)
}

async fn memory_app() -> Router {
    app_with(Some(Arc::new(MemoryStore::new()))).await
}

fn post_json(uri: &str, client: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(ip) = client {
        builder = builder.header("x-real-ip", ip);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn suggestion_request(client: Option<&str>, text: &str) -> Request<Body> {
    post_json(
        "/api/generate-suggestion",
        client,
        json!({ "current_text": text }),
    )
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn header_value(response: &axum::response::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

#[tokio::test]
async fn suggestion_is_cached_and_carries_quota_headers() {
    let app = memory_app().await;

    let first = app
        .clone()
        .oneshot(suggestion_request(Some("10.0.0.1"), "Dear Sir"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header_value(&first, "x-ratelimit-limit").as_deref(), Some("20"));
    assert_eq!(header_value(&first, "x-ratelimit-remaining").as_deref(), Some("19"));
    assert!(header_value(&first, "x-ratelimit-reset").is_some());
    assert_eq!(
        json_body(first).await,
        json!({ "suggestion": "Dear Sir continued.", "cached": false })
    );

    let second = app
        .oneshot(suggestion_request(Some("10.0.0.1"), "Dear Sir"))
        .await
        .unwrap();
    assert_eq!(header_value(&second, "x-ratelimit-remaining").as_deref(), Some("18"));
    assert_eq!(
        json_body(second).await,
        json!({ "suggestion": "Dear Sir continued.", "cached": true })
    );
}

#[tokio::test]
async fn twenty_first_request_in_window_is_rejected() {
    let app = memory_app().await;

    for _ in 0..20 {
        let response = app
            .clone()
            .oneshot(suggestion_request(Some("10.0.0.2"), "Kind"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let rejected = app
        .clone()
        .oneshot(suggestion_request(Some("10.0.0.2"), "Kind"))
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header_value(&rejected, "x-ratelimit-remaining").as_deref(), Some("0"));
    let body = json_body(rejected).await;
    assert_eq!(body["code"], 429);
    assert_eq!(
        body["error_message"],
        "Too many requests. Please try again later."
    );

    // 其他客户端不受影响
    let other = app
        .oneshot(suggestion_request(Some("10.0.0.3"), "Kind"))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn unidentified_client_is_forwarded_without_quota_headers() {
    let app = memory_app().await;

    let response = app.oneshot(suggestion_request(None, "Regards")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_value(&response, "x-ratelimit-limit").is_none());
}

#[tokio::test]
async fn limiter_fails_open_when_store_goes_down() {
    let store = Arc::new(SwitchableStore::default());
    let app = app_with(Some(store.clone())).await;

    store.down.store(true, Ordering::SeqCst);
    let response = app
        .oneshot(suggestion_request(Some("10.0.0.4"), "Sincerely"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, "x-ratelimit-remaining").as_deref(), Some("20"));
    assert_eq!(
        json_body(response).await,
        json!({ "suggestion": "Sincerely continued.", "cached": false })
    );
}

#[tokio::test]
async fn generation_failure_is_a_server_error() {
    let app = memory_app().await;

    let response = app
        .oneshot(suggestion_request(Some("10.0.0.5"), "please fail"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(
        body["error_message"]
            .as_str()
            .unwrap()
            .contains("quota exhausted")
    );
}

#[tokio::test]
async fn empty_text_returns_empty_suggestion() {
    let app = memory_app().await;

    let response = app
        .oneshot(suggestion_request(Some("10.0.0.6"), ""))
        .await
        .unwrap();

    assert_eq!(
        json_body(response).await,
        json!({ "suggestion": "", "cached": false })
    );
}

#[tokio::test]
async fn feedback_is_accepted_with_store() {
    let app = memory_app().await;

    let response = app
        .oneshot(post_json(
            "/api/feedback",
            Some("10.0.0.7"),
            json!({ "user_id": "u1", "context": "Dear Sir", "selected_text": "or Madam," }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn feedback_without_store_is_unavailable() {
    let app = app_with::<MemoryStore>(None).await;

    let response = app
        .oneshot(post_json(
            "/api/feedback",
            Some("10.0.0.8"),
            json!({ "user_id": "u1", "context": "Dear Sir", "selected_text": "or Madam," }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(header_value(&response, "x-ratelimit-limit").is_none());
}

#[tokio::test]
async fn health_reports_store_mode() {
    let with_store = memory_app()
        .await
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(
        json_body(with_store).await,
        json!({ "message": "Suggestive Text API is running.", "store": "enabled" })
    );

    let without_store = app_with::<MemoryStore>(None)
        .await
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(json_body(without_store).await["store"], "disabled");
}
