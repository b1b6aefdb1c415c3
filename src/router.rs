use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::{
    AppState,
    middleware::{AdmissionControl, log_errors, rate_limit},
    routes,
};

// API 路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/generate-suggestion",
            post(routes::suggestion::generate_suggestion),
        )
        .route("/api/feedback", post(routes::feedback::submit_feedback))
        .route("/api/health", get(routes::health::health_check))
}

/// 组装完整应用。
///
/// `admission` 为 `None` 时不做限流；`static_dir` 存在时作为兜底的静态文件目录。
pub fn create_router(
    state: AppState,
    admission: Option<AdmissionControl>,
    static_dir: Option<&str>,
) -> Router {
    let mut router = api_routes();
    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    let mut router = router
        .with_state(state)
        .layer(axum::middleware::from_fn(log_errors));

    // 限流在日志之外，被拒绝的请求不会进入业务路由
    if let Some(admission) = admission {
        router = router.layer(axum::middleware::from_fn_with_state(admission, rate_limit));
    }

    router.layer(CorsLayer::permissive())
}
