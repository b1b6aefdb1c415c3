use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::cache::{RateDecision, RateLimiter};
use crate::cache::keys::{RATE_LIMIT_PREFIX, rate_limit_key};
use crate::error::AppError;

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// 准入控制中间件的状态
#[derive(Clone)]
pub struct AdmissionControl {
    limiter: Arc<RateLimiter>,
    prefix: String,
}

impl AdmissionControl {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self::with_prefix(limiter, RATE_LIMIT_PREFIX)
    }

    pub fn with_prefix(limiter: Arc<RateLimiter>, prefix: impl Into<String>) -> Self {
        Self {
            limiter,
            prefix: prefix.into(),
        }
    }
}

/// 客户端标识：优先 `X-Real-IP`，其次 `X-Forwarded-For` 的第一个地址，最后是连接地址
pub fn client_identity(req: &Request) -> Option<String> {
    let headers = req.headers();
    let forwarded = headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
        });

    forwarded.map(str::to_owned).or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
    })
}

fn annotate(headers: &mut HeaderMap, decision: &RateDecision) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(decision.reset_at));
}

/// 对每个请求做限流检查。
///
/// 超限时直接返回 429，不再转发；放行时在响应上附加额度信息。
/// 无法确定客户端标识时记录日志并原样转发。
pub async fn rate_limit(
    State(admission): State<AdmissionControl>,
    req: Request,
    next: Next,
) -> Response {
    let Some(client) = client_identity(&req) else {
        tracing::error!(path = %req.uri().path(), "cannot identify client, skipping rate limit");
        return next.run(req).await;
    };

    let key = rate_limit_key(&admission.prefix, &client);
    let decision = admission.limiter.check(&key).await;

    if !decision.allowed {
        tracing::info!(%client, "request rejected by rate limiter");
        let mut response = AppError::RateLimited.into_response();
        annotate(response.headers_mut(), &decision);
        return response;
    }

    let mut response = next.run(req).await;
    annotate(response.headers_mut(), &decision);
    response
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request_with(headers: &[(&str, &str)]) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/health");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn identity_prefers_real_ip_header() {
        let req = request_with(&[("x-real-ip", " 10.0.0.7 "), ("x-forwarded-for", "10.0.0.8")]);
        assert_eq!(client_identity(&req).as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn identity_takes_first_forwarded_address() {
        let req = request_with(&[("x-forwarded-for", " , 192.168.1.4, 10.0.0.1")]);
        assert_eq!(client_identity(&req).as_deref(), Some("192.168.1.4"));
    }

    #[test]
    fn identity_falls_back_to_peer_address() {
        let mut req = request_with(&[]);
        assert_eq!(client_identity(&req), None);

        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4567))));
        assert_eq!(client_identity(&req).as_deref(), Some("127.0.0.1"));
    }
}
