use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;

use smart_compose::{
    AppState,
    cache::{RateLimitPolicy, RateLimiter, ReconnectPolicy, SuggestionCache},
    config::Config,
    middleware::AdmissionControl,
    router::create_router,
    store::{KeyValueStore, RedisStore, StoreClient},
    suggest::{GeminiGenerator, SuggestionService},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let generator = match GeminiGenerator::new(
        config.gemini_api_base.clone(),
        config.gemini_model.clone(),
        config.gemini_api_key.clone(),
        config.generation_timeout(),
    ) {
        Ok(generator) => Arc::new(generator),
        Err(e) => {
            tracing::error!(error = %e, "failed to create generation client");
            return ExitCode::FAILURE;
        }
    };

    // 存储是可选的：没有配置或连不上时，缓存、反馈和限流降级
    let (cache, admission) = match open_store(&config) {
        Some(store) => {
            let cache = SuggestionCache::with_ttl(StoreClient::new(store.clone()), config.cache_ttl_secs);
            let policy = RateLimitPolicy {
                max_requests: config.rate_limit_requests,
                window_secs: config.rate_limit_window_secs,
            };
            let admission = match RateLimiter::connect(store, policy, ReconnectPolicy::default()).await {
                Ok(limiter) => Some(AdmissionControl::new(Arc::new(limiter))),
                Err(e) => {
                    tracing::error!(error = %e, "rate limiter disabled: store is unreachable");
                    None
                }
            };
            (Some(cache), admission)
        }
        None => {
            tracing::info!("No REDIS_URL provided, running without caching or rate limiting");
            (None, None)
        }
    };

    let state = AppState {
        suggestions: SuggestionService::new(cache, generator, config.history_limit),
    };
    let app = create_router(state, admission, config.static_dir.as_deref());

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!(error = %e, "server terminated");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn open_store(config: &Config) -> Option<Arc<dyn KeyValueStore>> {
    let url = config.redis_url.as_deref()?;
    match RedisStore::open(url, config.store_timeout()) {
        Ok(store) => {
            tracing::info!("Using Redis store");
            Some(Arc::new(store))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis not available, running without Redis features");
            None
        }
    }
}
