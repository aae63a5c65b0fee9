//! HTTP API gateway for Tutorbot.
//!
//! Serves the tutoring API (`/api/normalize`, `/api/chat`), a health check,
//! and the embedded browser client.
//!
//! Built on Axum for high performance async HTTP.

pub mod api;
pub mod frontend;

#[cfg(test)]
pub(crate) mod test_support;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use tutorbot_config::{AppConfig, GatewayConfig, TutorConfig};
use tutorbot_core::provider::Provider;
use tutorbot_core::session::SessionStore;
use tutorbot_knowledge::TopicLibrary;
use tutorbot_providers::LlmGateway;
use tutorbot_sessions::InMemorySessionStore;
use tutorbot_tutor::{DialogEngine, Normalizer};

/// Shared application state for the gateway.
pub struct AppState {
    pub engine: DialogEngine,
    pub normalizer: Normalizer,
    pub sessions: Arc<dyn SessionStore>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: &str,
        topics: TopicLibrary,
        tutor: TutorConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let gateway = LlmGateway::new(provider, model);
        let normalizer = Normalizer::new(gateway.clone(), Arc::new(topics), &tutor);
        Self {
            engine: DialogEngine::new(gateway, tutor),
            normalizer,
            sessions,
        }
    }

    /// Build every subsystem once from configuration: topic library,
    /// provider, and the in-memory session store.
    pub fn from_config(config: &AppConfig) -> Self {
        let topics = TopicLibrary::load_dir(&config.knowledge.topics_dir);
        let provider = tutorbot_providers::router::build_from_config(config);
        Self::new(
            provider,
            &config.model,
            topics,
            config.tutor.clone(),
            Arc::new(InMemorySessionStore::new()),
        )
    }
}

/// Build the full router.
///
/// Layers applied:
/// - Request body size limit
/// - Per-client minimum interval between `/api/*` requests
/// - CORS (permissive unless origins are configured)
/// - HTTP trace logging
pub fn build_router(state: SharedState, gateway: &GatewayConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .merge(api::api_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(gateway.max_body_bytes));

    if gateway.rate_limit_interval_ms > 0 {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(
            gateway.rate_limit_interval_ms,
        )));
        router = router.layer(middleware::from_fn(move |req, next| {
            let limiter = limiter.clone();
            rate_limit_middleware(limiter, req, next)
        }));
    }

    router
        .layer(cors_layer(&gateway.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(AppState::from_config(&config));
    let app = build_router(state, &config.gateway);

    info!(
        addr = %addr,
        provider = %config.provider,
        model = %config.model,
        "Tutorbot gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// --- Rate Limiter ---

/// Minimum-interval rate limiter.
///
/// Remembers the last accepted request per client key; a request arriving
/// sooner than `min_interval` after it is rejected and does not move the mark.
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
struct RateLimiter {
    min_interval: Duration,
    clients: std::sync::Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            clients: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the request is allowed.
    fn check(&self, client_key: &str) -> bool {
        self.check_at(client_key, Instant::now())
    }

    fn check_at(&self, client_key: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        // Periodic cleanup: if map grows too large, evict stale entries
        if clients.len() > 10_000 {
            clients.retain(|_, last| now.duration_since(*last) < self.min_interval);
        }

        match clients.get(client_key) {
            Some(last) if now.duration_since(*last) < self.min_interval => false,
            _ => {
                clients.insert(client_key.to_string(), now);
                true
            }
        }
    }
}

/// First `X-Forwarded-For` entry, else the peer address, else "anonymous".
fn client_key(req: &axum::extract::Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Rate limiting middleware for `/api/*`. Static assets and `/health` pass
/// through untouched. Returns 429 with a JSON error when exceeded.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: axum::extract::Request,
    next: Next,
) -> Response {
    if !req.uri().path().starts_with("/api/") {
        return next.run(req).await;
    }

    let client = client_key(&req);
    if !limiter.check(&client) {
        warn!(client = %client.chars().take(45).collect::<String>(), "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(api::ErrorResponse {
                error: "Too many requests. Try again shortly.".into(),
            }),
        )
            .into_response();
    }

    next.run(req).await
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sessions: usize,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let sessions = state.sessions.count().await.unwrap_or_else(|e| {
        warn!(error = %e, "Session count unavailable");
        0
    });
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions,
    })
}
