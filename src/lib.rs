use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use config::Config;
use middleware::RateLimiter;
use services::VibeService;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    pub vibes: VibeService,
    pub config: Arc<Config>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(vibes: VibeService, config: Arc<Config>) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_per_second, config.rate_limit_burst);
        Self {
            vibes,
            config,
            rate_limiter,
        }
    }
}

/// Full application router minus `/metrics`, which needs the global
/// Prometheus recorder and is attached by the binary.
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let vibe_routes = Router::new()
        .route(
            "/",
            post(handlers::vibes::create_vibe).get(handlers::vibes::list_vibes),
        )
        .route("/stats", get(handlers::vibes::get_stats))
        .route("/today", get(handlers::vibes::get_today))
        .route("/streak", get(handlers::vibes::get_streak))
        .route("/export", get(handlers::vibes::export_vibes))
        .route("/bulk", post(handlers::vibes::bulk_import))
        .route(
            "/:id",
            get(handlers::vibes::get_vibe)
                .put(handlers::vibes::update_vibe)
                .delete(handlers::vibes::delete_vibe),
        );

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .nest("/api/v1/vibes", vibe_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(CatchPanicLayer::new())
                .layer(TimeoutLayer::new(config.request_timeout()))
                .layer(CompressionLayer::new())
                .layer(cors_layer(&config)),
        )
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]);

    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(origins)
}
