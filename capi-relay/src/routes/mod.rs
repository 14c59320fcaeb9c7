//! HTTP route handlers

mod track;

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::OriginalUri,
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use capi_core::RelayError;
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::AppState;

pub use track::{track_event, TrackAccepted};

/// Prefix every analytics route is mounted under
pub const ANALYTICS_PREFIX: &str = "/api/v1/analytics";

/// Liveness response
#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub success: bool,
    pub message: String,
}

/// Root banner
async fn root() -> &'static str {
    "Analytics Microservice is up and running!"
}

/// Liveness check
async fn ping() -> Json<PingResponse> {
    tracing::info!("GET /ping request received");
    Json(PingResponse {
        success: true,
        message: "Analytics routes are alive!".to_string(),
    })
}

/// 404 for anything that did not route
async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    tracing::warn!(method = %method, url = %uri, "404 Not Found");
    ApiError(RelayError::NotFound {
        requested_url: uri.to_string(),
    })
}

/// 500 for a handler that panicked
fn internal_error(err: Box<dyn Any + Send + 'static>) -> Response {
    let reason = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(reason = %reason, "Unhandled error in request pipeline");
    ApiError(RelayError::Internal { reason }).into_response()
}

fn analytics_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/track", post(track_event).fallback(not_found))
        .route("/ping", get(ping).fallback(not_found))
}

/// CORS policy: an explicit origin list with credentials, or any origin
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Create the router with all routes
pub fn create_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .nest(ANALYTICS_PREFIX, analytics_routes())
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(internal_error))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
}
