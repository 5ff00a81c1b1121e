/// HTTP server setup and routing
use crate::{
    api::middleware::resolve_session,
    context::AppContext,
    error::{BffError, BffResult},
    session::SESSION_HEADER,
};
use axum::{
    http::{header, HeaderName, Method, StatusCode},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    let session_header = HeaderName::from_static(SESSION_HEADER);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, session_header.clone()])
        // Browsers hide custom response headers unless exposed
        .expose_headers([session_header]);

    Router::new()
        // Health check endpoint (no session middleware)
        .route("/health", get(health_check))
        .merge(
            crate::api::routes()
                .layer(middleware::from_fn_with_state(ctx.clone(), resolve_session)),
        )
        .with_state(ctx)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> BffResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("🚀 vLEI BFF listening on {}", addr);
    info!("   Agent admin URL: {}", ctx.config.agent.admin_url);
    info!("   Session mode: {:?}", ctx.config.session.mode);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BffError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| BffError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
