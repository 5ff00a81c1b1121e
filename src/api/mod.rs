/// API routes and handlers
pub mod aids;
pub mod credentials;
pub mod middleware;
pub mod oobi;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(aids::routes())
        .merge(oobi::routes())
        .merge(credentials::routes())
}
