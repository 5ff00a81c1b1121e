/// Session credential middleware
///
/// Resolves the inbound `x-session-bran` header into a usable bran before
/// the handler runs and stamps the presentable form onto every response,
/// so a fresh client learns its session credential from its first call.
use crate::context::AppContext;
use crate::session::{self, ResolvedSession, SESSION_HEADER};
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

pub async fn resolve_session(
    State(ctx): State<AppContext>,
    mut req: Request,
    next: Next,
) -> Response {
    let header = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.to_string());

    let session = session::resolve(header.as_deref(), &ctx.config.session);
    if session.newly_minted {
        tracing::debug!("Minted new session bran for request");
    }

    let outbound = session::present(&session.bran, &ctx.config.session);
    req.extensions_mut().insert(session);

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&outbound) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// Extension alias handlers pull the resolved session from
pub type Session = axum::Extension<ResolvedSession>;
