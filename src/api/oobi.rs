/// OOBI resolution endpoint
use crate::api::middleware::Session;
use crate::context::AppContext;
use crate::domain::oobi::{self, ResolveOobiRequest, ResolveOobiResponse};
use crate::error::BffResult;
use axum::{extract::State, routing::post, Json, Router};

pub fn routes() -> Router<AppContext> {
    Router::new().route("/oobi/resolve", post(resolve_oobi))
}

async fn resolve_oobi(
    State(ctx): State<AppContext>,
    session: Session,
    Json(request): Json<ResolveOobiRequest>,
) -> BffResult<Json<ResolveOobiResponse>> {
    let client = ctx.connector.connect(&session.bran).await?;
    let resolved =
        oobi::resolve_oobi(client.as_ref(), ctx.operation_timeout(), &request).await?;
    Ok(Json(resolved))
}
