/// Credential endpoints
use crate::api::middleware::Session;
use crate::context::AppContext;
use crate::domain::credentials::{
    self, IssueCredentialRequest, IssueCredentialResponse, ListCredentialsResponse,
};
use crate::error::BffResult;
use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListCredentialsQuery {
    pub issuer: String,
}

pub fn routes() -> Router<AppContext> {
    Router::new().route("/credentials", post(issue_credential).get(list_credentials))
}

async fn issue_credential(
    State(ctx): State<AppContext>,
    session: Session,
    Json(request): Json<IssueCredentialRequest>,
) -> BffResult<Json<IssueCredentialResponse>> {
    let client = ctx.connector.connect(&session.bran).await?;
    let issued =
        credentials::issue_credential(client.as_ref(), ctx.operation_timeout(), &request).await?;
    Ok(Json(issued))
}

async fn list_credentials(
    State(ctx): State<AppContext>,
    session: Session,
    Query(query): Query<ListCredentialsQuery>,
) -> BffResult<Json<ListCredentialsResponse>> {
    let client = ctx.connector.connect(&session.bran).await?;
    Ok(Json(
        credentials::list_credentials(client.as_ref(), &query.issuer).await?,
    ))
}
