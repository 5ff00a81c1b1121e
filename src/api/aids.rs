/// Identifier endpoints
use crate::api::middleware::Session;
use crate::context::AppContext;
use crate::domain::aids::{
    self, Aid, CreateAidRequest, EventsQuery, EventsResponse, GenerateOobiQuery,
    GenerateOobiResponse, ListAidsQuery, ListAidsResponse, RotateRequest, RotateResponse,
    SignRequest, SignResponse, VerifyRequest, VerifyResponse,
};
use crate::error::BffResult;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/aids", post(create_aid).get(list_aids))
        .route("/aids/:alias/sign", post(sign_message))
        .route("/aids/:alias/verify", post(verify_message))
        .route("/aids/:alias/rotate", post(rotate_keys))
        .route("/aids/:alias/events", get(list_events))
        .route("/aids/:alias/oobi", get(generate_oobi))
}

async fn create_aid(
    State(ctx): State<AppContext>,
    session: Session,
    Json(request): Json<CreateAidRequest>,
) -> BffResult<Json<Aid>> {
    let client = ctx.connector.connect(&session.bran).await?;
    let aid = aids::create_aid(
        client.as_ref(),
        &ctx.config.keri,
        ctx.operation_timeout(),
        &request,
    )
    .await?;
    Ok(Json(aid))
}

async fn list_aids(
    State(ctx): State<AppContext>,
    session: Session,
    Query(query): Query<ListAidsQuery>,
) -> BffResult<Json<ListAidsResponse>> {
    let client = ctx.connector.connect(&session.bran).await?;
    Ok(Json(aids::list_aids(client.as_ref(), &query).await?))
}

async fn sign_message(
    State(ctx): State<AppContext>,
    session: Session,
    Path(alias): Path<String>,
    Json(request): Json<SignRequest>,
) -> BffResult<Json<SignResponse>> {
    let client = ctx.connector.connect(&session.bran).await?;
    let signed =
        aids::sign_message(client.as_ref(), ctx.operation_timeout(), &alias, &request).await?;
    Ok(Json(signed))
}

async fn verify_message(
    State(ctx): State<AppContext>,
    session: Session,
    Path(alias): Path<String>,
    Json(request): Json<VerifyRequest>,
) -> BffResult<Json<VerifyResponse>> {
    let client = ctx.connector.connect(&session.bran).await?;
    Ok(Json(
        aids::verify_message(client.as_ref(), &alias, &request).await?,
    ))
}

async fn rotate_keys(
    State(ctx): State<AppContext>,
    session: Session,
    Path(alias): Path<String>,
    Json(request): Json<RotateRequest>,
) -> BffResult<Json<RotateResponse>> {
    let client = ctx.connector.connect(&session.bran).await?;
    let rotated =
        aids::rotate_keys(client.as_ref(), ctx.operation_timeout(), &alias, &request).await?;
    Ok(Json(rotated))
}

async fn list_events(
    State(ctx): State<AppContext>,
    session: Session,
    Path(alias): Path<String>,
    Query(query): Query<EventsQuery>,
) -> BffResult<Json<EventsResponse>> {
    let client = ctx.connector.connect(&session.bran).await?;
    Ok(Json(
        aids::list_events(client.as_ref(), &alias, &query).await?,
    ))
}

async fn generate_oobi(
    State(ctx): State<AppContext>,
    session: Session,
    Path(alias): Path<String>,
    Query(query): Query<GenerateOobiQuery>,
) -> BffResult<Json<GenerateOobiResponse>> {
    let client = ctx.connector.connect(&session.bran).await?;
    Ok(Json(
        aids::generate_oobi(client.as_ref(), &alias, &query).await?,
    ))
}
