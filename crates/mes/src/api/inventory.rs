use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::{ApiError, ApiState, KeywordQuery};
use crate::inventory::{EligibleItem, Inbound, NewInbound, NewOutbound, Outbound, StockRow};

pub async fn inbound_eligible(
    State(st): State<ApiState>,
    Query(q): Query<KeywordQuery>,
) -> Result<Json<Vec<EligibleItem>>, ApiError> {
    Ok(Json(st.inventory.inbound_eligible(q.keyword.as_deref()).await?))
}

pub async fn register_inbound(
    State(st): State<ApiState>,
    Json(new): Json<NewInbound>,
) -> Result<impl IntoResponse, ApiError> {
    let inbound = st.inventory.register_inbound(new).await?;
    Ok((StatusCode::CREATED, Json(inbound)))
}

pub async fn list_inbound(State(st): State<ApiState>) -> Result<Json<Vec<Inbound>>, ApiError> {
    Ok(Json(st.inventory.list_inbound().await?))
}

pub async fn outbound_eligible(
    State(st): State<ApiState>,
    Query(q): Query<KeywordQuery>,
) -> Result<Json<Vec<StockRow>>, ApiError> {
    Ok(Json(st.inventory.outbound_eligible(q.keyword.as_deref()).await?))
}

pub async fn register_outbound(
    State(st): State<ApiState>,
    Json(new): Json<NewOutbound>,
) -> Result<impl IntoResponse, ApiError> {
    let outbound = st.inventory.register_outbound(new).await?;
    Ok((StatusCode::CREATED, Json(outbound)))
}

pub async fn list_outbound(State(st): State<ApiState>) -> Result<Json<Vec<Outbound>>, ApiError> {
    Ok(Json(st.inventory.list_outbound().await?))
}

pub async fn inventory_status(
    State(st): State<ApiState>,
    Query(q): Query<KeywordQuery>,
) -> Result<Json<Vec<StockRow>>, ApiError> {
    Ok(Json(st.inventory.inventory_status(q.keyword.as_deref()).await?))
}
