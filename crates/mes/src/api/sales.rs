use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::{ApiError, ApiState, KeywordQuery};
use crate::error::MesError;
use crate::partners::ActiveFlag;
use crate::sales::{
    NewSalesInbound, NewSalesItem, SalesEligibleItem, SalesInbound, SalesItem, SalesItemUpdate,
    WorkOrder,
};

// ---- Sales items ----

pub async fn register_item(
    State(st): State<ApiState>,
    Json(new): Json<NewSalesItem>,
) -> Result<impl IntoResponse, ApiError> {
    let item = st.sales.register_item(new).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_items(
    State(st): State<ApiState>,
    Query(q): Query<KeywordQuery>,
) -> Result<Json<Vec<SalesItem>>, ApiError> {
    Ok(Json(st.sales.list_items(q.keyword.as_deref()).await?))
}

pub async fn get_item(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<SalesItem>, ApiError> {
    let item = st
        .sales
        .get_item(id)
        .await?
        .ok_or_else(|| MesError::not_found("sales item", id))?;
    Ok(Json(item))
}

pub async fn update_item(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
    Json(update): Json<SalesItemUpdate>,
) -> Result<Json<SalesItem>, ApiError> {
    Ok(Json(st.sales.update_item(id, update).await?))
}

pub async fn set_item_status(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
    Json(flag): Json<ActiveFlag>,
) -> Result<Json<SalesItem>, ApiError> {
    Ok(Json(st.sales.set_item_active(id, flag.active).await?))
}

// ---- Sales inbound ----

pub async fn inbound_eligible(
    State(st): State<ApiState>,
    Query(q): Query<KeywordQuery>,
) -> Result<Json<Vec<SalesEligibleItem>>, ApiError> {
    Ok(Json(st.sales.inbound_eligible(q.keyword.as_deref()).await?))
}

pub async fn register_inbound(
    State(st): State<ApiState>,
    Json(new): Json<NewSalesInbound>,
) -> Result<impl IntoResponse, ApiError> {
    let inbound = st.sales.register_inbound(new).await?;
    Ok((StatusCode::CREATED, Json(inbound)))
}

pub async fn list_inbound(
    State(st): State<ApiState>,
    Query(q): Query<KeywordQuery>,
) -> Result<Json<Vec<SalesInbound>>, ApiError> {
    Ok(Json(st.sales.list_inbound(q.keyword.as_deref()).await?))
}

pub async fn get_inbound(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<SalesInbound>, ApiError> {
    let inbound = st
        .sales
        .get_inbound(id)
        .await?
        .ok_or_else(|| MesError::not_found("sales inbound", id))?;
    Ok(Json(inbound))
}

pub async fn cancel_inbound(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<SalesInbound>, ApiError> {
    Ok(Json(st.sales.cancel_inbound(id).await?))
}

pub async fn work_order(
    State(st): State<ApiState>,
    Path(inbound_id): Path<i64>,
) -> Result<Json<WorkOrder>, ApiError> {
    Ok(Json(st.sales.work_order(inbound_id).await?))
}
