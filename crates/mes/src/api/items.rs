use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::{ApiError, ApiState};
use crate::error::MesError;
use crate::items::{NewRawItem, RawItem, RawItemUpdate};
use crate::partners::ActiveFlag;

pub async fn register_item(
    State(st): State<ApiState>,
    Json(new): Json<NewRawItem>,
) -> Result<impl IntoResponse, ApiError> {
    let item = st.items.register(new).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_items(State(st): State<ApiState>) -> Result<Json<Vec<RawItem>>, ApiError> {
    Ok(Json(st.items.list().await?))
}

pub async fn get_item(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<RawItem>, ApiError> {
    let item = st
        .items
        .get(id)
        .await?
        .ok_or_else(|| MesError::not_found("raw item", id))?;
    Ok(Json(item))
}

pub async fn update_item(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
    Json(update): Json<RawItemUpdate>,
) -> Result<Json<RawItem>, ApiError> {
    Ok(Json(st.items.update(id, update).await?))
}

pub async fn set_item_status(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
    Json(flag): Json<ActiveFlag>,
) -> Result<Json<RawItem>, ApiError> {
    Ok(Json(st.items.set_active(id, flag.active).await?))
}
