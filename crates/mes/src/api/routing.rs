use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::{ApiError, ApiState, KeywordQuery};
use crate::error::MesError;
use crate::routing::{
    BatchUpdate, NewOperation, Operation, OperationPatch, OrderEntry, Page, SearchQuery,
};

type OpsResult = Result<Json<Vec<Operation>>, ApiError>;

// ---- Status board: every write answers with the refreshed list ----

pub async fn list_status(State(st): State<ApiState>) -> OpsResult {
    Ok(Json(st.operations.list_status().await?))
}

pub async fn start_operation(State(st): State<ApiState>, Path(id): Path<i64>) -> OpsResult {
    st.operations.start(id).await?;
    Ok(Json(st.operations.list_status().await?))
}

pub async fn update_operation(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
    Json(patch): Json<OperationPatch>,
) -> OpsResult {
    st.operations.update(id, &patch).await?;
    Ok(Json(st.operations.list_status().await?))
}

pub async fn update_order(
    State(st): State<ApiState>,
    Json(entries): Json<Vec<OrderEntry>>,
) -> OpsResult {
    st.operations.reorder(&entries).await?;
    Ok(Json(st.operations.list_status().await?))
}

pub async fn apply_batch(State(st): State<ApiState>, Json(batch): Json<BatchUpdate>) -> OpsResult {
    st.operations.apply_batch(&batch).await?;
    Ok(Json(st.operations.list_status().await?))
}

// ---- Registry ----

pub async fn register(
    State(st): State<ApiState>,
    Json(new): Json<NewOperation>,
) -> Result<impl IntoResponse, ApiError> {
    let op = st.operations.register(new).await?;
    Ok((StatusCode::CREATED, Json(op)))
}

pub async fn search(
    State(st): State<ApiState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Page<Operation>>, ApiError> {
    Ok(Json(st.operations.search(&q).await?))
}

#[derive(Debug, Deserialize)]
pub struct CheckCodeQuery {
    pub code: Option<String>,
}

pub async fn check_code(
    State(st): State<ApiState>,
    Query(q): Query<CheckCodeQuery>,
) -> Result<Json<bool>, ApiError> {
    let code = q
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| MesError::validation("code is required"))?;
    Ok(Json(st.operations.is_code_taken(code).await?))
}

pub async fn delete_operation(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    st.operations.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn catalogue(
    State(st): State<ApiState>,
    Query(q): Query<KeywordQuery>,
) -> OpsResult {
    Ok(Json(st.operations.catalogue(q.keyword.as_deref()).await?))
}
