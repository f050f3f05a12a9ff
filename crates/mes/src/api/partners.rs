use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::{ApiError, ApiState};
use crate::error::MesError;
use crate::partners::{ActiveFlag, NewPartner, Partner, PartnerType, PartnerUpdate};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerListQuery {
    pub partner_type: Option<PartnerType>,
}

pub async fn register_partner(
    State(st): State<ApiState>,
    Json(new): Json<NewPartner>,
) -> Result<impl IntoResponse, ApiError> {
    let partner = st.partners.register(new).await?;
    Ok((StatusCode::CREATED, Json(partner)))
}

pub async fn list_partners(
    State(st): State<ApiState>,
    Query(q): Query<PartnerListQuery>,
) -> Result<Json<Vec<Partner>>, ApiError> {
    Ok(Json(st.partners.list(q.partner_type).await?))
}

pub async fn get_partner(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<Partner>, ApiError> {
    let partner = st
        .partners
        .get(id)
        .await?
        .ok_or_else(|| MesError::not_found("partner", id))?;
    Ok(Json(partner))
}

pub async fn update_partner(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
    Json(update): Json<PartnerUpdate>,
) -> Result<Json<Partner>, ApiError> {
    Ok(Json(st.partners.update(id, update).await?))
}

pub async fn set_partner_status(
    State(st): State<ApiState>,
    Path(id): Path<i64>,
    Json(flag): Json<ActiveFlag>,
) -> Result<Json<Partner>, ApiError> {
    Ok(Json(st.partners.set_active(id, flag.active).await?))
}
