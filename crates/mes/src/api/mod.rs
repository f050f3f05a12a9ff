use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{domain_error, MesError};
use crate::inventory::InventoryRepo;
use crate::items::RawItemsRepo;
use crate::partners::PartnersRepo;
use crate::routing::OperationsRepo;
use crate::sales::SalesRepo;

pub mod inventory;
pub mod items;
pub mod partners;
pub mod routing;
pub mod sales;

#[derive(Clone)]
pub struct ApiState {
    pub operations: OperationsRepo,
    pub partners: PartnersRepo,
    pub items: RawItemsRepo,
    pub inventory: InventoryRepo,
    pub sales: SalesRepo,
}

impl ApiState {
    pub fn new(pool: sqlx::PgPool, page_limit_max: i64) -> Self {
        Self {
            operations: OperationsRepo::new(pool.clone()).with_page_limit_max(page_limit_max),
            partners: PartnersRepo::new(pool.clone()),
            items: RawItemsRepo::new(pool.clone()),
            inventory: InventoryRepo::new(pool.clone()),
            sales: SalesRepo::new(pool),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        // Routing (process) status board
        .route("/info/routing/status", get(routing::list_status))
        .route("/info/routing/order", put(routing::update_order))
        .route("/info/routing/batch", put(routing::apply_batch))
        .route("/info/routing/:id/start", patch(routing::start_operation))
        // Process registry
        .route(
            "/info/routing",
            get(routing::search).post(routing::register),
        )
        .route("/info/routing/check-code", get(routing::check_code))
        .route(
            "/info/routing/:id",
            put(routing::update_operation).delete(routing::delete_operation),
        )
        .route("/api/operations", get(routing::catalogue))
        // Partners
        .route(
            "/partners",
            get(partners::list_partners).post(partners::register_partner),
        )
        .route(
            "/partners/:id",
            get(partners::get_partner).put(partners::update_partner),
        )
        .route("/partners/:id/status", patch(partners::set_partner_status))
        // Raw items
        .route("/raws-items", get(items::list_items).post(items::register_item))
        .route("/raws-items/:id", get(items::get_item).put(items::update_item))
        .route("/raws-items/:id/status", patch(items::set_item_status))
        // Inventory
        .route(
            "/raw-inbound/eligible-items",
            get(inventory::inbound_eligible),
        )
        .route(
            "/raw-inbound",
            get(inventory::list_inbound).post(inventory::register_inbound),
        )
        .route(
            "/raw-outbound/eligible-items",
            get(inventory::outbound_eligible),
        )
        .route(
            "/raw-outbound",
            get(inventory::list_outbound).post(inventory::register_outbound),
        )
        .route("/inventory/raw-items", get(inventory::inventory_status))
        // Sales items and their routing
        .route(
            "/sales-items",
            get(sales::list_items).post(sales::register_item),
        )
        .route(
            "/sales-items/:id",
            get(sales::get_item).put(sales::update_item),
        )
        .route("/sales-items/:id/status", patch(sales::set_item_status))
        // Sales inbound and work orders
        .route(
            "/sales-inbound/eligible-items",
            get(sales::inbound_eligible),
        )
        .route(
            "/sales-inbound",
            get(sales::list_inbound).post(sales::register_inbound),
        )
        .route("/sales-inbound/:id", get(sales::get_inbound))
        .route("/sales-inbound/:id/cancel", patch(sales::cancel_inbound))
        .route("/work-order/:id", get(sales::work_order))
        // Health
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Handler error: wraps whatever a repo returned and picks the status.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub fn status_for(err: &anyhow::Error) -> StatusCode {
    match domain_error(err) {
        Some(MesError::NotFound { .. }) => StatusCode::NOT_FOUND,
        Some(MesError::Conflict(_)) | Some(MesError::InvalidTransition { .. }) => {
            StatusCode::CONFLICT
        }
        Some(MesError::Validation(_)) => StatusCode::BAD_REQUEST,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let error = match domain_error(&self.0) {
            Some(domain) => domain.to_string(),
            None => {
                // the chain can name tables and SQL; it stays in the log
                tracing::error!(error = ?self.0, "request failed");
                "internal server error".to_string()
            }
        };
        if status.is_client_error() {
            tracing::debug!(%status, %error, "request rejected");
        }
        (status, Json(ErrorBody { error })).into_response()
    }
}

/// Shared `?keyword=` query.
#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    pub keyword: Option<String>,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
