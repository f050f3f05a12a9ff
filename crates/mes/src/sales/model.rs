use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::MesError;

pub const ITEM_CODE_MAX: usize = 20;
pub const ITEM_NAME_MAX: usize = 100;
pub const CLASSIFICATION_MAX: usize = 20;

/// One step of a sales item's routing, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    pub seq: i32,
    pub operation_id: i64,
    pub code: String,
    pub name: String,
    pub standard_time: i32,
}

/// A customer's part we coat, with the operations it goes through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesItem {
    pub id: i64,
    pub partner_id: i64,
    pub partner_name: String,
    pub item_code: String,
    pub item_name: String,
    pub classification: String,
    pub unit: Option<String>,
    pub price: Option<i32>,
    pub color: Option<String>,
    pub coating_method: Option<String>,
    pub remark: Option<String>,
    pub active: bool,
    pub total_operations: i32,
    pub routing: Vec<RouteStep>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SalesItemRow {
    pub id: i64,
    pub partner_id: i64,
    pub partner_name: String,
    pub item_code: String,
    pub item_name: String,
    pub classification: String,
    pub unit: Option<String>,
    pub price: Option<i32>,
    pub color: Option<String>,
    pub coating_method: Option<String>,
    pub remark: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SalesItemRow {
    pub fn with_routing(self, routing: Vec<RouteStep>) -> SalesItem {
        SalesItem {
            id: self.id,
            partner_id: self.partner_id,
            partner_name: self.partner_name,
            item_code: self.item_code,
            item_name: self.item_name,
            classification: self.classification,
            unit: self.unit,
            price: self.price,
            color: self.color,
            coating_method: self.coating_method,
            remark: self.remark,
            active: self.active,
            total_operations: routing.len() as i32,
            routing,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSalesItem {
    pub partner_id: i64,
    pub item_code: String,
    pub item_name: String,
    pub classification: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub price: Option<i32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub coating_method: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    /// Operation ids in processing order. Repeats are allowed.
    #[serde(default)]
    pub operation_ids: Vec<i64>,
}

fn required(value: &str, field: &str, max: usize) -> Result<(), MesError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MesError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(MesError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

impl NewSalesItem {
    pub fn validate(&self) -> Result<(), MesError> {
        required(&self.item_code, "itemCode", ITEM_CODE_MAX)?;
        required(&self.item_name, "itemName", ITEM_NAME_MAX)?;
        required(&self.classification, "classification", CLASSIFICATION_MAX)?;
        if self.price.is_some_and(|p| p < 0) {
            return Err(MesError::validation("price must be >= 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesItemUpdate {
    #[serde(flatten)]
    pub fields: NewSalesItem,
    pub active: bool,
}

/// An active sales item of an active customer, offered for inbound.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SalesEligibleItem {
    pub sales_item_id: i64,
    pub partner_id: i64,
    pub customer_name: String,
    pub item_code: String,
    pub item_name: String,
    pub classification: String,
    pub color: Option<String>,
    pub coating_method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SalesInbound {
    pub id: i64,
    pub lot_number: String,
    pub sales_item_id: i64,
    pub item_code: String,
    pub item_name: String,
    pub customer_name: String,
    pub qty: i32,
    pub received_at: NaiveDate,
    pub cancelled: bool,
    pub outbound_processed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSalesInbound {
    pub sales_item_id: i64,
    pub qty: i32,
    pub received_at: NaiveDate,
}

impl NewSalesInbound {
    pub fn validate(&self) -> Result<(), MesError> {
        if self.qty <= 0 {
            return Err(MesError::validation("qty must be > 0"));
        }
        Ok(())
    }
}

/// The sheet that travels with a LOT through the line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    pub inbound_id: i64,
    pub lot_number: String,
    pub qty: i32,
    pub received_at: NaiveDate,
    pub customer_name: String,
    pub item_code: String,
    pub item_name: String,
    pub classification: String,
    pub color: Option<String>,
    pub coating_method: Option<String>,
    pub note: Option<String>,
    pub routing: Vec<RouteStep>,
}
