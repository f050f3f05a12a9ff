use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::MesError;

/// An active raw item from an active supplier, offered for inbound.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EligibleItem {
    pub raw_item_id: i64,
    pub supplier_id: i64,
    pub supplier_name: String,
    pub item_code: String,
    pub item_name: String,
    pub spec: Option<String>,
    pub manufacturer: Option<String>,
    pub remark: Option<String>,
    pub color: Option<String>,
}

/// Current stock of one raw item.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockRow {
    pub inventory_id: i64,
    pub raw_item_id: i64,
    pub supplier_name: String,
    pub item_code: String,
    pub item_name: String,
    pub spec: Option<String>,
    pub manufacturer: Option<String>,
    pub qty: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Inbound {
    pub id: i64,
    pub lot_number: String,
    pub raw_item_id: i64,
    pub item_name: String,
    pub qty: i32,
    pub inbound_date: NaiveDate,
    pub manufacturing_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInbound {
    pub raw_item_id: i64,
    pub qty: i32,
    pub inbound_date: NaiveDate,
    pub manufacturing_date: NaiveDate,
}

impl NewInbound {
    pub fn validate(&self) -> Result<(), MesError> {
        if self.qty <= 0 {
            return Err(MesError::validation("qty must be > 0"));
        }
        if self.manufacturing_date > self.inbound_date {
            return Err(MesError::validation(
                "manufacturingDate must not be after inboundDate",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Outbound {
    pub id: i64,
    pub outbound_number: String,
    pub raw_item_id: i64,
    pub item_name: String,
    pub qty: i32,
    pub outbound_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOutbound {
    pub raw_item_id: i64,
    pub qty: i32,
    pub outbound_date: NaiveDate,
}

impl NewOutbound {
    pub fn validate(&self) -> Result<(), MesError> {
        if self.qty <= 0 {
            return Err(MesError::validation("qty must be > 0"));
        }
        Ok(())
    }
}
