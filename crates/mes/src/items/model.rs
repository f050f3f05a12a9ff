use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::MesError;

/// A raw material (paint, thinner, ...) bought from one supplier.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    pub id: i64,
    pub item_code: String,
    pub item_name: String,
    pub classification: Option<String>,
    pub color: Option<String>,
    pub spec: Option<String>,
    pub manufacturer: Option<String>,
    pub remark: Option<String>,
    pub supplier_id: i64,
    pub supplier_name: String,
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRawItem {
    pub item_code: String,
    pub item_name: String,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub spec: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    pub supplier_id: i64,
}

impl NewRawItem {
    pub fn validate(&self) -> Result<(), MesError> {
        if self.item_code.trim().is_empty() {
            return Err(MesError::validation("itemCode is required"));
        }
        if self.item_name.trim().is_empty() {
            return Err(MesError::validation("itemName is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItemUpdate {
    #[serde(flatten)]
    pub fields: NewRawItem,
    pub active: bool,
}
