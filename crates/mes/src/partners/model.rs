use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::MesError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerType {
    Customer,
    Supplier,
}

impl PartnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartnerType::Customer => "customer",
            PartnerType::Supplier => "supplier",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: i64,
    pub partner_type: String,
    pub name: String,
    pub br_num: Option<String>,
    pub boss_name: Option<String>,
    pub boss_phone: Option<String>,
    pub representative_name: Option<String>,
    pub representative_phone: Option<String>,
    pub representative_email: Option<String>,
    pub address: Option<String>,
    pub remark: Option<String>,
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration form. Also used as the body of a full update, where
/// `active` may be supplied too.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPartner {
    pub partner_type: PartnerType,
    pub name: String,
    #[serde(default)]
    pub br_num: Option<String>,
    #[serde(default)]
    pub boss_name: Option<String>,
    #[serde(default)]
    pub boss_phone: Option<String>,
    #[serde(default)]
    pub representative_name: Option<String>,
    #[serde(default)]
    pub representative_phone: Option<String>,
    #[serde(default)]
    pub representative_email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

impl NewPartner {
    pub fn validate(&self) -> Result<(), MesError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(MesError::validation("partner name is required"));
        }
        if name.chars().count() > 50 {
            return Err(MesError::validation("partner name must be at most 50 characters"));
        }
        if let Some(email) = self.representative_email.as_deref().map(str::trim) {
            if !email.is_empty() && !email.contains('@') {
                return Err(MesError::validation(format!("invalid email: {email}")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerUpdate {
    #[serde(flatten)]
    pub fields: NewPartner,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActiveFlag {
    pub active: bool,
}
