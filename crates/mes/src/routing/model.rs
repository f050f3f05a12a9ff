use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MesError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "PENDING",
            OperationStatus::InProgress => "IN_PROGRESS",
            OperationStatus::Completed => "COMPLETED",
            OperationStatus::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// PENDING -> IN_PROGRESS -> COMPLETED, with ERROR reachable from
    /// either live state. Staying put is always allowed.
    pub fn can_transition_to(&self, next: OperationStatus) -> bool {
        use OperationStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Pending, InProgress) | (InProgress, Completed) | (Pending, Error) | (InProgress, Error)
        )
    }

    pub fn check_transition(&self, next: OperationStatus) -> Result<(), MesError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(MesError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A manufacturing process step as served by `/info/routing/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: i64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub standard_time: i32,
    pub status: OperationStatus,
    pub order: i32,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct OperationRow {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub standard_time: i32,
    pub status: String,
    pub operation_order: i32,
    pub start_time: Option<DateTime<Utc>>,
}

impl TryFrom<OperationRow> for Operation {
    type Error = anyhow::Error;

    fn try_from(row: OperationRow) -> Result<Self, Self::Error> {
        let status = OperationStatus::parse(&row.status)
            .ok_or_else(|| anyhow::anyhow!("unknown operation status in db: {}", row.status))?;
        Ok(Self {
            id: row.id,
            code: row.code,
            name: row.name,
            description: row.description,
            standard_time: row.standard_time,
            status,
            order: row.operation_order,
            start_time: row.start_time,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOperation {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub standard_time: i32,
}

impl NewOperation {
    pub fn validate(&self) -> Result<(), MesError> {
        if self.code.trim().is_empty() {
            return Err(MesError::validation("code is required"));
        }
        if self.code.chars().count() > 20 {
            return Err(MesError::validation("code must be at most 20 characters"));
        }
        validate_name(&self.name)?;
        if self.standard_time < 0 {
            return Err(MesError::validation("standardTime must be >= 0"));
        }
        Ok(())
    }
}

/// Partial update: absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_time: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OperationStatus>,
}

impl OperationPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn status(status: OperationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// True when applying the patch to `op` would leave it unchanged.
    /// Code and name are stored trimmed, so they are compared trimmed.
    pub fn is_noop_for(&self, op: &Operation) -> bool {
        self.code.as_deref().map_or(true, |c| c.trim() == op.code)
            && self.name.as_deref().map_or(true, |n| n.trim() == op.name)
            && self
                .description
                .as_ref()
                .map_or(true, |d| Some(d) == op.description.as_ref())
            && self.standard_time.map_or(true, |t| t == op.standard_time)
            && self.status.map_or(true, |s| s == op.status)
    }

    pub fn validate(&self) -> Result<(), MesError> {
        if let Some(code) = &self.code {
            if code.trim().is_empty() {
                return Err(MesError::validation("code must not be blank"));
            }
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(t) = self.standard_time {
            if t < 0 {
                return Err(MesError::validation("standardTime must be >= 0"));
            }
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), MesError> {
    if name.trim().is_empty() {
        return Err(MesError::validation("name is required"));
    }
    if name.chars().count() > 50 {
        return Err(MesError::validation("name must be at most 50 characters"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub id: i64,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    pub id: i64,
    pub name: String,
}

/// Reorder plus renames, applied by the server in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpdate {
    pub orders: Vec<OrderEntry>,
    #[serde(default)]
    pub names: Vec<NameEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    All,
    Code,
    Name,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub search_type: SearchType,
    pub search_term: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, page: i64, size: i64, total_elements: i64) -> Self {
        let total_pages = if size <= 0 {
            0
        } else {
            (total_elements + size - 1) / size
        };
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OperationStatus::*;

    fn op(status: OperationStatus) -> Operation {
        Operation {
            id: 1,
            code: "OP-10".into(),
            name: "Cutting".into(),
            description: None,
            standard_time: 15,
            status,
            order: 1,
            start_time: None,
        }
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Error.can_transition_to(Pending));
        assert!(InProgress.can_transition_to(Error));
    }

    #[test]
    fn terminal_states_reject_change_but_allow_same() {
        assert!(Completed.is_terminal());
        assert!(Error.is_terminal());
        assert!(Completed.check_transition(Completed).is_ok());
        assert!(matches!(
            Completed.check_transition(Pending),
            Err(MesError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        assert_eq!(OperationStatus::parse("in_progress"), Some(InProgress));
        assert_eq!(OperationStatus::parse("paused"), None);
    }

    #[test]
    fn operation_uses_camel_case_fields() {
        let value = serde_json::to_value(op(Pending)).unwrap();
        assert_eq!(value["standardTime"], 15);
        assert_eq!(value["order"], 1);
        assert!(value["startTime"].is_null());
    }

    #[test]
    fn patch_omits_absent_fields() {
        let body = serde_json::to_value(OperationPatch::rename("Painting")).unwrap();
        assert_eq!(body, serde_json::json!({ "name": "Painting" }));

        let body = serde_json::to_value(OperationPatch::status(Completed)).unwrap();
        assert_eq!(body, serde_json::json!({ "status": "COMPLETED" }));
    }

    #[test]
    fn noop_patch_detection() {
        let current = op(Completed);
        assert!(OperationPatch::rename("Cutting").is_noop_for(&current));
        assert!(!OperationPatch::rename("Drying").is_noop_for(&current));
        assert!(OperationPatch::default().is_noop_for(&current));
        assert!(OperationPatch::rename("  Cutting ").is_noop_for(&current));

        let code = OperationPatch {
            code: Some(format!(" {} ", current.code)),
            ..OperationPatch::default()
        };
        assert!(code.is_noop_for(&current));
    }

    #[test]
    fn new_operation_validation() {
        let mut new = NewOperation {
            code: "OP-10".into(),
            name: "Cutting".into(),
            description: None,
            standard_time: 0,
        };
        assert!(new.validate().is_ok());

        new.standard_time = -1;
        assert!(new.validate().is_err());

        new.standard_time = 5;
        new.name = "  ".into();
        assert!(new.validate().is_err());
    }

    #[test]
    fn page_counts_round_up() {
        let page: Page<i32> = Page::new(vec![1, 2], 2, 10, 21);
        assert_eq!(page.total_pages, 3);
        let empty: Page<i32> = Page::new(vec![], 1, 10, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
