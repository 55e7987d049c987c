//! Supporting tables: documents, menus, classifiers and the audit trail.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AuditAction, DocumentOwner, Profile};
use crate::validation::{validate_optional, validate_reference, validate_required, ValidationResult};
use crate::ValidationError;

// =============================================================================
// Document
// =============================================================================

/// Metadata of a file attached to a customer, lead, proposal or sale.
/// File bytes live in external storage under `storage_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Document {
    pub id: i64,
    pub owner_type: DocumentOwner,
    pub owner_id: i64,
    pub name: String,
    pub content_type: String,
    /// Assigned on save when blank.
    pub storage_key: String,
    pub size_bytes: i64,
    pub uploaded_by: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_reference("owner_id", self.owner_id)?;
        validate_required("name", &self.name, 255)?;
        validate_required("content_type", &self.content_type, 100)?;
        if self.size_bytes < 0 {
            return Err(ValidationError::MustBePositive {
                field: "size_bytes".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentFilter {
    pub owner_type: Option<DocumentOwner>,
    pub owner_id: Option<i64>,
    pub name: Option<String>,
}

// =============================================================================
// Menu
// =============================================================================

/// Navigation entry. Visibility per profile lives in `menu_profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Menu {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub label: String,
    pub route: Option<String>,
    pub icon: Option<String>,
    pub position: i32,
}

impl Menu {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("label", &self.label, 60)?;
        validate_optional("route", self.route.as_deref(), 200)?;
        if self.id != 0 && self.parent_id == Some(self.id) {
            return Err(ValidationError::invalid("parent_id", "menu cannot be its own parent"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MenuFilter {
    pub label: Option<String>,
    pub parent_id: Option<i64>,
    /// Only menus granted to this profile.
    pub profile: Option<Profile>,
}

// =============================================================================
// Classifier
// =============================================================================

/// Label store for the values of the classifier enums in [`crate::enums`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Classifier {
    pub id: i64,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    #[serde(rename = "type")]
    pub classifier_type: String,
    pub value: String,
    pub label: String,
    pub position: i32,
    pub active: bool,
}

impl Classifier {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("type", &self.classifier_type, 40)?;
        validate_required("value", &self.value, 40)?;
        validate_required("label", &self.label, 80)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClassifierFilter {
    #[serde(rename = "type")]
    pub classifier_type: Option<String>,
    pub value: Option<String>,
    pub label: Option<String>,
    pub active: Option<bool>,
}

// =============================================================================
// Audit
// =============================================================================

/// Append-only record of a change made through the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Audit {
    pub id: i64,
    /// Table name of the changed entity.
    pub entity: String,
    pub entity_id: i64,
    pub action: AuditAction,
    pub user_id: Option<i64>,
    /// JSON snapshot or comment.
    pub payload: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AuditFilter {
    pub entity: Option<String>,
    pub entity_id: Option<i64>,
    pub user_id: Option<i64>,
    pub action: Option<AuditAction>,
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub until: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_self_parent() {
        let menu = Menu {
            id: 4,
            parent_id: Some(4),
            label: "Propostas".to_string(),
            route: Some("/propostas".to_string()),
            icon: None,
            position: 1,
        };
        assert!(menu.validate().is_err());
        assert!(Menu { parent_id: None, ..menu }.validate().is_ok());
    }

    #[test]
    fn test_classifier_serializes_type_key() {
        let c = Classifier {
            id: 1,
            classifier_type: "lead_status".to_string(),
            value: "new".to_string(),
            label: "Novo".to_string(),
            position: 1,
            active: true,
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "lead_status");
    }
}
