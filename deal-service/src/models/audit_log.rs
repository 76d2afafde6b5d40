//! Audit trail for mutating operations. Rows are written in the same
//! transaction as the mutation they describe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The mutation kinds recorded in the audit trail. Single source of truth
/// for the `action` column; handlers never write raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    Scored,
    Analyzed,
    Exported,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Updated => "updated",
            AuditAction::Deleted => "deleted",
            AuditAction::Scored => "scored",
            AuditAction::Analyzed => "analyzed",
            AuditAction::Exported => "exported",
        }
    }
}

/// Entity kinds referenced from audit rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Organization,
    Spac,
    Target,
    Document,
    Contact,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Organization => "organization",
            EntityKind::Spac => "spac",
            EntityKind::Target => "target",
            EntityKind::Document => "document",
            EntityKind::Contact => "contact",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSortField {
    CreatedAt,
    Action,
    EntityType,
}

impl AuditSortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "createdAt" => Some(AuditSortField::CreatedAt),
            "action" => Some(AuditSortField::Action),
            "entityType" => Some(AuditSortField::EntityType),
            _ => None,
        }
    }

    pub fn as_column(&self) -> &'static str {
        match self {
            AuditSortField::CreatedAt => "created_utc",
            AuditSortField::Action => "action",
            AuditSortField::EntityType => "entity_type",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub audit_id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub metadata: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(
        organization_id: Uuid,
        user_id: Uuid,
        action: AuditAction,
        entity_type: EntityKind,
        entity_id: Uuid,
    ) -> Self {
        Self {
            audit_id: Uuid::new_v4(),
            organization_id,
            user_id,
            action: action.as_str().to_string(),
            entity_type: entity_type.as_str().to_string(),
            entity_id,
            metadata: None,
            created_utc: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
