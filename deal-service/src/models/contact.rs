//! Deal contacts: bankers, counsel, sponsors, target management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactSortField {
    Name,
    Firm,
    CreatedAt,
}

impl ContactSortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(ContactSortField::Name),
            "firm" => Some(ContactSortField::Firm),
            "createdAt" => Some(ContactSortField::CreatedAt),
            _ => None,
        }
    }

    pub fn as_column(&self) -> &'static str {
        match self {
            ContactSortField::Name => "full_name",
            ContactSortField::Firm => "firm",
            ContactSortField::CreatedAt => "created_utc",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub contact_id: Uuid,
    pub organization_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub firm: Option<String>,
    pub contact_role: Option<String>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub deleted_utc: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn new(organization_id: Uuid, full_name: String) -> Self {
        let now = Utc::now();
        Self {
            contact_id: Uuid::new_v4(),
            organization_id,
            full_name,
            email: None,
            firm: None,
            contact_role: None,
            notes: None,
            created_utc: now,
            updated_utc: now,
            deleted_utc: None,
        }
    }
}
