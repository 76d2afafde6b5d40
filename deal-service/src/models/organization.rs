//! Organization model - the tenant boundary. Every record in the system is
//! scoped to exactly one organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub organization_id: Uuid,
    pub org_slug: String,
    pub org_name: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Organization {
    pub fn new(org_slug: String, org_name: String) -> Self {
        let now = Utc::now();
        Self {
            organization_id: Uuid::new_v4(),
            org_slug,
            org_name,
            created_utc: now,
            updated_utc: now,
        }
    }
}
