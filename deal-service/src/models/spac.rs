//! SPAC entity - the blank-check company whose lifecycle is being managed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle states of a SPAC, from IPO through combination or wind-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpacStatus {
    Searching,
    LoiSigned,
    DaSigned,
    Completed,
    Liquidated,
}

impl SpacStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpacStatus::Searching => "searching",
            SpacStatus::LoiSigned => "loi_signed",
            SpacStatus::DaSigned => "da_signed",
            SpacStatus::Completed => "completed",
            SpacStatus::Liquidated => "liquidated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "searching" => Some(SpacStatus::Searching),
            "loi_signed" => Some(SpacStatus::LoiSigned),
            "da_signed" => Some(SpacStatus::DaSigned),
            "completed" => Some(SpacStatus::Completed),
            "liquidated" => Some(SpacStatus::Liquidated),
            _ => None,
        }
    }
}

/// Sortable columns for SPAC listings. The query layer only ever orders by
/// one of these, never by a caller-supplied string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpacSortField {
    Name,
    Ticker,
    Status,
    CreatedAt,
    Deadline,
}

impl SpacSortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(SpacSortField::Name),
            "ticker" => Some(SpacSortField::Ticker),
            "status" => Some(SpacSortField::Status),
            "createdAt" => Some(SpacSortField::CreatedAt),
            "deadline" => Some(SpacSortField::Deadline),
            _ => None,
        }
    }

    pub fn as_column(&self) -> &'static str {
        match self {
            SpacSortField::Name => "spac_name",
            SpacSortField::Ticker => "ticker",
            SpacSortField::Status => "status_code",
            SpacSortField::CreatedAt => "created_utc",
            SpacSortField::Deadline => "deadline_utc",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Spac {
    pub spac_id: Uuid,
    pub organization_id: Uuid,
    pub spac_name: String,
    pub ticker: String,
    pub status_code: String,
    pub description: Option<String>,
    pub trust_amount_cents: Option<i64>,
    pub ipo_utc: Option<DateTime<Utc>>,
    pub deadline_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub deleted_utc: Option<DateTime<Utc>>,
}

impl Spac {
    pub fn new(organization_id: Uuid, spac_name: String, ticker: String, status: SpacStatus) -> Self {
        let now = Utc::now();
        Self {
            spac_id: Uuid::new_v4(),
            organization_id,
            spac_name,
            ticker,
            status_code: status.as_str().to_string(),
            description: None,
            trust_amount_cents: None,
            ipo_utc: None,
            deadline_utc: None,
            created_utc: now,
            updated_utc: now,
            deleted_utc: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_field_allow_list_rejects_unknown_values() {
        assert!(SpacSortField::parse("name").is_some());
        assert!(SpacSortField::parse("createdAt").is_some());
        assert!(SpacSortField::parse("trust_amount_cents").is_none());
        assert!(SpacSortField::parse("spac_name; DROP TABLE spacs").is_none());
    }

    #[test]
    fn status_round_trips_through_codes() {
        for status in [
            SpacStatus::Searching,
            SpacStatus::LoiSigned,
            SpacStatus::DaSigned,
            SpacStatus::Completed,
            SpacStatus::Liquidated,
        ] {
            assert_eq!(SpacStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SpacStatus::parse("ipo_pending"), None);
    }
}
