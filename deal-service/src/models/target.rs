//! Target-company pipeline entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Pipeline stages a target moves through, sourcing to close (or pass).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStage {
    Sourced,
    Contacted,
    NdaSigned,
    Diligence,
    Loi,
    DefinitiveAgreement,
    Closed,
    Passed,
}

impl TargetStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStage::Sourced => "sourced",
            TargetStage::Contacted => "contacted",
            TargetStage::NdaSigned => "nda_signed",
            TargetStage::Diligence => "diligence",
            TargetStage::Loi => "loi",
            TargetStage::DefinitiveAgreement => "definitive_agreement",
            TargetStage::Closed => "closed",
            TargetStage::Passed => "passed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sourced" => Some(TargetStage::Sourced),
            "contacted" => Some(TargetStage::Contacted),
            "nda_signed" => Some(TargetStage::NdaSigned),
            "diligence" => Some(TargetStage::Diligence),
            "loi" => Some(TargetStage::Loi),
            "definitive_agreement" => Some(TargetStage::DefinitiveAgreement),
            "closed" => Some(TargetStage::Closed),
            "passed" => Some(TargetStage::Passed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSortField {
    Name,
    Sector,
    Stage,
    CreatedAt,
    EnterpriseValue,
}

impl TargetSortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(TargetSortField::Name),
            "sector" => Some(TargetSortField::Sector),
            "stage" => Some(TargetSortField::Stage),
            "createdAt" => Some(TargetSortField::CreatedAt),
            "enterpriseValue" => Some(TargetSortField::EnterpriseValue),
            _ => None,
        }
    }

    pub fn as_column(&self) -> &'static str {
        match self {
            TargetSortField::Name => "target_name",
            TargetSortField::Sector => "sector",
            TargetSortField::Stage => "stage_code",
            TargetSortField::CreatedAt => "created_utc",
            TargetSortField::EnterpriseValue => "enterprise_value_cents",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Target {
    pub target_id: Uuid,
    pub organization_id: Uuid,
    pub spac_id: Option<Uuid>,
    pub target_name: String,
    pub sector: Option<String>,
    pub description: Option<String>,
    pub stage_code: String,
    pub enterprise_value_cents: Option<i64>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub deleted_utc: Option<DateTime<Utc>>,
}

impl Target {
    pub fn new(organization_id: Uuid, target_name: String, stage: TargetStage) -> Self {
        let now = Utc::now();
        Self {
            target_id: Uuid::new_v4(),
            organization_id,
            spac_id: None,
            target_name,
            sector: None,
            description: None,
            stage_code: stage.as_str().to_string(),
            enterprise_value_cents: None,
            created_utc: now,
            updated_utc: now,
            deleted_utc: None,
        }
    }
}
