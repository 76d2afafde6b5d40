//! Persisted AI analysis per document. One row per document id; the row is
//! the durable variant of the ephemeral result cache, with a 24-hour TTL
//! and explicit invalidation on document update/delete.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentAnalysis {
    pub document_id: Uuid,
    pub organization_id: Uuid,
    pub summary: String,
    pub risk_factors: serde_json::Value,
    pub model_name: String,
    pub analyzed_utc: DateTime<Utc>,
}

impl DocumentAnalysis {
    pub fn is_fresh(&self, ttl_hours: i64) -> bool {
        self.analyzed_utc + Duration::hours(ttl_hours) > Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(age_hours: i64) -> DocumentAnalysis {
        DocumentAnalysis {
            document_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            summary: "ok".to_string(),
            risk_factors: serde_json::json!([]),
            model_name: "mock".to_string(),
            analyzed_utc: Utc::now() - Duration::hours(age_hours),
        }
    }

    #[test]
    fn freshness_respects_ttl() {
        assert!(analysis(1).is_fresh(24));
        assert!(!analysis(25).is_fresh(24));
    }
}
