//! Audit-log listing and CSV export. Both require role >= admin.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use service_core::error::{AppError, FieldError};
use service_core::utils::pagination::PageEnvelope;

use crate::dtos::RawListParams;
use crate::middleware::AuthUser;
use crate::models::{AuditAction, AuditLog, AuditSortField, EntityKind, Role};
use crate::services::require_role;
use crate::startup::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    pub audit_id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub metadata: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
}

impl From<AuditLog> for AuditLogResponse {
    fn from(entry: AuditLog) -> Self {
        Self {
            audit_id: entry.audit_id,
            organization_id: entry.organization_id,
            user_id: entry.user_id,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            metadata: entry.metadata,
            created_utc: entry.created_utc,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub organization_id: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List audit records, newest first by default. Page size defaults to 50
/// for audit review screens.
///
/// GET /audit-logs
pub async fn list_audit_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<RawListParams>,
) -> Result<Json<PageEnvelope<AuditLogResponse>>, AppError> {
    let (organization_id, spec) = params.parse_spec(AuditSortField::CreatedAt, 50)?;

    require_role(&state.db, organization_id, user.id(), Role::Admin).await?;

    let (rows, total) = state.db.list_audit_logs(organization_id, &spec).await?;

    let items = rows.into_iter().map(AuditLogResponse::from).collect();
    Ok(Json(PageEnvelope::new(items, total, spec.page)))
}

/// Export the audit trail as CSV. The export itself is an audited event.
///
/// GET /audit-logs/export
pub async fn export_audit_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ExportParams>,
) -> Result<impl IntoResponse, AppError> {
    let organization_id: Uuid = params
        .organization_id
        .as_deref()
        .ok_or_else(|| {
            AppError::InvalidQuery(vec![FieldError::new("organizationId", "is required")])
        })?
        .parse()
        .map_err(|_| {
            AppError::InvalidQuery(vec![FieldError::new(
                "organizationId",
                "is not a valid UUID",
            )])
        })?;

    require_role(&state.db, organization_id, user.id(), Role::Admin).await?;

    let rows = state.db.export_audit_logs(organization_id).await?;
    let body = audit_logs_to_csv(&rows);

    let audit = AuditLog::new(
        organization_id,
        user.id(),
        AuditAction::Exported,
        EntityKind::Organization,
        organization_id,
    )
    .with_metadata(serde_json::json!({ "rows": rows.len() }));
    state.db.insert_audit(&audit).await?;

    tracing::info!(
        organization_id = %organization_id,
        rows = rows.len(),
        "Audit log exported"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"audit-log.csv\"".to_string(),
            ),
        ],
        body,
    ))
}

/// Flatten audit rows to CSV. Metadata objects are embedded as compact JSON
/// in a single column.
fn audit_logs_to_csv(rows: &[AuditLog]) -> String {
    let mut out = String::from("auditId,organizationId,userId,action,entityType,entityId,metadata,createdUtc\n");

    for row in rows {
        let metadata = row
            .metadata
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_default();

        let fields = [
            row.audit_id.to_string(),
            row.organization_id.to_string(),
            row.user_id.to_string(),
            row.action.clone(),
            row.entity_type.clone(),
            row.entity_id.to_string(),
            metadata,
            row.created_utc.to_rfc3339(),
        ];

        let line: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }

    out
}

/// Quote a CSV field when it contains a delimiter, quote or newline;
/// embedded quotes are doubled.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_pass_through_unquoted() {
        assert_eq!(csv_escape("created"), "created");
        assert_eq!(csv_escape(""), "");
    }

    #[test]
    fn delimiters_and_quotes_are_escaped() {
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn rows_flatten_with_metadata_as_json() {
        let org = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let entry = AuditLog::new(org, actor, AuditAction::Created, EntityKind::Spac, Uuid::new_v4())
            .with_metadata(serde_json::json!({ "ticker": "APEX" }));

        let csv = audit_logs_to_csv(&[entry]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "auditId,organizationId,userId,action,entityType,entityId,metadata,createdUtc"
        );
        let row = lines.next().unwrap();
        // The metadata JSON contains quotes, so the column must be quoted.
        assert!(row.contains("\"{\"\"ticker\"\":\"\"APEX\"\"}\""));
        assert!(row.contains("created"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_export_is_just_the_header() {
        let csv = audit_logs_to_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
    }
}
