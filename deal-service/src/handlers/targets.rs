//! Target-company pipeline handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;
use service_core::utils::pagination::PageEnvelope;

use crate::dtos::{parse_filter, RawListParams};
use crate::middleware::AuthUser;
use crate::models::{
    AuditAction, AuditLog, EntityKind, Role, Target, TargetSortField, TargetStage,
};
use crate::services::{require_membership, require_role};
use crate::startup::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetRequest {
    pub organization_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub spac_id: Option<Uuid>,
    #[validate(length(max = 120))]
    pub sector: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub stage: Option<TargetStage>,
    #[validate(range(min = 0))]
    pub enterprise_value_cents: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTargetRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub spac_id: Option<Uuid>,
    #[validate(length(max = 120))]
    pub sector: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub stage: Option<TargetStage>,
    #[validate(range(min = 0))]
    pub enterprise_value_cents: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResponse {
    pub target_id: Uuid,
    pub organization_id: Uuid,
    pub spac_id: Option<Uuid>,
    pub name: String,
    pub sector: Option<String>,
    pub description: Option<String>,
    pub stage: String,
    pub enterprise_value_cents: Option<i64>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Target> for TargetResponse {
    fn from(target: Target) -> Self {
        Self {
            target_id: target.target_id,
            organization_id: target.organization_id,
            spac_id: target.spac_id,
            name: target.target_name,
            sector: target.sector,
            description: target.description,
            stage: target.stage_code,
            enterprise_value_cents: target.enterprise_value_cents,
            created_utc: target.created_utc,
            updated_utc: target.updated_utc,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List pipeline targets with search, stage filter, sorting and pagination.
///
/// GET /targets
pub async fn list_targets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<RawListParams>,
) -> Result<Json<PageEnvelope<TargetResponse>>, AppError> {
    let stage = parse_filter(&params.stage, "stage", TargetStage::parse)?;
    let (organization_id, spec) = params.parse_spec(TargetSortField::CreatedAt, 20)?;

    require_membership(&state.db, organization_id, user.id()).await?;

    let (rows, total) = state.db.list_targets(organization_id, stage, &spec).await?;

    let items = rows.into_iter().map(TargetResponse::from).collect();
    Ok(Json(PageEnvelope::new(items, total, spec.page)))
}

/// Add a target company to the pipeline.
///
/// POST /targets
pub async fn create_target(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateTargetRequest>,
) -> Result<(StatusCode, Json<TargetResponse>), AppError> {
    req.validate()?;
    require_membership(&state.db, req.organization_id, user.id()).await?;

    if let Some(spac_id) = req.spac_id {
        check_spac_in_org(&state, spac_id, req.organization_id).await?;
    }

    let mut target = Target::new(
        req.organization_id,
        req.name,
        req.stage.unwrap_or(TargetStage::Sourced),
    );
    target.spac_id = req.spac_id;
    target.sector = req.sector;
    target.description = req.description;
    target.enterprise_value_cents = req.enterprise_value_cents;

    let audit = AuditLog::new(
        target.organization_id,
        user.id(),
        AuditAction::Created,
        EntityKind::Target,
        target.target_id,
    );

    state.db.insert_target(&target, &audit).await?;

    tracing::info!(target_id = %target.target_id, "Pipeline target created");

    Ok((StatusCode::CREATED, Json(TargetResponse::from(target))))
}

/// Get target details.
///
/// GET /targets/:target_id
pub async fn get_target(
    State(state): State<AppState>,
    user: AuthUser,
    Path(target_id): Path<Uuid>,
) -> Result<Json<TargetResponse>, AppError> {
    let target = find_target_checked(&state, target_id, &user).await?;
    Ok(Json(TargetResponse::from(target)))
}

/// Update a pipeline target.
///
/// PUT /targets/:target_id
pub async fn update_target(
    State(state): State<AppState>,
    user: AuthUser,
    Path(target_id): Path<Uuid>,
    Json(req): Json<UpdateTargetRequest>,
) -> Result<Json<TargetResponse>, AppError> {
    req.validate()?;
    let mut target = find_target_checked(&state, target_id, &user).await?;

    if let Some(spac_id) = req.spac_id {
        check_spac_in_org(&state, spac_id, target.organization_id).await?;
        target.spac_id = Some(spac_id);
    }
    if let Some(name) = req.name {
        target.target_name = name;
    }
    if req.sector.is_some() {
        target.sector = req.sector;
    }
    if req.description.is_some() {
        target.description = req.description;
    }
    if let Some(stage) = req.stage {
        target.stage_code = stage.as_str().to_string();
    }
    if req.enterprise_value_cents.is_some() {
        target.enterprise_value_cents = req.enterprise_value_cents;
    }
    target.updated_utc = Utc::now();

    let audit = AuditLog::new(
        target.organization_id,
        user.id(),
        AuditAction::Updated,
        EntityKind::Target,
        target.target_id,
    );

    state.db.update_target(&target, &audit).await?;

    Ok(Json(TargetResponse::from(target)))
}

/// Soft-delete a pipeline target. Requires role >= admin.
///
/// DELETE /targets/:target_id
pub async fn delete_target(
    State(state): State<AppState>,
    user: AuthUser,
    Path(target_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let target = state
        .db
        .find_target(target_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Target not found")))?;

    require_role(&state.db, target.organization_id, user.id(), Role::Admin).await?;

    let audit = AuditLog::new(
        target.organization_id,
        user.id(),
        AuditAction::Deleted,
        EntityKind::Target,
        target.target_id,
    );

    state
        .db
        .soft_delete_target(target.organization_id, target.target_id, &audit)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_target_checked(
    state: &AppState,
    target_id: Uuid,
    user: &AuthUser,
) -> Result<Target, AppError> {
    let target = state
        .db
        .find_target(target_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Target not found")))?;

    require_membership(&state.db, target.organization_id, user.id()).await?;

    Ok(target)
}

/// A target may only reference a SPAC from its own organization.
async fn check_spac_in_org(
    state: &AppState,
    spac_id: Uuid,
    organization_id: Uuid,
) -> Result<(), AppError> {
    let spac = state
        .db
        .find_spac(spac_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("SPAC not found")))?;

    if spac.organization_id != organization_id {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "SPAC belongs to a different organization"
        )));
    }

    Ok(())
}
