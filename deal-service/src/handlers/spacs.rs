//! SPAC record handlers: CRUD, listing and AI scoring.

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
    AuditAction, AuditLog, EntityKind, Role, Spac, SpacSortField, SpacStatus,
};
use crate::services::{require_membership, require_role, DealContext, DealScore, TargetBrief};
use crate::startup::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpacRequest {
    pub organization_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 12))]
    pub ticker: String,
    pub status: Option<SpacStatus>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub trust_amount_cents: Option<i64>,
    pub ipo_utc: Option<DateTime<Utc>>,
    pub deadline_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpacRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 12))]
    pub ticker: Option<String>,
    pub status: Option<SpacStatus>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub trust_amount_cents: Option<i64>,
    pub ipo_utc: Option<DateTime<Utc>>,
    pub deadline_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacResponse {
    pub spac_id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub ticker: String,
    pub status: String,
    pub description: Option<String>,
    pub trust_amount_cents: Option<i64>,
    pub ipo_utc: Option<DateTime<Utc>>,
    pub deadline_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Spac> for SpacResponse {
    fn from(spac: Spac) -> Self {
        Self {
            spac_id: spac.spac_id,
            organization_id: spac.organization_id,
            name: spac.spac_name,
            ticker: spac.ticker,
            status: spac.status_code,
            description: spac.description,
            trust_amount_cents: spac.trust_amount_cents,
            ipo_utc: spac.ipo_utc,
            deadline_utc: spac.deadline_utc,
            created_utc: spac.created_utc,
            updated_utc: spac.updated_utc,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub spac_id: Uuid,
    #[serde(flatten)]
    pub score: DealScore,
    pub model: String,
    pub scored_utc: DateTime<Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List SPACs for an organization with search, status filter, sorting and
/// pagination.
///
/// GET /spacs
pub async fn list_spacs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<RawListParams>,
) -> Result<Json<PageEnvelope<SpacResponse>>, AppError> {
    let status = parse_filter(&params.status, "status", SpacStatus::parse)?;
    let (organization_id, spec) = params.parse_spec(SpacSortField::CreatedAt, 20)?;

    require_membership(&state.db, organization_id, user.id()).await?;

    let (rows, total) = state.db.list_spacs(organization_id, status, &spec).await?;

    let items = rows.into_iter().map(SpacResponse::from).collect();
    Ok(Json(PageEnvelope::new(items, total, spec.page)))
}

/// Create a new SPAC record.
///
/// POST /spacs
pub async fn create_spac(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateSpacRequest>,
) -> Result<(StatusCode, Json<SpacResponse>), AppError> {
    req.validate()?;
    require_membership(&state.db, req.organization_id, user.id()).await?;

    let ticker = req.ticker.trim().to_uppercase();
    let mut spac = Spac::new(
        req.organization_id,
        req.name,
        ticker,
        req.status.unwrap_or(SpacStatus::Searching),
    );
    spac.description = req.description;
    spac.trust_amount_cents = req.trust_amount_cents;
    spac.ipo_utc = req.ipo_utc;
    spac.deadline_utc = req.deadline_utc;

    let audit = AuditLog::new(
        spac.organization_id,
        user.id(),
        AuditAction::Created,
        EntityKind::Spac,
        spac.spac_id,
    )
    .with_metadata(serde_json::json!({ "ticker": spac.ticker }));

    state.db.insert_spac(&spac, &audit).await?;

    tracing::info!(spac_id = %spac.spac_id, ticker = %spac.ticker, "SPAC created");

    Ok((StatusCode::CREATED, Json(SpacResponse::from(spac))))
}

/// Get SPAC details.
///
/// GET /spacs/:spac_id
pub async fn get_spac(
    State(state): State<AppState>,
    user: AuthUser,
    Path(spac_id): Path<Uuid>,
) -> Result<Json<SpacResponse>, AppError> {
    let spac = find_spac_checked(&state, spac_id, &user).await?;
    Ok(Json(SpacResponse::from(spac)))
}

/// Update a SPAC record.
///
/// PUT /spacs/:spac_id
pub async fn update_spac(
    State(state): State<AppState>,
    user: AuthUser,
    Path(spac_id): Path<Uuid>,
    Json(req): Json<UpdateSpacRequest>,
) -> Result<Json<SpacResponse>, AppError> {
    req.validate()?;
    let mut spac = find_spac_checked(&state, spac_id, &user).await?;

    if let Some(name) = req.name {
        spac.spac_name = name;
    }
    if let Some(ticker) = req.ticker {
        spac.ticker = ticker.trim().to_uppercase();
    }
    if let Some(status) = req.status {
        spac.status_code = status.as_str().to_string();
    }
    if req.description.is_some() {
        spac.description = req.description;
    }
    if req.trust_amount_cents.is_some() {
        spac.trust_amount_cents = req.trust_amount_cents;
    }
    if req.ipo_utc.is_some() {
        spac.ipo_utc = req.ipo_utc;
    }
    if req.deadline_utc.is_some() {
        spac.deadline_utc = req.deadline_utc;
    }
    spac.updated_utc = Utc::now();

    let audit = AuditLog::new(
        spac.organization_id,
        user.id(),
        AuditAction::Updated,
        EntityKind::Spac,
        spac.spac_id,
    );

    state.db.update_spac(&spac, &audit).await?;

    Ok(Json(SpacResponse::from(spac)))
}

/// Soft-delete a SPAC. Requires role >= admin.
///
/// DELETE /spacs/:spac_id
pub async fn delete_spac(
    State(state): State<AppState>,
    user: AuthUser,
    Path(spac_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let spac = state
        .db
        .find_spac(spac_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("SPAC not found")))?;

    require_role(&state.db, spac.organization_id, user.id(), Role::Admin).await?;

    let audit = AuditLog::new(
        spac.organization_id,
        user.id(),
        AuditAction::Deleted,
        EntityKind::Spac,
        spac.spac_id,
    )
    .with_metadata(serde_json::json!({ "ticker": spac.ticker }));

    state
        .db
        .soft_delete_spac(spac.organization_id, spac.spac_id, &audit)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Score the deal with the AI provider, using the SPAC and its attached
/// pipeline targets as context.
///
/// POST /spacs/:spac_id/score
pub async fn score_spac(
    State(state): State<AppState>,
    user: AuthUser,
    Path(spac_id): Path<Uuid>,
) -> Result<Json<ScoreResponse>, AppError> {
    let spac = find_spac_checked(&state, spac_id, &user).await?;

    let targets = state
        .db
        .find_targets_for_spac(spac.organization_id, spac.spac_id)
        .await?;

    let context = DealContext {
        spac_name: spac.spac_name.clone(),
        ticker: spac.ticker.clone(),
        status: spac.status_code.clone(),
        trust_amount_cents: spac.trust_amount_cents,
        deadline_utc: spac.deadline_utc,
        targets: targets
            .into_iter()
            .map(|t| TargetBrief {
                name: t.target_name,
                sector: t.sector,
                stage: t.stage_code,
                enterprise_value_cents: t.enterprise_value_cents,
            })
            .collect(),
    };

    let score = state.scoring.score_deal(&context).await?;

    let audit = AuditLog::new(
        spac.organization_id,
        user.id(),
        AuditAction::Scored,
        EntityKind::Spac,
        spac.spac_id,
    )
    .with_metadata(serde_json::json!({ "score": score.score }));
    state.db.insert_audit(&audit).await?;

    tracing::info!(spac_id = %spac.spac_id, score = score.score, "Deal scored");

    Ok(Json(ScoreResponse {
        spac_id: spac.spac_id,
        score,
        model: state.scoring.model_name().to_string(),
        scored_utc: Utc::now(),
    }))
}

/// Load a live SPAC and run the access guard against its organization.
async fn find_spac_checked(
    state: &AppState,
    spac_id: Uuid,
    user: &AuthUser,
) -> Result<Spac, AppError> {
    let spac = state
        .db
        .find_spac(spac_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("SPAC not found")))?;

    require_membership(&state.db, spac.organization_id, user.id()).await?;

    Ok(spac)
}
