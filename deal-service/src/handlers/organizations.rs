//! Organization handlers: tenant creation and member listing.

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
use service_core::utils::pagination::{PageEnvelope, PageQuery};

use crate::middleware::AuthUser;
use crate::models::{AuditAction, AuditLog, EntityKind, Membership, Organization, Role};
use crate::services::{require_membership, require_role};
use crate::startup::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 60))]
    pub slug: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationResponse {
    pub organization_id: Uuid,
    pub slug: String,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}

impl From<Organization> for OrganizationResponse {
    fn from(org: Organization) -> Self {
        Self {
            organization_id: org.organization_id,
            slug: org.org_slug,
            name: org.org_name,
            created_utc: org.created_utc,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipResponse {
    pub membership_id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_utc: DateTime<Utc>,
}

impl From<Membership> for MembershipResponse {
    fn from(m: Membership) -> Self {
        Self {
            membership_id: m.membership_id,
            organization_id: m.organization_id,
            user_id: m.user_id,
            role: m.role_code,
            created_utc: m.created_utc,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberListParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new organization. The caller becomes its owner; organization,
/// owner membership and audit record land in one transaction.
///
/// POST /organizations
pub async fn create_organization(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<OrganizationResponse>), AppError> {
    req.validate()?;

    if !req
        .slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "slug may only contain lowercase letters, digits and dashes"
        )));
    }

    let org = Organization::new(req.slug, req.name);
    let owner = Membership::new(org.organization_id, user.id(), Role::Owner);
    let audit = AuditLog::new(
        org.organization_id,
        user.id(),
        AuditAction::Created,
        EntityKind::Organization,
        org.organization_id,
    );

    state.db.create_organization(&org, &owner, &audit).await?;

    tracing::info!(
        organization_id = %org.organization_id,
        slug = %org.org_slug,
        "Organization created"
    );

    Ok((StatusCode::CREATED, Json(OrganizationResponse::from(org))))
}

/// Get organization details.
///
/// GET /organizations/:organization_id
pub async fn get_organization(
    State(state): State<AppState>,
    user: AuthUser,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<OrganizationResponse>, AppError> {
    require_membership(&state.db, organization_id, user.id()).await?;

    let org = state
        .db
        .find_organization_by_id(organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Organization not found")))?;

    Ok(Json(OrganizationResponse::from(org)))
}

/// List members of an organization. Requires role >= admin.
///
/// GET /organizations/:organization_id/members
pub async fn list_members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(organization_id): Path<Uuid>,
    Query(params): Query<MemberListParams>,
) -> Result<Json<PageEnvelope<MembershipResponse>>, AppError> {
    require_role(&state.db, organization_id, user.id(), Role::Admin).await?;

    let page = PageQuery::normalize(params.page.as_deref(), params.page_size.as_deref(), 20)
        .map_err(AppError::InvalidQuery)?;

    let (rows, total) = state
        .db
        .list_memberships(organization_id, page.limit(), page.offset())
        .await?;

    let items = rows.into_iter().map(MembershipResponse::from).collect();
    Ok(Json(PageEnvelope::new(items, total, page)))
}
