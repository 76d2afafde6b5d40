//! Request-scoped access guard.
//!
//! Authorization is re-resolved on every request: membership and role can
//! change between requests, so no decision is ever cached at the session
//! level. A principal with no membership row for the organization gets
//! "Access denied" no matter what roles they hold elsewhere.

use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Membership, Role};
use crate::services::Database;

/// Resolve the caller's membership in `organization_id`, rejecting the
/// request when none exists.
pub async fn require_membership(
    db: &Database,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<Membership, AppError> {
    db.find_membership(organization_id, user_id)
        .await?
        .ok_or_else(|| {
            AppError::Forbidden(anyhow::anyhow!(
                "principal {} has no membership in organization {}",
                user_id,
                organization_id
            ))
        })
}

/// Like [`require_membership`], but additionally requires `min_role`.
pub async fn require_role(
    db: &Database,
    organization_id: Uuid,
    user_id: Uuid,
    min_role: Role,
) -> Result<Membership, AppError> {
    let membership = require_membership(db, organization_id, user_id).await?;

    if !membership.has_role_at_least(min_role) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "principal {} holds role '{}' but '{}' is required",
            user_id,
            membership.role_code,
            min_role.as_str()
        )));
    }

    Ok(membership)
}
