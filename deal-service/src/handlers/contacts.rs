//! Deal-contact handlers.

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

use crate::dtos::RawListParams;
use crate::middleware::AuthUser;
use crate::models::{AuditAction, AuditLog, Contact, ContactSortField, EntityKind, Role};
use crate::services::{require_membership, require_role};
use crate::startup::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    pub organization_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 200))]
    pub firm: Option<String>,
    #[validate(length(max = 120))]
    pub role: Option<String>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 200))]
    pub firm: Option<String>,
    #[validate(length(max = 120))]
    pub role: Option<String>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub contact_id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub firm: Option<String>,
    pub role: Option<String>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            contact_id: contact.contact_id,
            organization_id: contact.organization_id,
            name: contact.full_name,
            email: contact.email,
            firm: contact.firm,
            role: contact.contact_role,
            notes: contact.notes,
            created_utc: contact.created_utc,
            updated_utc: contact.updated_utc,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List contacts for an organization.
///
/// GET /contacts
pub async fn list_contacts(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<RawListParams>,
) -> Result<Json<PageEnvelope<ContactResponse>>, AppError> {
    let (organization_id, spec) = params.parse_spec(ContactSortField::CreatedAt, 20)?;

    require_membership(&state.db, organization_id, user.id()).await?;

    let (rows, total) = state.db.list_contacts(organization_id, &spec).await?;

    let items = rows.into_iter().map(ContactResponse::from).collect();
    Ok(Json(PageEnvelope::new(items, total, spec.page)))
}

/// Create a contact.
///
/// POST /contacts
pub async fn create_contact(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), AppError> {
    req.validate()?;
    require_membership(&state.db, req.organization_id, user.id()).await?;

    let mut contact = Contact::new(req.organization_id, req.name);
    contact.email = req.email;
    contact.firm = req.firm;
    contact.contact_role = req.role;
    contact.notes = req.notes;

    let audit = AuditLog::new(
        contact.organization_id,
        user.id(),
        AuditAction::Created,
        EntityKind::Contact,
        contact.contact_id,
    );

    state.db.insert_contact(&contact, &audit).await?;

    Ok((StatusCode::CREATED, Json(ContactResponse::from(contact))))
}

/// Get contact details.
///
/// GET /contacts/:contact_id
pub async fn get_contact(
    State(state): State<AppState>,
    user: AuthUser,
    Path(contact_id): Path<Uuid>,
) -> Result<Json<ContactResponse>, AppError> {
    let contact = find_contact_checked(&state, contact_id, &user).await?;
    Ok(Json(ContactResponse::from(contact)))
}

/// Update a contact.
///
/// PUT /contacts/:contact_id
pub async fn update_contact(
    State(state): State<AppState>,
    user: AuthUser,
    Path(contact_id): Path<Uuid>,
    Json(req): Json<UpdateContactRequest>,
) -> Result<Json<ContactResponse>, AppError> {
    req.validate()?;
    let mut contact = find_contact_checked(&state, contact_id, &user).await?;

    if let Some(name) = req.name {
        contact.full_name = name;
    }
    if req.email.is_some() {
        contact.email = req.email;
    }
    if req.firm.is_some() {
        contact.firm = req.firm;
    }
    if req.role.is_some() {
        contact.contact_role = req.role;
    }
    if req.notes.is_some() {
        contact.notes = req.notes;
    }
    contact.updated_utc = Utc::now();

    let audit = AuditLog::new(
        contact.organization_id,
        user.id(),
        AuditAction::Updated,
        EntityKind::Contact,
        contact.contact_id,
    );

    state.db.update_contact(&contact, &audit).await?;

    Ok(Json(ContactResponse::from(contact)))
}

/// Soft-delete a contact. Requires role >= admin.
///
/// DELETE /contacts/:contact_id
pub async fn delete_contact(
    State(state): State<AppState>,
    user: AuthUser,
    Path(contact_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let contact = state
        .db
        .find_contact(contact_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contact not found")))?;

    require_role(&state.db, contact.organization_id, user.id(), Role::Admin).await?;

    let audit = AuditLog::new(
        contact.organization_id,
        user.id(),
        AuditAction::Deleted,
        EntityKind::Contact,
        contact.contact_id,
    );

    state
        .db
        .soft_delete_contact(contact.organization_id, contact.contact_id, &audit)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_contact_checked(
    state: &AppState,
    contact_id: Uuid,
    user: &AuthUser,
) -> Result<Contact, AppError> {
    let contact = state
        .db
        .find_contact(contact_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contact not found")))?;

    require_membership(&state.db, contact.organization_id, user.id()).await?;

    Ok(contact)
}
