//! Document handlers: upload, metadata CRUD, download, AI analysis.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
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
use crate::models::{
    AuditAction, AuditLog, Document, DocumentAnalysis, DocumentSortField, EntityKind, Role,
};
use crate::services::{require_membership, require_role};
use crate::startup::AppState;

/// Upload size cap.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// How much document text is handed to the AI provider for review.
const MAX_ANALYSIS_CHARS: usize = 20_000;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub document_id: Uuid,
    pub organization_id: Uuid,
    pub spac_id: Option<Uuid>,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_by: Uuid,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            document_id: doc.document_id,
            organization_id: doc.organization_id,
            spac_id: doc.spac_id,
            name: doc.doc_name,
            mime_type: doc.mime_type,
            size_bytes: doc.size_bytes,
            uploaded_by: doc.uploaded_by,
            created_utc: doc.created_utc,
            updated_utc: doc.updated_utc,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub spac_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub document_id: Uuid,
    pub summary: String,
    pub risk_factors: serde_json::Value,
    pub model_name: String,
    pub analyzed_utc: DateTime<Utc>,
    pub cached: bool,
}

impl AnalysisResponse {
    fn from_analysis(analysis: DocumentAnalysis, cached: bool) -> Self {
        Self {
            document_id: analysis.document_id,
            summary: analysis.summary,
            risk_factors: analysis.risk_factors,
            model_name: analysis.model_name,
            analyzed_utc: analysis.analyzed_utc,
            cached,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List documents for an organization.
///
/// GET /documents
pub async fn list_documents(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<RawListParams>,
) -> Result<Json<PageEnvelope<DocumentResponse>>, AppError> {
    let (organization_id, spec) = params.parse_spec(DocumentSortField::CreatedAt, 20)?;

    require_membership(&state.db, organization_id, user.id()).await?;

    let (rows, total) = state.db.list_documents(organization_id, &spec).await?;

    let items = rows.into_iter().map(DocumentResponse::from).collect();
    Ok(Json(PageEnvelope::new(items, total, spec.page)))
}

/// Upload a document. Multipart form with `organizationId`, optional
/// `spacId`, and a `file` field.
///
/// POST /documents
pub async fn upload_document(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let mut organization_id: Option<Uuid> = None;
    let mut spac_id: Option<Uuid> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        match field.name() {
            Some("organizationId") => {
                let value = field.text().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Invalid organizationId field: {}", e))
                })?;
                organization_id = Some(value.parse().map_err(|_| {
                    AppError::BadRequest(anyhow::anyhow!("organizationId is not a valid UUID"))
                })?);
            }
            Some("spacId") => {
                let value = field.text().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Invalid spacId field: {}", e))
                })?;
                spac_id = Some(value.parse().map_err(|_| {
                    AppError::BadRequest(anyhow::anyhow!("spacId is not a valid UUID"))
                })?);
            }
            Some("file") => {
                let name = field.file_name().unwrap_or("unnamed").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| {
                        AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
                    })?
                    .to_vec();
                file = Some((name, mime_type, data));
            }
            _ => {}
        }
    }

    let organization_id = organization_id.ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("organizationId field is required"))
    })?;
    let (original_name, mime_type, data) =
        file.ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    require_membership(&state.db, organization_id, user.id()).await?;

    if data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "File too large (max 20MB)"
        )));
    }

    let extension = std::path::Path::new(&original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("bin");
    let storage_key = format!("{}/{}.{}", Uuid::new_v4(), Uuid::new_v4(), extension);

    let size = data.len() as i64;
    let mut document = Document::new(
        organization_id,
        original_name,
        mime_type,
        size,
        storage_key.clone(),
        user.id(),
    );
    document.spac_id = spac_id;

    tracing::info!(
        document_id = %document.document_id,
        filename = %document.doc_name,
        size = size,
        "Document upload started"
    );

    state.storage.upload(&storage_key, data).await.map_err(|e| {
        tracing::error!("Failed to upload file {} to storage: {}", storage_key, e);
        e
    })?;

    let audit = AuditLog::new(
        organization_id,
        user.id(),
        AuditAction::Created,
        EntityKind::Document,
        document.document_id,
    )
    .with_metadata(serde_json::json!({ "name": document.doc_name, "sizeBytes": size }));

    state.db.insert_document(&document, &audit).await?;

    Ok((StatusCode::CREATED, Json(DocumentResponse::from(document))))
}

/// Get document metadata.
///
/// GET /documents/:document_id
pub async fn get_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = find_document_checked(&state, document_id, &user).await?;
    Ok(Json(DocumentResponse::from(document)))
}

/// Download the stored bytes.
///
/// GET /documents/:document_id/download
pub async fn download_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let document = find_document_checked(&state, document_id, &user).await?;

    let data = state.storage.download(&document.storage_key).await.map_err(|e| {
        tracing::error!(
            document_id = %document.document_id,
            storage_key = %document.storage_key,
            error = %e,
            "Failed to download stored file"
        );
        e
    })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.mime_type),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", document.doc_name),
            ),
        ],
        data,
    ))
}

/// Rename or re-attach a document. The persisted analysis is invalidated in
/// the same transaction as the metadata change.
///
/// PUT /documents/:document_id
pub async fn update_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<Uuid>,
    Json(req): Json<UpdateDocumentRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    req.validate()?;
    let mut document = find_document_checked(&state, document_id, &user).await?;

    if let Some(name) = req.name {
        document.doc_name = name;
    }
    if req.spac_id.is_some() {
        document.spac_id = req.spac_id;
    }
    document.updated_utc = Utc::now();

    let audit = AuditLog::new(
        document.organization_id,
        user.id(),
        AuditAction::Updated,
        EntityKind::Document,
        document.document_id,
    );

    state.db.update_document(&document, &audit).await?;

    Ok(Json(DocumentResponse::from(document)))
}

/// Soft-delete a document and invalidate its analysis. Requires role >= admin.
///
/// DELETE /documents/:document_id
pub async fn delete_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let document = state
        .db
        .find_document(document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;

    require_role(&state.db, document.organization_id, user.id(), Role::Admin).await?;

    let audit = AuditLog::new(
        document.organization_id,
        user.id(),
        AuditAction::Deleted,
        EntityKind::Document,
        document.document_id,
    );

    state
        .db
        .soft_delete_document(document.organization_id, document.document_id, &audit)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Analyze a document with the AI provider, backed by the persisted
/// per-document cache: a fresh row is served as `cached: true` without
/// touching the provider; otherwise the provider runs and the row is
/// upserted.
///
/// POST /documents/:document_id/analysis
pub async fn analyze_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let document = find_document_checked(&state, document_id, &user).await?;

    let ttl_hours = state.config.ai.analysis_ttl_hours;
    if let Some(existing) = state.db.find_analysis(document.document_id).await? {
        if existing.is_fresh(ttl_hours) {
            tracing::debug!(document_id = %document.document_id, "Analysis served from cache");
            return Ok(Json(AnalysisResponse::from_analysis(existing, true)));
        }
    }

    let data = state.storage.download(&document.storage_key).await?;
    let text: String = String::from_utf8_lossy(&data)
        .chars()
        .take(MAX_ANALYSIS_CHARS)
        .collect();

    let review = state
        .scoring
        .review_document(&document.doc_name, &text)
        .await?;

    let analysis = DocumentAnalysis {
        document_id: document.document_id,
        organization_id: document.organization_id,
        summary: review.summary,
        risk_factors: serde_json::json!(review.risk_factors),
        model_name: state.scoring.model_name().to_string(),
        analyzed_utc: Utc::now(),
    };

    let audit = AuditLog::new(
        document.organization_id,
        user.id(),
        AuditAction::Analyzed,
        EntityKind::Document,
        document.document_id,
    );

    state.db.upsert_analysis(&analysis, &audit).await?;

    tracing::info!(document_id = %document.document_id, "Document analyzed");

    Ok(Json(AnalysisResponse::from_analysis(analysis, false)))
}

async fn find_document_checked(
    state: &AppState,
    document_id: Uuid,
    user: &AuthUser,
) -> Result<Document, AppError> {
    let document = state
        .db
        .find_document(document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;

    require_membership(&state.db, document.organization_id, user.id()).await?;

    Ok(document)
}
