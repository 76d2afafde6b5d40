//! Deal-document metadata. Blob contents live behind the storage seam;
//! only metadata is kept in the relational store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSortField {
    Name,
    Size,
    CreatedAt,
}

impl DocumentSortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(DocumentSortField::Name),
            "size" => Some(DocumentSortField::Size),
            "createdAt" => Some(DocumentSortField::CreatedAt),
            _ => None,
        }
    }

    pub fn as_column(&self) -> &'static str {
        match self {
            DocumentSortField::Name => "doc_name",
            DocumentSortField::Size => "size_bytes",
            DocumentSortField::CreatedAt => "created_utc",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub document_id: Uuid,
    pub organization_id: Uuid,
    pub spac_id: Option<Uuid>,
    pub doc_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub uploaded_by: Uuid,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub deleted_utc: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(
        organization_id: Uuid,
        doc_name: String,
        mime_type: String,
        size_bytes: i64,
        storage_key: String,
        uploaded_by: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            document_id: Uuid::new_v4(),
            organization_id,
            spac_id: None,
            doc_name,
            mime_type,
            size_bytes,
            storage_key,
            uploaded_by,
            created_utc: now,
            updated_utc: now,
            deleted_utc: None,
        }
    }
}
