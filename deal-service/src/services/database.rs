//! PostgreSQL data access for deal-service.
//!
//! Every mutating operation writes its audit record inside the same
//! transaction as the mutation, so a crash can never leave an audited
//! change unapplied or an unaudited change applied. Soft-deleted rows
//! (`deleted_utc IS NOT NULL`) are invisible to every read here.

use service_core::error::AppError;
use service_core::utils::pagination::escape_like;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::dtos::{ListSpec, SortKey};
use crate::models::{
    AuditLog, AuditSortField, Contact, ContactSortField, Document, DocumentAnalysis,
    DocumentSortField, Membership, Organization, Spac, SpacSortField, SpacStatus, Target,
    TargetSortField, TargetStage,
};

/// Cap on rows returned by the audit CSV export.
const AUDIT_EXPORT_LIMIT: i64 = 10_000;

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    // ==================== Organization Operations ====================

    /// Create an organization together with its owner membership and the
    /// audit record, atomically.
    pub async fn create_organization(
        &self,
        org: &Organization,
        owner: &Membership,
        audit: &AuditLog,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO organizations (organization_id, org_slug, org_name, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(org.organization_id)
        .bind(&org.org_slug)
        .bind(&org.org_name)
        .bind(org.created_utc)
        .bind(org.updated_utc)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "An organization with this slug already exists"))?;

        insert_membership_tx(&mut tx, owner).await?;
        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Find organization by ID.
    pub async fn find_organization_by_id(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<Organization>, AppError> {
        sqlx::query_as::<_, Organization>(
            "SELECT * FROM organizations WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    // ==================== Membership Operations ====================

    /// Find the membership for a (organization, principal) pair. At most
    /// one row can exist per pair.
    pub async fn find_membership(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// List memberships of an organization, newest first.
    pub async fn list_memberships(
        &self,
        organization_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Membership>, u64), AppError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM memberships WHERE organization_id = $1")
                .bind(organization_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, Membership>(
            r#"
            SELECT * FROM memberships
            WHERE organization_id = $1
            ORDER BY created_utc DESC, membership_id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(organization_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total as u64))
    }

    // ==================== SPAC Operations ====================

    /// Insert a new SPAC with its audit record.
    pub async fn insert_spac(&self, spac: &Spac, audit: &AuditLog) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO spacs (spac_id, organization_id, spac_name, ticker, status_code,
                               description, trust_amount_cents, ipo_utc, deadline_utc,
                               created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(spac.spac_id)
        .bind(spac.organization_id)
        .bind(&spac.spac_name)
        .bind(&spac.ticker)
        .bind(&spac.status_code)
        .bind(&spac.description)
        .bind(spac.trust_amount_cents)
        .bind(spac.ipo_utc)
        .bind(spac.deadline_utc)
        .bind(spac.created_utc)
        .bind(spac.updated_utc)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            conflict_on_unique(e, "A SPAC with this ticker already exists in the organization")
        })?;

        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Find a live SPAC. Tenant scoping happens at the guard, against the
    /// row's own organization.
    pub async fn find_spac(&self, spac_id: Uuid) -> Result<Option<Spac>, AppError> {
        sqlx::query_as::<_, Spac>(
            "SELECT * FROM spacs WHERE spac_id = $1 AND deleted_utc IS NULL",
        )
        .bind(spac_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Write back an updated SPAC with its audit record.
    pub async fn update_spac(&self, spac: &Spac, audit: &AuditLog) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE spacs
            SET spac_name = $3, ticker = $4, status_code = $5, description = $6,
                trust_amount_cents = $7, ipo_utc = $8, deadline_utc = $9, updated_utc = $10
            WHERE organization_id = $1 AND spac_id = $2 AND deleted_utc IS NULL
            "#,
        )
        .bind(spac.organization_id)
        .bind(spac.spac_id)
        .bind(&spac.spac_name)
        .bind(&spac.ticker)
        .bind(&spac.status_code)
        .bind(&spac.description)
        .bind(spac.trust_amount_cents)
        .bind(spac.ipo_utc)
        .bind(spac.deadline_utc)
        .bind(spac.updated_utc)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            conflict_on_unique(e, "A SPAC with this ticker already exists in the organization")
        })?;

        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Soft-delete a SPAC with its audit record.
    pub async fn soft_delete_spac(
        &self,
        organization_id: Uuid,
        spac_id: Uuid,
        audit: &AuditLog,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE spacs SET deleted_utc = now(), updated_utc = now()
            WHERE organization_id = $1 AND spac_id = $2 AND deleted_utc IS NULL
            "#,
        )
        .bind(organization_id)
        .bind(spac_id)
        .execute(&mut *tx)
        .await?;

        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    /// List SPACs with the validated filter/sort/pagination spec.
    pub async fn list_spacs(
        &self,
        organization_id: Uuid,
        status: Option<SpacStatus>,
        spec: &ListSpec<SpacSortField>,
    ) -> Result<(Vec<Spac>, u64), AppError> {
        let push_filters = |qb: &mut QueryBuilder<Postgres>| {
            qb.push(" WHERE organization_id = ")
                .push_bind(organization_id)
                .push(" AND deleted_utc IS NULL");
            if let Some(status) = status {
                qb.push(" AND status_code = ").push_bind(status.as_str());
            }
            push_search(qb, &spec.search, &["spac_name", "ticker", "description"]);
        };

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM spacs");
        push_filters(&mut count_qb);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM spacs");
        push_filters(&mut qb);
        push_order_and_page(&mut qb, spec, "spac_id");
        let rows = qb.build_query_as::<Spac>().fetch_all(&self.pool).await?;

        Ok((rows, total as u64))
    }

    /// Live targets currently attached to a SPAC, for scoring context.
    pub async fn find_targets_for_spac(
        &self,
        organization_id: Uuid,
        spac_id: Uuid,
    ) -> Result<Vec<Target>, AppError> {
        sqlx::query_as::<_, Target>(
            r#"
            SELECT * FROM targets
            WHERE organization_id = $1 AND spac_id = $2 AND deleted_utc IS NULL
            ORDER BY created_utc DESC, target_id ASC
            "#,
        )
        .bind(organization_id)
        .bind(spac_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    // ==================== Target Operations ====================

    pub async fn insert_target(&self, target: &Target, audit: &AuditLog) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO targets (target_id, organization_id, spac_id, target_name, sector,
                                 description, stage_code, enterprise_value_cents,
                                 created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(target.target_id)
        .bind(target.organization_id)
        .bind(target.spac_id)
        .bind(&target.target_name)
        .bind(&target.sector)
        .bind(&target.description)
        .bind(&target.stage_code)
        .bind(target.enterprise_value_cents)
        .bind(target.created_utc)
        .bind(target.updated_utc)
        .execute(&mut *tx)
        .await?;

        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn find_target(&self, target_id: Uuid) -> Result<Option<Target>, AppError> {
        sqlx::query_as::<_, Target>(
            "SELECT * FROM targets WHERE target_id = $1 AND deleted_utc IS NULL",
        )
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    pub async fn update_target(&self, target: &Target, audit: &AuditLog) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE targets
            SET spac_id = $3, target_name = $4, sector = $5, description = $6,
                stage_code = $7, enterprise_value_cents = $8, updated_utc = $9
            WHERE organization_id = $1 AND target_id = $2 AND deleted_utc IS NULL
            "#,
        )
        .bind(target.organization_id)
        .bind(target.target_id)
        .bind(target.spac_id)
        .bind(&target.target_name)
        .bind(&target.sector)
        .bind(&target.description)
        .bind(&target.stage_code)
        .bind(target.enterprise_value_cents)
        .bind(target.updated_utc)
        .execute(&mut *tx)
        .await?;

        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn soft_delete_target(
        &self,
        organization_id: Uuid,
        target_id: Uuid,
        audit: &AuditLog,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE targets SET deleted_utc = now(), updated_utc = now()
            WHERE organization_id = $1 AND target_id = $2 AND deleted_utc IS NULL
            "#,
        )
        .bind(organization_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_targets(
        &self,
        organization_id: Uuid,
        stage: Option<TargetStage>,
        spec: &ListSpec<TargetSortField>,
    ) -> Result<(Vec<Target>, u64), AppError> {
        let push_filters = |qb: &mut QueryBuilder<Postgres>| {
            qb.push(" WHERE organization_id = ")
                .push_bind(organization_id)
                .push(" AND deleted_utc IS NULL");
            if let Some(stage) = stage {
                qb.push(" AND stage_code = ").push_bind(stage.as_str());
            }
            push_search(qb, &spec.search, &["target_name", "sector", "description"]);
        };

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM targets");
        push_filters(&mut count_qb);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM targets");
        push_filters(&mut qb);
        push_order_and_page(&mut qb, spec, "target_id");
        let rows = qb.build_query_as::<Target>().fetch_all(&self.pool).await?;

        Ok((rows, total as u64))
    }

    // ==================== Document Operations ====================

    pub async fn insert_document(
        &self,
        document: &Document,
        audit: &AuditLog,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (document_id, organization_id, spac_id, doc_name, mime_type,
                                   size_bytes, storage_key, uploaded_by, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(document.document_id)
        .bind(document.organization_id)
        .bind(document.spac_id)
        .bind(&document.doc_name)
        .bind(&document.mime_type)
        .bind(document.size_bytes)
        .bind(&document.storage_key)
        .bind(document.uploaded_by)
        .bind(document.created_utc)
        .bind(document.updated_utc)
        .execute(&mut *tx)
        .await?;

        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn find_document(&self, document_id: Uuid) -> Result<Option<Document>, AppError> {
        sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE document_id = $1 AND deleted_utc IS NULL",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Update document metadata. The persisted analysis for the document is
    /// invalidated in the same transaction: stale summaries must never
    /// outlive the content they describe.
    pub async fn update_document(
        &self,
        document: &Document,
        audit: &AuditLog,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE documents
            SET spac_id = $3, doc_name = $4, updated_utc = $5
            WHERE organization_id = $1 AND document_id = $2 AND deleted_utc IS NULL
            "#,
        )
        .bind(document.organization_id)
        .bind(document.document_id)
        .bind(document.spac_id)
        .bind(&document.doc_name)
        .bind(document.updated_utc)
        .execute(&mut *tx)
        .await?;

        delete_analysis_tx(&mut tx, document.document_id).await?;
        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Soft-delete a document and invalidate its analysis, atomically.
    pub async fn soft_delete_document(
        &self,
        organization_id: Uuid,
        document_id: Uuid,
        audit: &AuditLog,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE documents SET deleted_utc = now(), updated_utc = now()
            WHERE organization_id = $1 AND document_id = $2 AND deleted_utc IS NULL
            "#,
        )
        .bind(organization_id)
        .bind(document_id)
        .execute(&mut *tx)
        .await?;

        delete_analysis_tx(&mut tx, document_id).await?;
        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_documents(
        &self,
        organization_id: Uuid,
        spec: &ListSpec<DocumentSortField>,
    ) -> Result<(Vec<Document>, u64), AppError> {
        let push_filters = |qb: &mut QueryBuilder<Postgres>| {
            qb.push(" WHERE organization_id = ")
                .push_bind(organization_id)
                .push(" AND deleted_utc IS NULL");
            push_search(qb, &spec.search, &["doc_name", "mime_type"]);
        };

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM documents");
        push_filters(&mut count_qb);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM documents");
        push_filters(&mut qb);
        push_order_and_page(&mut qb, spec, "document_id");
        let rows = qb.build_query_as::<Document>().fetch_all(&self.pool).await?;

        Ok((rows, total as u64))
    }

    // ==================== Contact Operations ====================

    pub async fn insert_contact(&self, contact: &Contact, audit: &AuditLog) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO contacts (contact_id, organization_id, full_name, email, firm,
                                  contact_role, notes, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(contact.contact_id)
        .bind(contact.organization_id)
        .bind(&contact.full_name)
        .bind(&contact.email)
        .bind(&contact.firm)
        .bind(&contact.contact_role)
        .bind(&contact.notes)
        .bind(contact.created_utc)
        .bind(contact.updated_utc)
        .execute(&mut *tx)
        .await?;

        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn find_contact(&self, contact_id: Uuid) -> Result<Option<Contact>, AppError> {
        sqlx::query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE contact_id = $1 AND deleted_utc IS NULL",
        )
        .bind(contact_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    pub async fn update_contact(&self, contact: &Contact, audit: &AuditLog) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE contacts
            SET full_name = $3, email = $4, firm = $5, contact_role = $6, notes = $7,
                updated_utc = $8
            WHERE organization_id = $1 AND contact_id = $2 AND deleted_utc IS NULL
            "#,
        )
        .bind(contact.organization_id)
        .bind(contact.contact_id)
        .bind(&contact.full_name)
        .bind(&contact.email)
        .bind(&contact.firm)
        .bind(&contact.contact_role)
        .bind(&contact.notes)
        .bind(contact.updated_utc)
        .execute(&mut *tx)
        .await?;

        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn soft_delete_contact(
        &self,
        organization_id: Uuid,
        contact_id: Uuid,
        audit: &AuditLog,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE contacts SET deleted_utc = now(), updated_utc = now()
            WHERE organization_id = $1 AND contact_id = $2 AND deleted_utc IS NULL
            "#,
        )
        .bind(organization_id)
        .bind(contact_id)
        .execute(&mut *tx)
        .await?;

        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_contacts(
        &self,
        organization_id: Uuid,
        spec: &ListSpec<ContactSortField>,
    ) -> Result<(Vec<Contact>, u64), AppError> {
        let push_filters = |qb: &mut QueryBuilder<Postgres>| {
            qb.push(" WHERE organization_id = ")
                .push_bind(organization_id)
                .push(" AND deleted_utc IS NULL");
            push_search(qb, &spec.search, &["full_name", "email", "firm", "notes"]);
        };

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM contacts");
        push_filters(&mut count_qb);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM contacts");
        push_filters(&mut qb);
        push_order_and_page(&mut qb, spec, "contact_id");
        let rows = qb.build_query_as::<Contact>().fetch_all(&self.pool).await?;

        Ok((rows, total as u64))
    }

    // ==================== Analysis Operations ====================

    pub async fn find_analysis(
        &self,
        document_id: Uuid,
    ) -> Result<Option<DocumentAnalysis>, AppError> {
        sqlx::query_as::<_, DocumentAnalysis>(
            "SELECT * FROM document_analyses WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Store (or refresh) the analysis for a document, with its audit
    /// record, atomically.
    pub async fn upsert_analysis(
        &self,
        analysis: &DocumentAnalysis,
        audit: &AuditLog,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO document_analyses (document_id, organization_id, summary, risk_factors,
                                           model_name, analyzed_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (document_id) DO UPDATE
            SET summary = EXCLUDED.summary, risk_factors = EXCLUDED.risk_factors,
                model_name = EXCLUDED.model_name, analyzed_utc = EXCLUDED.analyzed_utc
            "#,
        )
        .bind(analysis.document_id)
        .bind(analysis.organization_id)
        .bind(&analysis.summary)
        .bind(&analysis.risk_factors)
        .bind(&analysis.model_name)
        .bind(analysis.analyzed_utc)
        .execute(&mut *tx)
        .await?;

        insert_audit_tx(&mut tx, audit).await?;

        tx.commit().await?;
        Ok(())
    }

    // ==================== Audit Log Operations ====================

    /// Append a standalone audit record (used for read-side events such as
    /// exports, which have no accompanying mutation).
    pub async fn insert_audit(&self, audit: &AuditLog) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        insert_audit_tx(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_audit_logs(
        &self,
        organization_id: Uuid,
        spec: &ListSpec<AuditSortField>,
    ) -> Result<(Vec<AuditLog>, u64), AppError> {
        let push_filters = |qb: &mut QueryBuilder<Postgres>| {
            qb.push(" WHERE organization_id = ").push_bind(organization_id);
            push_search(qb, &spec.search, &["action", "entity_type"]);
        };

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs");
        push_filters(&mut count_qb);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM audit_logs");
        push_filters(&mut qb);
        push_order_and_page(&mut qb, spec, "audit_id");
        let rows = qb.build_query_as::<AuditLog>().fetch_all(&self.pool).await?;

        Ok((rows, total as u64))
    }

    /// Fetch audit rows for CSV export, newest first, bounded.
    pub async fn export_audit_logs(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<AuditLog>, AppError> {
        sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE organization_id = $1
            ORDER BY created_utc DESC, audit_id ASC
            LIMIT $2
            "#,
        )
        .bind(organization_id)
        .bind(AUDIT_EXPORT_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }
}

// ==================== Shared query fragments ====================

/// Append the case-insensitive substring search predicate: each column is
/// ILIKE-matched against the escaped term, OR-combined.
fn push_search(qb: &mut QueryBuilder<Postgres>, search: &Option<String>, columns: &[&str]) {
    if let Some(term) = search {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column)
                .push(" ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
        qb.push(")");
    }
}

/// Append ORDER BY / LIMIT / OFFSET. The sort column comes from the typed
/// allow-list, never from caller input, and the primary key is always a
/// secondary sort key so pagination is deterministic across ties.
fn push_order_and_page<S: SortKey>(
    qb: &mut QueryBuilder<Postgres>,
    spec: &ListSpec<S>,
    id_column: &str,
) {
    qb.push(" ORDER BY ")
        .push(spec.sort_by.column())
        .push(" ")
        .push(spec.sort_order.as_sql())
        .push(", ")
        .push(id_column)
        .push(" ASC LIMIT ")
        .push_bind(spec.page.limit())
        .push(" OFFSET ")
        .push_bind(spec.page.offset());
}

async fn insert_membership_tx(
    tx: &mut Transaction<'_, Postgres>,
    membership: &Membership,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO memberships (membership_id, organization_id, user_id, role_code, created_utc)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(membership.membership_id)
    .bind(membership.organization_id)
    .bind(membership.user_id)
    .bind(&membership.role_code)
    .bind(membership.created_utc)
    .execute(&mut **tx)
    .await
    .map_err(|e| conflict_on_unique(e, "The principal is already a member of the organization"))?;
    Ok(())
}

async fn insert_audit_tx(
    tx: &mut Transaction<'_, Postgres>,
    audit: &AuditLog,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (audit_id, organization_id, user_id, action, entity_type,
                                entity_id, metadata, created_utc)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(audit.audit_id)
    .bind(audit.organization_id)
    .bind(audit.user_id)
    .bind(&audit.action)
    .bind(&audit.entity_type)
    .bind(audit.entity_id)
    .bind(&audit.metadata)
    .bind(audit.created_utc)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn delete_analysis_tx(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM document_analyses WHERE document_id = $1")
        .bind(document_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Map unique-constraint violations to a Conflict with a stable message;
/// everything else stays a database error.
fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(anyhow::anyhow!("{}", message))
        }
        _ => AppError::from(err),
    }
}
