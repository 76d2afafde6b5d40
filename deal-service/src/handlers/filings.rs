//! SEC filings lookup handler.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use service_core::error::{AppError, FieldError};
use service_core::utils::pagination::PageQuery;

use crate::middleware::AuthUser;
use crate::services::{FilingsPage, FilingsQuery};
use crate::startup::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingsParams {
    pub cik: Option<String>,
    pub form_types: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// One page of filings plus the cache-provenance flag.
#[derive(Debug, Serialize)]
pub struct FilingsResponse {
    #[serde(flatten)]
    pub page: FilingsPage,
    pub cached: bool,
}

/// Look up recent SEC filings for a company by CIK. Results come through
/// the ephemeral cache; the response says which path served it. The lookup
/// is not tenant-scoped - filings are public data - but still requires an
/// authenticated caller.
///
/// GET /filings
pub async fn lookup_filings(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<FilingsParams>,
) -> Result<Json<FilingsResponse>, AppError> {
    let mut errors: Vec<FieldError> = Vec::new();

    let page = match PageQuery::normalize(params.page.as_deref(), params.page_size.as_deref(), 20)
    {
        Ok(page) => page,
        Err(mut page_errors) => {
            errors.append(&mut page_errors);
            PageQuery {
                page: 1,
                page_size: 20,
            }
        }
    };

    let raw_cik = match params.cik.as_deref() {
        Some(raw) => raw,
        None => {
            errors.push(FieldError::new("cik", "is required"));
            return Err(AppError::InvalidQuery(errors));
        }
    };

    let query = match FilingsQuery::new(raw_cik, params.form_types.as_deref(), page) {
        Ok(query) => query,
        Err(e) => {
            errors.push(e);
            return Err(AppError::InvalidQuery(errors));
        }
    };

    if !errors.is_empty() {
        return Err(AppError::InvalidQuery(errors));
    }

    let (page, cached) = state.edgar.lookup(&query).await?;

    Ok(Json(FilingsResponse { page, cached }))
}
