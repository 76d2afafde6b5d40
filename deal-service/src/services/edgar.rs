//! SEC EDGAR filings lookup.
//!
//! EDGAR serves one JSON document per company (`/submissions/CIK##########.json`)
//! holding the recent-filings table as parallel arrays. The source seam
//! fetches and normalizes that document; [`EdgarService`] filters, paginates
//! and memoizes the result per logical query so repeated lookups inside the
//! TTL window cost nothing upstream. EDGAR rate-limits aggressively and
//! requires a descriptive User-Agent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use service_core::error::{AppError, FieldError};
use service_core::utils::cache::TtlCache;
use service_core::utils::pagination::PageQuery;
use service_core::utils::retry::{retry_request, RetryClass, RetryConfig};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::EdgarConfig;

/// One row of the recent-filings table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filing {
    pub accession_number: String,
    pub form_type: String,
    pub filing_date: String,
    pub primary_document: String,
    pub description: Option<String>,
}

/// The normalized submissions document for one company.
#[derive(Debug, Clone)]
pub struct CompanyFilings {
    pub cik: String,
    pub company_name: String,
    pub filings: Vec<Filing>,
}

#[derive(Debug, Error)]
pub enum FilingsError {
    #[error("no company found for CIK {0}")]
    NotFound(String),

    #[error("filings provider returned status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response shape: {0}")]
    Malformed(String),
}

impl From<FilingsError> for AppError {
    fn from(err: FilingsError) -> Self {
        match err {
            FilingsError::NotFound(cik) => {
                AppError::NotFound(anyhow::anyhow!("No filings found for CIK {}", cik))
            }
            other => AppError::Upstream(anyhow::anyhow!(other)),
        }
    }
}

/// Source seam for the submissions document; the HTTP implementation talks
/// to EDGAR, tests substitute a canned source with a call counter.
#[async_trait]
pub trait FilingsSource: Send + Sync {
    async fn fetch_company_filings(&self, cik: &str) -> Result<CompanyFilings, FilingsError>;
}

/// A validated filings lookup.
#[derive(Debug, Clone)]
pub struct FilingsQuery {
    /// Zero-padded 10-digit CIK.
    pub cik: String,
    /// Upper-cased form-type filter; empty means all forms.
    pub form_types: Vec<String>,
    pub page: PageQuery,
}

impl FilingsQuery {
    pub fn new(
        raw_cik: &str,
        raw_form_types: Option<&str>,
        page: PageQuery,
    ) -> Result<Self, FieldError> {
        let cik = normalize_cik(raw_cik)?;
        let form_types = raw_form_types
            .map(|s| {
                s.split(',')
                    .map(|f| f.trim().to_uppercase())
                    .filter(|f| !f.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            cik,
            form_types,
            page,
        })
    }

    /// Deterministic cache key for the logical request.
    fn cache_key(&self) -> String {
        format!(
            "filings:{}:{}:{}:{}",
            self.cik,
            self.page.page,
            self.page.page_size,
            self.form_types.join(",")
        )
    }
}

/// One page of filtered filings, as cached and as returned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingsPage {
    pub cik: String,
    pub company_name: String,
    pub items: Vec<Filing>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

/// Filings lookups with a process-local TTL cache in front of the source.
pub struct EdgarService {
    source: Arc<dyn FilingsSource>,
    cache: TtlCache<FilingsPage>,
}

impl EdgarService {
    pub fn new(source: Arc<dyn FilingsSource>, cache_ttl: Duration, cache_max_entries: usize) -> Self {
        Self {
            source,
            cache: TtlCache::new(cache_ttl, cache_max_entries),
        }
    }

    /// Look up one page of filings. The boolean is the `cached` flag: true
    /// when the page was served without touching the source.
    pub async fn lookup(&self, query: &FilingsQuery) -> Result<(FilingsPage, bool), AppError> {
        let key = query.cache_key();

        if let Some(page) = self.cache.get(&key) {
            tracing::debug!(cache_key = %key, "Filings lookup served from cache");
            return Ok((page, true));
        }

        let company = self.source.fetch_company_filings(&query.cik).await?;

        let filtered: Vec<Filing> = company
            .filings
            .into_iter()
            .filter(|f| {
                query.form_types.is_empty() || query.form_types.contains(&f.form_type.to_uppercase())
            })
            .collect();

        let total = filtered.len() as u64;
        let start = (query.page.offset() as usize).min(filtered.len());
        let end = (start + query.page.limit() as usize).min(filtered.len());
        let items = filtered[start..end].to_vec();
        let total_pages = (total as f64 / query.page.page_size as f64).ceil() as u64;

        let page = FilingsPage {
            cik: company.cik,
            company_name: company.company_name,
            items,
            total,
            page: query.page.page,
            page_size: query.page.page_size,
            total_pages,
        };

        self.cache.insert(key, page.clone());
        Ok((page, false))
    }
}

/// Validate a CIK: digits only, at most ten, zero-padded for the EDGAR URL.
pub fn normalize_cik(raw: &str) -> Result<String, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.len() > 10
        || !trimmed.chars().all(|c| c.is_ascii_digit())
    {
        return Err(FieldError::new(
            "cik",
            format!("'{}' is not a valid CIK (1-10 digits)", raw),
        ));
    }
    Ok(format!("{:0>10}", trimmed))
}

// ==================== HTTP source ====================

pub struct EdgarHttpSource {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    retry: RetryConfig,
}

impl EdgarHttpSource {
    pub fn new(config: &EdgarConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            retry: RetryConfig::default(),
        })
    }

    async fn fetch_once(&self, cik: &str) -> Result<CompanyFilings, FilingsError> {
        let url = format!("{}/submissions/CIK{}.json", self.base_url, cik);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| FilingsError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FilingsError::NotFound(cik.to_string()));
        }
        if !status.is_success() {
            return Err(FilingsError::Status(status.as_u16()));
        }

        let submissions: SubmissionsResponse = response
            .json()
            .await
            .map_err(|e| FilingsError::Malformed(e.to_string()))?;

        Ok(convert_submissions(cik, submissions))
    }
}

#[async_trait]
impl FilingsSource for EdgarHttpSource {
    async fn fetch_company_filings(&self, cik: &str) -> Result<CompanyFilings, FilingsError> {
        retry_request(
            &self.retry,
            "edgar_submissions",
            |err: &FilingsError| match err {
                FilingsError::Network(_) => RetryClass::Transient,
                FilingsError::Status(code) if *code == 429 || *code >= 500 => RetryClass::Transient,
                _ => RetryClass::Permanent,
            },
            || self.fetch_once(cik),
        )
        .await
    }
}

// Wire shapes for the submissions document. The recent table arrives as
// parallel arrays indexed by filing.
#[derive(Debug, Deserialize)]
struct SubmissionsResponse {
    name: String,
    #[serde(default)]
    filings: SubmissionFilings,
}

#[derive(Debug, Default, Deserialize)]
struct SubmissionFilings {
    #[serde(default)]
    recent: RecentFilings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentFilings {
    #[serde(default)]
    accession_number: Vec<String>,
    #[serde(default)]
    form: Vec<String>,
    #[serde(default)]
    filing_date: Vec<String>,
    #[serde(default)]
    primary_document: Vec<String>,
    #[serde(default)]
    primary_doc_description: Vec<String>,
}

fn convert_submissions(cik: &str, submissions: SubmissionsResponse) -> CompanyFilings {
    let recent = submissions.filings.recent;
    let count = recent
        .accession_number
        .len()
        .min(recent.form.len())
        .min(recent.filing_date.len());

    let filings = (0..count)
        .map(|i| Filing {
            accession_number: recent.accession_number[i].clone(),
            form_type: recent.form[i].clone(),
            filing_date: recent.filing_date[i].clone(),
            primary_document: recent.primary_document.get(i).cloned().unwrap_or_default(),
            description: recent
                .primary_doc_description
                .get(i)
                .filter(|d| !d.is_empty())
                .cloned(),
        })
        .collect();

    CompanyFilings {
        cik: cik.to_string(),
        company_name: submissions.name,
        filings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedSource {
        calls: AtomicUsize,
        filings: Vec<Filing>,
    }

    impl CannedSource {
        fn with_forms(forms: &[&str]) -> Self {
            let filings = forms
                .iter()
                .enumerate()
                .map(|(i, form)| Filing {
                    accession_number: format!("0000320193-24-{:06}", i),
                    form_type: form.to_string(),
                    filing_date: "2024-05-01".to_string(),
                    primary_document: format!("doc{}.htm", i),
                    description: None,
                })
                .collect();
            Self {
                calls: AtomicUsize::new(0),
                filings,
            }
        }
    }

    #[async_trait]
    impl FilingsSource for CannedSource {
        async fn fetch_company_filings(&self, cik: &str) -> Result<CompanyFilings, FilingsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompanyFilings {
                cik: cik.to_string(),
                company_name: "Apple Inc.".to_string(),
                filings: self.filings.clone(),
            })
        }
    }

    fn query(page: u32, page_size: u32, forms: Option<&str>) -> FilingsQuery {
        FilingsQuery::new("320193", forms, PageQuery { page, page_size }).unwrap()
    }

    #[test]
    fn cik_is_zero_padded_and_validated() {
        assert_eq!(normalize_cik("320193").unwrap(), "0000320193");
        assert_eq!(normalize_cik("0000320193").unwrap(), "0000320193");
        assert!(normalize_cik("").is_err());
        assert!(normalize_cik("AAPL").is_err());
        assert!(normalize_cik("12345678901").is_err());
    }

    #[test]
    fn cache_key_includes_every_query_dimension() {
        let q = query(2, 20, Some("10-K,10-Q"));
        assert_eq!(q.cache_key(), "filings:0000320193:2:20:10-K,10-Q");
    }

    #[tokio::test]
    async fn second_lookup_within_ttl_skips_the_source() {
        let source = Arc::new(CannedSource::with_forms(&["10-K", "10-Q", "8-K"]));
        let service = EdgarService::new(source.clone(), Duration::from_secs(300), 100);
        let q = query(1, 20, None);

        let (first, cached) = service.lookup(&q).await.unwrap();
        assert!(!cached);
        assert_eq!(first.total, 3);

        let (second, cached) = service.lookup(&q).await.unwrap();
        assert!(cached);
        assert_eq!(second.total, 3);

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_refetches_from_the_source() {
        let source = Arc::new(CannedSource::with_forms(&["10-K"]));
        let service = EdgarService::new(source.clone(), Duration::from_millis(10), 100);
        let q = query(1, 20, None);

        let (_, cached) = service.lookup(&q).await.unwrap();
        assert!(!cached);

        tokio::time::sleep(Duration::from_millis(20)).await;

        let (_, cached) = service.lookup(&q).await.unwrap();
        assert!(!cached);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn form_filter_and_pagination_apply_in_order() {
        let source = Arc::new(CannedSource::with_forms(&[
            "10-K", "8-K", "10-Q", "8-K", "10-K", "S-1",
        ]));
        let service = EdgarService::new(source, Duration::from_secs(300), 100);

        let (page, _) = service
            .lookup(&query(1, 2, Some("10-k,8-K")))
            .await
            .unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].form_type, "10-K");
        assert_eq!(page.items[1].form_type, "8-K");

        let (page2, _) = service
            .lookup(&query(2, 2, Some("10-K,8-K")))
            .await
            .unwrap();
        assert_eq!(page2.items.len(), 2);

        let (page3, _) = service
            .lookup(&query(3, 2, Some("10-K,8-K")))
            .await
            .unwrap();
        assert!(page3.items.is_empty());
    }

    #[test]
    fn submissions_arrays_zip_into_filings() {
        let submissions = SubmissionsResponse {
            name: "Apple Inc.".to_string(),
            filings: SubmissionFilings {
                recent: RecentFilings {
                    accession_number: vec!["a".into(), "b".into()],
                    form: vec!["10-K".into(), "8-K".into()],
                    filing_date: vec!["2024-01-02".into(), "2024-02-03".into()],
                    primary_document: vec!["x.htm".into()],
                    primary_doc_description: vec!["Annual report".into(), "".into()],
                },
            },
        };
        let company = convert_submissions("0000320193", submissions);
        assert_eq!(company.filings.len(), 2);
        assert_eq!(company.filings[0].description.as_deref(), Some("Annual report"));
        assert_eq!(company.filings[1].primary_document, "");
        assert!(company.filings[1].description.is_none());
    }
}
