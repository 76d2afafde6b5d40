//! AI-assisted deal scoring and document review.
//!
//! Provider abstraction in the same shape as the filings source: a trait
//! seam with an HTTP implementation for the real vendor and a deterministic
//! mock for tests and development.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::config::AiConfig;

/// Error type for provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(_) => AppError::ServiceUnavailable,
            other => AppError::Upstream(anyhow::anyhow!(other)),
        }
    }
}

/// The deal snapshot handed to the provider for scoring.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealContext {
    pub spac_name: String,
    pub ticker: String,
    pub status: String,
    pub trust_amount_cents: Option<i64>,
    pub deadline_utc: Option<chrono::DateTime<chrono::Utc>>,
    pub targets: Vec<TargetBrief>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetBrief {
    pub name: String,
    pub sector: Option<String>,
    pub stage: String,
    pub enterprise_value_cents: Option<i64>,
}

/// Provider verdict on a deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealScore {
    /// 0-100.
    pub score: u8,
    pub rationale: String,
    pub factors: Vec<ScoreFactor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreFactor {
    pub name: String,
    pub assessment: String,
}

/// Provider summary of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReview {
    pub summary: String,
    pub risk_factors: Vec<String>,
}

#[async_trait]
pub trait ScoringProvider: Send + Sync {
    /// Score a deal from its context snapshot.
    async fn score_deal(&self, context: &DealContext) -> Result<DealScore, ProviderError>;

    /// Summarize a document and extract risk factors from its text.
    async fn review_document(
        &self,
        doc_name: &str,
        text: &str,
    ) -> Result<DocumentReview, ProviderError>;

    /// Model identifier recorded alongside persisted results.
    fn model_name(&self) -> &str;
}

// ==================== HTTP provider ====================

/// Generic JSON-generation vendor client: prompts go in, a JSON document
/// comes back as text and is parsed into the typed result.
pub struct HttpScoringProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpScoringProvider {
    pub fn new(config: &AiConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "AI_API_KEY is not set".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn generate<T: serde::de::DeserializeOwned>(
        &self,
        prompt: String,
    ) -> Result<T, ProviderError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            response_format: "json",
        };

        let response = self
            .client
            .post(format!("{}/v1/generate", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "provider returned {}: {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        serde_json::from_str(&generated.text)
            .map_err(|e| ProviderError::InvalidResponse(format!("not valid result JSON: {}", e)))
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    response_format: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}

#[async_trait]
impl ScoringProvider for HttpScoringProvider {
    async fn score_deal(&self, context: &DealContext) -> Result<DealScore, ProviderError> {
        let context_json = serde_json::to_string(context)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let prompt = format!(
            "You are evaluating a SPAC business combination. Given this deal context as JSON:\n\
             {}\n\
             Respond with a JSON object {{\"score\": <0-100>, \"rationale\": <string>, \
             \"factors\": [{{\"name\": <string>, \"assessment\": <string>}}]}}.",
            context_json
        );

        tracing::debug!(
            model = %self.model,
            spac = %context.spac_name,
            target_count = context.targets.len(),
            "Requesting deal score"
        );

        self.generate(prompt).await
    }

    async fn review_document(
        &self,
        doc_name: &str,
        text: &str,
    ) -> Result<DocumentReview, ProviderError> {
        let prompt = format!(
            "Summarize the deal document '{}' and list its key risk factors.\n\
             Respond with a JSON object {{\"summary\": <string>, \"riskFactors\": [<string>]}}.\n\
             Document text:\n{}",
            doc_name, text
        );

        tracing::debug!(
            model = %self.model,
            document = %doc_name,
            text_len = text.len(),
            "Requesting document review"
        );

        self.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ==================== Mock provider ====================

/// Deterministic provider for tests and development. Call counts are
/// exposed so tests can verify the persisted-cache behavior.
#[derive(Default)]
pub struct MockScoringProvider {
    pub score_calls: AtomicUsize,
    pub review_calls: AtomicUsize,
}

impl MockScoringProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScoringProvider for MockScoringProvider {
    async fn score_deal(&self, context: &DealContext) -> Result<DealScore, ProviderError> {
        self.score_calls.fetch_add(1, Ordering::SeqCst);

        // Deterministic but input-sensitive: more pipeline progress scores
        // higher, an empty pipeline scores low.
        let base: u8 = 40;
        let pipeline_bonus = (context.targets.len() as u8).min(5) * 8;
        let trust_bonus = if context.trust_amount_cents.unwrap_or(0) > 0 { 10 } else { 0 };
        let score = (base + pipeline_bonus + trust_bonus).min(100);

        Ok(DealScore {
            score,
            rationale: format!(
                "{} ({}) has {} candidate target(s) in the pipeline",
                context.spac_name,
                context.ticker,
                context.targets.len()
            ),
            factors: context
                .targets
                .iter()
                .map(|t| ScoreFactor {
                    name: t.name.clone(),
                    assessment: format!("stage: {}", t.stage),
                })
                .collect(),
        })
    }

    async fn review_document(
        &self,
        doc_name: &str,
        text: &str,
    ) -> Result<DocumentReview, ProviderError> {
        self.review_calls.fetch_add(1, Ordering::SeqCst);

        Ok(DocumentReview {
            summary: format!("{} ({} characters reviewed)", doc_name, text.len()),
            risk_factors: vec!["Redemption risk".to_string(), "Deadline pressure".to_string()],
        })
    }

    fn model_name(&self) -> &str {
        "mock-scorer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(target_count: usize) -> DealContext {
        DealContext {
            spac_name: "Apex Acquisition Corp".to_string(),
            ticker: "APEX".to_string(),
            status: "searching".to_string(),
            trust_amount_cents: Some(25_000_000_000),
            deadline_utc: None,
            targets: (0..target_count)
                .map(|i| TargetBrief {
                    name: format!("Target {}", i),
                    sector: Some("industrials".to_string()),
                    stage: "diligence".to_string(),
                    enterprise_value_cents: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn mock_scores_are_deterministic_and_bounded() {
        let provider = MockScoringProvider::new();
        let a = provider.score_deal(&context(3)).await.unwrap();
        let b = provider.score_deal(&context(3)).await.unwrap();
        assert_eq!(a.score, b.score);
        assert!(a.score <= 100);
        assert_eq!(a.factors.len(), 3);
        assert_eq!(provider.score_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_pipeline_scores_lower_than_active_pipeline() {
        let provider = MockScoringProvider::new();
        let empty = provider.score_deal(&context(0)).await.unwrap();
        let busy = provider.score_deal(&context(4)).await.unwrap();
        assert!(empty.score < busy.score);
    }

    #[test]
    fn provider_without_key_reports_not_configured() {
        let config = AiConfig {
            provider: crate::config::AiProviderKind::Http,
            base_url: "http://localhost:9900".to_string(),
            api_key: String::new(),
            model: "deal-scorer-1".to_string(),
            timeout_seconds: 5,
            analysis_ttl_hours: 24,
        };
        assert!(matches!(
            HttpScoringProvider::new(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
