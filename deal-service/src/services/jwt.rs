//! Access-token validation. Tokens are issued by the external identity
//! provider; this service only ever verifies them against the provider's
//! published RS256 public key.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use crate::config::JwtConfig;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (principal ID)
    pub sub: Uuid,
    /// Email
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
}

impl JwtVerifier {
    pub fn from_config(config: &JwtConfig) -> Result<Self, AppError> {
        let pem = std::fs::read(&config.public_key_path).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Failed to read JWT public key at {}: {}",
                config.public_key_path,
                e
            ))
        })?;
        Self::from_public_key_pem(&pem)
    }

    pub fn from_public_key_pem(pem: &[u8]) -> Result<Self, AppError> {
        let decoding_key = DecodingKey::from_rsa_pem(pem)?;
        Ok(Self { decoding_key })
    }

    /// Validate and decode an access token.
    pub fn validate(&self, token: &str) -> Result<AccessClaims, AppError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;

        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &validation)?;

        Ok(token_data.claims)
    }
}
