use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct DealConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub edgar: EdgarConfig,
    pub ai: AiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Path to the identity provider's RS256 public key; tokens are only
    /// ever validated here, never issued.
    pub public_key_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub local_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgarConfig {
    pub base_url: String,
    /// SEC requires a descriptive User-Agent with contact information.
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub provider: AiProviderKind,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub analysis_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderKind {
    Http,
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl DealConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = DealConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("deal-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?,
            },
            jwt: JwtConfig {
                public_key_path: get_env("JWT_PUBLIC_KEY_PATH", None, is_prod)?,
            },
            storage: StorageConfig {
                local_path: get_env("STORAGE_LOCAL_PATH", Some("./storage"), is_prod)?,
            },
            edgar: EdgarConfig {
                base_url: get_env("EDGAR_BASE_URL", Some("https://data.sec.gov"), is_prod)?,
                user_agent: get_env(
                    "EDGAR_USER_AGENT",
                    Some("dealdesk dev@localhost"),
                    is_prod,
                )?,
                timeout_seconds: parse_env("EDGAR_TIMEOUT_SECONDS", Some("10"), is_prod)?,
                cache_ttl_seconds: parse_env("EDGAR_CACHE_TTL_SECONDS", Some("300"), is_prod)?,
                cache_max_entries: parse_env("EDGAR_CACHE_MAX_ENTRIES", Some("100"), is_prod)?,
            },
            ai: AiConfig {
                provider: get_env("AI_PROVIDER", Some("mock"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                base_url: get_env("AI_BASE_URL", Some("http://localhost:9900"), is_prod)?,
                api_key: get_env("AI_API_KEY", Some(""), is_prod)?,
                model: get_env("AI_MODEL", Some("deal-scorer-1"), is_prod)?,
                timeout_seconds: parse_env("AI_TIMEOUT_SECONDS", Some("60"), is_prod)?,
                analysis_ttl_hours: parse_env("AI_ANALYSIS_TTL_HOURS", Some("24"), is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.ai.analysis_ttl_hours <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "AI_ANALYSIS_TTL_HOURS must be positive"
            )));
        }

        if self.edgar.cache_max_entries == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "EDGAR_CACHE_MAX_ENTRIES must be greater than 0"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.ai.provider == AiProviderKind::Mock {
                tracing::warn!("AI provider is 'mock' in production - deal scores will be synthetic");
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?.parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} is not valid: {}", key, e))
    })
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for AiProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(AiProviderKind::Http),
            "mock" => Ok(AiProviderKind::Mock),
            _ => Err(format!("Invalid AI provider kind: {}", s)),
        }
    }
}
