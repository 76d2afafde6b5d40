use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AiProviderKind, DealConfig};
use crate::db;
use crate::handlers;
use crate::middleware::auth_middleware;
use crate::services::{
    Database, EdgarHttpSource, EdgarService, HttpScoringProvider, JwtVerifier, LocalStorage,
    MockScoringProvider, ScoringProvider, Storage,
};

#[derive(Clone)]
pub struct AppState {
    pub config: DealConfig,
    pub db: Database,
    pub jwt: JwtVerifier,
    pub storage: Arc<dyn Storage>,
    pub edgar: Arc<EdgarService>,
    pub scoring: Arc<dyn ScoringProvider>,
}

/// Assemble the full router: public health route, everything else behind
/// the bearer-token layer, ambient middleware outermost.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/organizations", post(handlers::create_organization))
        .route("/organizations/:organization_id", get(handlers::get_organization))
        .route(
            "/organizations/:organization_id/members",
            get(handlers::list_members),
        )
        .route("/spacs", get(handlers::list_spacs).post(handlers::create_spac))
        .route(
            "/spacs/:spac_id",
            get(handlers::get_spac)
                .put(handlers::update_spac)
                .delete(handlers::delete_spac),
        )
        .route("/spacs/:spac_id/score", post(handlers::score_spac))
        .route(
            "/targets",
            get(handlers::list_targets).post(handlers::create_target),
        )
        .route(
            "/targets/:target_id",
            get(handlers::get_target)
                .put(handlers::update_target)
                .delete(handlers::delete_target),
        )
        .route(
            "/documents",
            get(handlers::list_documents).post(handlers::upload_document),
        )
        .route(
            "/documents/:document_id",
            get(handlers::get_document)
                .put(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .route(
            "/documents/:document_id/download",
            get(handlers::download_document),
        )
        .route(
            "/documents/:document_id/analysis",
            post(handlers::analyze_document),
        )
        .route(
            "/contacts",
            get(handlers::list_contacts).post(handlers::create_contact),
        )
        .route(
            "/contacts/:contact_id",
            get(handlers::get_contact)
                .put(handlers::update_contact)
                .delete(handlers::delete_contact),
        )
        .route("/filings", get(handlers::lookup_filings))
        .route("/audit-logs", get(handlers::list_audit_logs))
        .route("/audit-logs/export", get(handlers::export_audit_logs))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected)
        .with_state(state.clone())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(build_cors(&state.config))
}

fn build_cors(config: &DealConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(
            config
                .security
                .allowed_origins
                .iter()
                .filter_map(|origin| {
                    origin
                        .parse::<axum::http::HeaderValue>()
                        .map_err(|e| {
                            tracing::error!("Invalid CORS origin '{}': {}; skipping", origin, e);
                            e
                        })
                        .ok()
                })
                .collect::<Vec<axum::http::HeaderValue>>(),
        )
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Wire the real collaborators and bind the listener. Tests construct
    /// `AppState` with mock providers and call [`build_router`] directly.
    pub async fn build(config: DealConfig) -> Result<Self, AppError> {
        let pool = db::create_pool(&config.database).await?;
        db::run_migrations(&pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        let database = Database::new(pool);

        let jwt = JwtVerifier::from_config(&config.jwt)?;

        let storage: Arc<dyn Storage> =
            Arc::new(LocalStorage::new(&config.storage.local_path).await.map_err(|e| {
                tracing::error!(
                    "Failed to initialize local storage at {}: {}",
                    config.storage.local_path,
                    e
                );
                e
            })?);

        let edgar = Arc::new(EdgarService::new(
            Arc::new(EdgarHttpSource::new(&config.edgar)?),
            Duration::from_secs(config.edgar.cache_ttl_seconds),
            config.edgar.cache_max_entries,
        ));

        let scoring: Arc<dyn ScoringProvider> = match config.ai.provider {
            AiProviderKind::Http => Arc::new(
                HttpScoringProvider::new(&config.ai).map_err(AppError::from)?,
            ),
            AiProviderKind::Mock => Arc::new(MockScoringProvider::new()),
        };

        let state = AppState {
            config: config.clone(),
            db: database,
            jwt,
            storage,
            edgar,
            scoring,
        };

        let router = build_router(state);

        let host: IpAddr = config.common.host.parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid bind host '{}': {}",
                config.common.host,
                e
            ))
        })?;
        let addr = SocketAddr::new(host, config.common.port);
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(address = %addr, port = port, "Listening");

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT/SIGTERM, then drain in-flight requests.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
