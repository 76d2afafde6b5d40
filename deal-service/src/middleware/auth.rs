//! Bearer-token authentication middleware.
//!
//! Tokens come from the external identity provider; this layer only
//! establishes WHO is calling. Tenant authorization happens per request in
//! the access guard, after the target organization is known.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::services::AccessClaims;
use crate::startup::AppState;

/// Middleware to require a valid access token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("missing or malformed Authorization header"))
        })?;

    let claims = state.jwt.validate(token)?;

    // Store claims in request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor to easily get the authenticated principal in handlers.
pub struct AuthUser(pub AccessClaims);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.sub
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<AccessClaims>()
            .cloned()
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "authentication claims missing from request extensions"
                ))
            })?;

        Ok(AuthUser(claims))
    }
}
