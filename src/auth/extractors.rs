//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tracing::{debug, warn};

use super::models::Claims;
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated caller
///
/// Validates the bearer JWT against `JWT_SECRET`. Admin rights come from the
/// `role` claim or from the token email being listed in `ADMIN_EMAILS`.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
    pub is_admin: bool,
}

/// An [`AuthedUser`] with admin rights; anyone else gets 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthedUser);

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?.trim();

    // Handle "Bearer <token>" format or raw token
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let Some(token) = bearer_token(parts) else {
            warn!("Authentication failed: missing Authorization header");
            return Err(ApiError::Unauthorized("missing auth".into()));
        };

        let claims = match decode::<Claims>(
            &token,
            &DecodingKey::from_secret(app_state.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        ) {
            Ok(d) => d.claims,
            Err(e) => {
                warn!(error = %e, "JWT token validation failed");
                return Err(ApiError::Unauthorized("invalid token".into()));
            }
        };

        let email = claims.email.clone().unwrap_or_default();
        let is_admin = claims.has_admin_role()
            || (!email.is_empty() && app_state.config.admin_emails.contains(&email.to_lowercase()));

        debug!(
            user_id = %claims.sub,
            email = %safe_email_log(&email),
            is_admin = is_admin,
            "User authentication successful via extractor"
        );

        Ok(AuthedUser {
            id: claims.sub,
            email,
            is_admin,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthedUser::from_request_parts(parts, state).await?;

        if !user.is_admin {
            warn!(user_id = %user.id, "Admin access denied");
            return Err(ApiError::Forbidden("admin access required".into()));
        }

        Ok(AdminUser(user))
    }
}
