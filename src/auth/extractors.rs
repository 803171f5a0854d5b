use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::{
    auth::{
        jwt::JwtKeys,
        store::{Role, User},
    },
    error::AuthError,
    state::AppState,
};

/// Authenticated identity for protected routes: validates the bearer session
/// token, then re-loads the account so downstream logic sees current state,
/// not stale claims.
#[derive(Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AuthError::MissingToken)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_session(token).map_err(|_| {
            warn!("invalid or expired session token");
            AuthError::InvalidOrExpired
        })?;

        // Only the id is trusted from the claims; the record is the identity.
        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "session for deleted account");
                AuthError::AccountNotFound
            })?;

        Ok(CurrentUser(user))
    }
}

/// Gate on top of `CurrentUser`: the identity must be an administrator.
#[derive(Debug)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.user_type != Role::Admin {
            warn!(user_id = %user.id, "admin gate rejected");
            return Err(AuthError::AdminRequired);
        }
        Ok(AdminUser(user))
    }
}

/// Gate on top of `CurrentUser`: the identity's email must be verified.
#[derive(Debug)]
pub struct VerifiedUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for VerifiedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.email_verified {
            warn!(user_id = %user.id, "verification gate rejected");
            return Err(AuthError::VerificationRequired);
        }
        Ok(VerifiedUser(user))
    }
}
