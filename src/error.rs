use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::error;

/// Every failure leaving the identity core is one of these kinds; internal
/// detail (store errors, hashing faults) never crosses the boundary.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("User with this email already exists")]
    DuplicateAccount,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Please verify your email before logging in")]
    EmailNotVerified,
    #[error("Invalid or expired verification token")]
    InvalidToken,
    #[error("Access token required")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidOrExpired,
    #[error("User not found")]
    AccountNotFound,
    #[error("Admin access required")]
    AdminRequired,
    #[error("Email verification required. Please check your email.")]
    VerificationRequired,
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::DuplicateAccount | AuthError::InvalidToken => {
                StatusCode::BAD_REQUEST
            }
            AuthError::InvalidCredentials
            | AuthError::EmailNotVerified
            | AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidOrExpired
            | AuthError::AccountNotFound
            | AuthError::AdminRequired
            | AuthError::VerificationRequired => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        if let AuthError::Internal(e) = &self {
            error!(error = %e, "internal error");
        }
        let body = json!({
            "success": false,
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
