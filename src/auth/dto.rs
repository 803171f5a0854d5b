use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::store::{Role, User};

/// Request body for user registration. Fields default to empty so presence
/// checks produce the documented validation messages instead of a
/// deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Query parameters for the email-verification endpoint.
#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

/// Public projection of a user. A separate narrow struct so the password hash
/// and verification token cannot leak by omission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub user_type: Role,
    pub email_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.full_name.clone(),
            email: user.email.clone(),
            user_type: user.user_type,
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_uses_wire_field_names() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            full_name: "Ana".into(),
            email: "ana@x.com".into(),
            password_hash: "$argon2id$secret".into(),
            user_type: Role::Jobseeker,
            email_verified: false,
            verification_token: Some("deadbeef".into()),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();
        assert_eq!(json["name"], "Ana");
        assert_eq!(json["email"], "ana@x.com");
        assert_eq!(json["userType"], "jobseeker");
        assert_eq!(json["emailVerified"], false);
        assert!(json.get("createdAt").is_some());
        // The projection has no secret fields at all.
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("verificationToken").is_none());
        assert!(!json.to_string().contains("secret"));
        assert!(!json.to_string().contains("deadbeef"));
    }

    #[test]
    fn register_request_tolerates_missing_fields() {
        let req: RegisterRequest = serde_json::from_str("{}").unwrap();
        assert!(req.name.is_empty());
        assert!(req.email.is_empty());
        assert!(req.password.is_empty());
        assert!(req.role.is_none());
    }
}
