use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Access tier, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Jobseeker,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "jobseeker" => Some(Role::Jobseeker),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Jobseeker => "jobseeker",
            Role::Admin => "admin",
        }
    }
}

/// User record as persisted. The hash and verification token never serialize.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub user_type: Role,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields the caller supplies at registration; everything else is
/// store-assigned.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: Role,
    pub verification_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InsertUserError {
    /// The store's unique constraint on email fired. This, not any advisory
    /// pre-check, is what decides duplicates under concurrent registrations.
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistence contract for user records. Single-record operations only; the
/// store's own constraints carry the consistency guarantees.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_verification_token(&self, token: &str) -> anyhow::Result<Option<User>>;
    async fn insert(&self, new: NewUser) -> Result<User, InsertUserError>;
    /// Conditional update: flips `email_verified` and clears the token only
    /// while the token still matches an unverified account. `None` means the
    /// condition no longer held (already verified, token gone, or no such id).
    async fn mark_email_verified(&self, id: Uuid, token: &str) -> anyhow::Result<Option<User>>;
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;
}

const USER_COLUMNS: &str = "id, full_name, email, password_hash, user_type, \
     email_verified, verification_token, created_at, updated_at";

/// Postgres-backed store.
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_verification_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE verification_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, new: NewUser) -> Result<User, InsertUserError> {
        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (full_name, email, password_hash, user_type, verification_token)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.user_type)
        .bind(&new.verification_token)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                Err(InsertUserError::DuplicateEmail)
            }
            Err(e) => Err(InsertUserError::Other(e.into())),
        }
    }

    async fn mark_email_verified(&self, id: Uuid, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET email_verified = TRUE, verification_token = NULL, updated_at = now()
             WHERE id = $1 AND verification_token = $2 AND email_verified = FALSE
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }
}

/// In-memory store backing `AppState::fake()`. Mirrors the Postgres store's
/// constraints, including the unique email and the conditional verify update.
#[derive(Default)]
pub struct MemoryUserStore {
    users: std::sync::Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn find_by_verification_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn insert(&self, new: NewUser) -> Result<User, InsertUserError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new.email) {
            return Err(InsertUserError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            email: new.email,
            password_hash: new.password_hash,
            user_type: new.user_type,
            email_verified: false,
            verification_token: Some(new.verification_token),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn mark_email_verified(&self, id: Uuid, token: &str) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| {
            u.id == id && u.verification_token.as_deref() == Some(token) && !u.email_verified
        }) else {
            return Ok(None);
        };
        user.email_verified = true;
        user.verification_token = None;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.users.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            full_name: "Test User".into(),
            email: email.into(),
            password_hash: "$argon2id$fake".into(),
            user_type: Role::Jobseeker,
            verification_token: "deadbeefdeadbeefdeadbeefdeadbeef".into(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_starts_unverified() {
        let store = MemoryUserStore::default();
        let user = store.insert(new_user("ana@x.com")).await.unwrap();
        assert!(!user.email_verified);
        assert!(user.verification_token.is_some());
        assert_eq!(user.user_type, Role::Jobseeker);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_by_the_store() {
        let store = MemoryUserStore::default();
        store.insert(new_user("ana@x.com")).await.unwrap();
        let err = store.insert(new_user("ana@x.com")).await.unwrap_err();
        assert!(matches!(err, InsertUserError::DuplicateEmail));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mark_email_verified_is_conditional() {
        let store = MemoryUserStore::default();
        let user = store.insert(new_user("ana@x.com")).await.unwrap();
        let token = user.verification_token.clone().unwrap();

        let updated = store
            .mark_email_verified(user.id, &token)
            .await
            .unwrap()
            .expect("first update should match");
        assert!(updated.email_verified);
        assert!(updated.verification_token.is_none());

        // Second clear is a no-op: condition no longer holds.
        let second = store.mark_email_verified(user.id, &token).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn mark_email_verified_requires_matching_token() {
        let store = MemoryUserStore::default();
        let user = store.insert(new_user("ana@x.com")).await.unwrap();
        let missed = store
            .mark_email_verified(user.id, "some-other-token")
            .await
            .unwrap();
        assert!(missed.is_none());
        let reloaded = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(!reloaded.email_verified);
    }

    #[test]
    fn user_serialization_never_exposes_secrets() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            full_name: "Ana".into(),
            email: "ana@x.com".into(),
            password_hash: "$argon2id$secret-material".into(),
            user_type: Role::Jobseeker,
            email_verified: false,
            verification_token: Some("deadbeef".into()),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-material"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("deadbeef"));
    }

    #[test]
    fn role_parsing() {
        assert_eq!(Role::parse("jobseeker"), Some(Role::Jobseeker));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse(""), None);
        assert_eq!(Role::Admin.as_str(), "admin");
    }
}
