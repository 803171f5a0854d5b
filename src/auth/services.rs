use axum::extract::FromRef;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest},
        jwt::{new_verification_token, JwtKeys},
        password::{hash_password, is_valid_email, is_valid_password, verify_password},
        store::{InsertUserError, NewUser, Role},
    },
    error::AuthError,
    state::AppState,
};

/// Create an account in the unverified state and dispatch the verification
/// email. The store's unique constraint, not the advisory pre-check, decides
/// duplicates.
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<PublicUser, AuthError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AuthError::Validation(
            "Name, email, and password are required".into(),
        ));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AuthError::Validation(
            "Please enter a valid email address".into(),
        ));
    }
    if !is_valid_password(&req.password) {
        warn!("password fails policy");
        return Err(AuthError::Validation(
            "Password must be at least 6 characters with letters and numbers".into(),
        ));
    }
    let role = match req.role.as_deref() {
        None => Role::Jobseeker,
        Some(r) => Role::parse(r.trim()).ok_or_else(|| {
            warn!(role = %r, "unknown role");
            AuthError::Validation("Role must be either jobseeker or admin".into())
        })?,
    };

    // Advisory only; concurrent registrations are settled by the insert below.
    if state.users.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AuthError::DuplicateAccount);
    }

    let password_hash = hash_password(&req.password)?;
    let verification_token = new_verification_token();

    let user = match state
        .users
        .insert(NewUser {
            full_name: name,
            email,
            password_hash,
            user_type: role,
            verification_token: verification_token.clone(),
        })
        .await
    {
        Ok(user) => user,
        Err(InsertUserError::DuplicateEmail) => {
            warn!("email already registered (store constraint)");
            return Err(AuthError::DuplicateAccount);
        }
        Err(InsertUserError::Other(e)) => return Err(AuthError::Internal(e)),
    };

    // Best-effort: a mail outage never rolls back the registration.
    if let Err(e) = state
        .mailer
        .send_verification_email(&user.email, &verification_token, &user.full_name)
        .await
    {
        warn!(error = %e, user_id = %user.id, "verification email dispatch failed");
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(PublicUser::from(&user))
}

/// Consume a verification token. Verifying an already-verified account is
/// success, not an error; the token itself is single-use.
pub async fn verify_email(state: &AppState, token: &str) -> Result<PublicUser, AuthError> {
    let Some(user) = state.users.find_by_verification_token(token).await? else {
        warn!("verification token not found");
        return Err(AuthError::InvalidToken);
    };

    if user.email_verified {
        info!(user_id = %user.id, "email already verified");
        return Ok(PublicUser::from(&user));
    }

    match state.users.mark_email_verified(user.id, token).await? {
        Some(updated) => {
            // Post-commit notification; failure is logged, never reverses the
            // verification.
            if let Err(e) = state
                .mailer
                .send_welcome_email(&updated.email, &updated.full_name)
                .await
            {
                warn!(error = %e, user_id = %updated.id, "welcome email dispatch failed");
            }
            info!(user_id = %updated.id, "email verified");
            Ok(PublicUser::from(&updated))
        }
        None => {
            // Lost the conditional update to a concurrent presentation of the
            // same token. If the account ended up verified, that is success.
            match state.users.find_by_id(user.id).await? {
                Some(current) if current.email_verified => {
                    info!(user_id = %current.id, "email verified concurrently");
                    Ok(PublicUser::from(&current))
                }
                _ => Err(AuthError::InvalidToken),
            }
        }
    }
}

/// Authenticate by email and password, returning a signed session token.
/// Unknown email and wrong password are deliberately indistinguishable; the
/// verification gate precedes the password comparison.
pub async fn login(state: &AppState, req: LoginRequest) -> Result<(String, PublicUser), AuthError> {
    let email = req.email.trim().to_lowercase();

    if email.is_empty() || req.password.is_empty() {
        return Err(AuthError::Validation(
            "Email and password are required".into(),
        ));
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !user.email_verified {
        warn!(user_id = %user.id, "login before email verification");
        return Err(AuthError::EmailNotVerified);
    }

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(state);
    let token = keys.sign_session(user.id, user.user_type)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((token, PublicUser::from(&user)))
}
