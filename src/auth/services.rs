use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};

use crate::{
    auth::{
        dto::{AccountProfile, LoginRequest, PublicUser, SignupRequest},
        jwt::JwtKeys,
        password::{hash_password, hash_password_blocking, verify_password_blocking},
        repo::{AccountStore, StoreError},
        repo_types::NewAccount,
    },
    error::AppError,
};

/// Outcome of a successful signup or login.
#[derive(Debug)]
pub struct Session {
    pub user: PublicUser,
    pub token: String,
}

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid");
    // Verified against when the email is unknown so both login failures cost
    // one Argon2 verification.
    static ref DUMMY_HASH: Option<String> = hash_password("moodcam-dummy-password").ok();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required(value: Option<String>) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(AppError::missing_fields)
}

/// Passwords are taken verbatim; only an empty one is missing.
fn required_password(value: Option<String>) -> Result<String, AppError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(AppError::missing_fields)
}

pub async fn signup(
    store: &dyn AccountStore,
    keys: &JwtKeys,
    payload: SignupRequest,
) -> Result<Session, AppError> {
    let name = required(payload.name)?.trim().to_string();
    let email = normalize_email(&required(payload.email)?);
    let password = required_password(payload.password)?;

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    if store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password_blocking(password).await?;
    let account = match store
        .create(NewAccount {
            name: &name,
            email: &email,
            password_hash: &hash,
        })
        .await
    {
        Ok(a) => a,
        Err(StoreError::DuplicateEmail) => {
            warn!(email = %email, "email registered concurrently");
            return Err(AppError::Conflict("Email already registered".into()));
        }
        Err(StoreError::Backend(e)) => {
            error!(error = %e, "create account failed");
            return Err(AppError::Internal(e));
        }
    };

    let token = keys.sign(account.id, &account.email)?;
    info!(account_id = %account.id, email = %account.email, "account created");
    Ok(Session {
        user: PublicUser::from(&account),
        token,
    })
}

pub async fn login(
    store: &dyn AccountStore,
    keys: &JwtKeys,
    payload: LoginRequest,
) -> Result<Session, AppError> {
    let email = normalize_email(&required(payload.email)?);
    let password = required_password(payload.password)?;

    let account = match store.find_by_email(&email).await? {
        Some(a) => a,
        None => {
            if let Some(dummy) = DUMMY_HASH.clone() {
                let _ = verify_password_blocking(password, dummy).await;
            }
            warn!(email = %email, "login unknown email");
            return Err(AppError::invalid_credentials());
        }
    };

    if !verify_password_blocking(password, account.password_hash.clone()).await? {
        warn!(email = %email, account_id = %account.id, "login invalid password");
        return Err(AppError::invalid_credentials());
    }

    let token = keys.sign(account.id, &account.email)?;
    info!(account_id = %account.id, email = %account.email, "account logged in");
    Ok(Session {
        user: PublicUser::from(&account),
        token,
    })
}

/// Resolves the caller behind a session token.
pub async fn who_am_i(
    store: &dyn AccountStore,
    keys: &JwtKeys,
    token: Option<&str>,
) -> Result<AccountProfile, AppError> {
    let token = token.ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::Unauthorized("Invalid token".into())
    })?;

    match store.find_by_id(claims.sub).await? {
        Some(account) => Ok(AccountProfile::from(account)),
        None => {
            warn!(account_id = %claims.sub, "token for missing account");
            Err(AppError::NotFound("User not found".into()))
        }
    }
}
