use anyhow::{anyhow, Context};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{jwt::JwtKeys, model::User};
use crate::{
    error::{AppError, AppResult},
    store::{InsertUserError, UserStore},
};

const MIN_PASSWORD_LEN: usize = 8;

/// Hashes on the blocking pool.
async fn hash_password(password: &str) -> anyhow::Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow!("hash password: {e}"))
    })
    .await
    .context("password hashing task")?
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is unreadable.
async fn password_matches(password: &str, stored: &str) -> anyhow::Result<bool> {
    let (password, stored) = (password.to_owned(), stored.to_owned());
    tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(&stored).map_err(|e| anyhow!("parse stored hash: {e}"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .context("password verify task")?
}

fn email_conflict() -> AppError {
    AppError::Conflict("Email already exists".into())
}

fn username_conflict() -> AppError {
    AppError::Conflict("Username already exists".into())
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registers a user and returns it with a fresh token.
pub async fn signup<S: UserStore + ?Sized>(
    store: &S,
    keys: &JwtKeys,
    username: &str,
    email: &str,
    password: &str,
) -> AppResult<(User, String)> {
    let username = username.trim();
    let email = normalize_email(email);

    if username.is_empty() {
        return Err(AppError::Validation("Username is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation("Password too short".into()));
    }

    if store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(email_conflict());
    }
    if store.find_user_by_username(username).await?.is_some() {
        warn!(username, "username already taken");
        return Err(username_conflict());
    }

    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email,
        password_hash: hash_password(password).await?,
        created_at: OffsetDateTime::now_utc(),
    };
    // The checks above can lose a race with a concurrent signup.
    store.insert_user(&user).await.map_err(|e| match e {
        InsertUserError::DuplicateEmail => {
            warn!(email = %user.email, "email registered concurrently");
            email_conflict()
        }
        InsertUserError::DuplicateUsername => {
            warn!(username = %user.username, "username taken concurrently");
            username_conflict()
        }
        InsertUserError::Other(e) => AppError::Internal(e),
    })?;
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((user, token))
}

/// Checks credentials and issues a token.
pub async fn login<S: UserStore + ?Sized>(
    store: &S,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> AppResult<(User, String)> {
    let email = normalize_email(email);
    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let Some(user) = store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };
    if !password_matches(password, &user.password_hash).await? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((user, token))
}

/// Loads the user behind a resolved token.
pub async fn current_user<S: UserStore + ?Sized>(store: &S, user_id: Uuid) -> AppResult<User> {
    store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))
}
