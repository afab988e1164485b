use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};

use crate::{
    audit,
    dto::auth::{LoginForm, LoginResponse},
    entity::{Users, users},
    error::{AppError, AppResult},
    middleware::auth::issue_token,
    state::AppState,
};

/// Prefixes of stored secrets that are already the output of some KDF.
const KNOWN_HASH_PREFIXES: &[&str] = &[
    "$argon2", "pbkdf2_", "bcrypt", "$2a$", "$2b$", "$2y$", "sha1$", "md5$", "scrypt$",
];

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn is_known_hash(stored: &str) -> bool {
    KNOWN_HASH_PREFIXES
        .iter()
        .any(|prefix| stored.starts_with(prefix))
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

fn hash_blocking(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_blocking(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Argon2 PHC hash of `password`, computed on the blocking pool.
pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?
}

pub async fn verify_password(password: String, stored: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_blocking(&password, &stored))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

/// What a stored secret allows for a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoredSecret {
    Argon2,
    /// Hash from a KDF this service no longer verifies.
    Foreign,
    /// Not a hash at all: a manually inserted plaintext password.
    Plaintext,
}

fn classify(stored: &str) -> StoredSecret {
    if stored.starts_with("$argon2") {
        StoredSecret::Argon2
    } else if is_known_hash(stored) {
        StoredSecret::Foreign
    } else {
        StoredSecret::Plaintext
    }
}

/// Resolve `identifier` (login or email) and check `password`.
///
/// A plaintext secret equal to the submitted password is re-hashed and
/// persisted when legacy migration is enabled.
pub async fn authenticate(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> AppResult<users::Model> {
    let identifier = identifier.trim();
    if identifier.is_empty() || password.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let user = Users::find()
        .filter(
            Condition::any()
                .add(users::Column::Login.eq(identifier))
                .add(users::Column::Email.eq(identifier.to_lowercase())),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !user.is_active {
        tracing::info!(user_id = user.id, "login refused for inactive user");
        return Err(AppError::Unauthorized);
    }

    match classify(&user.password_hash) {
        StoredSecret::Argon2 => {
            if verify_password(password.to_string(), user.password_hash.clone()).await? {
                Ok(user)
            } else {
                Err(AppError::Unauthorized)
            }
        }
        StoredSecret::Foreign => {
            tracing::warn!(user_id = user.id, "stored password uses an unsupported KDF");
            Err(AppError::Unauthorized)
        }
        StoredSecret::Plaintext => {
            if !state.config.legacy_password_migration || user.password_hash != password {
                return Err(AppError::Unauthorized);
            }
            promote_legacy_password(state, user, password).await
        }
    }
}

async fn promote_legacy_password(
    state: &AppState,
    user: users::Model,
    password: &str,
) -> AppResult<users::Model> {
    let hashed = hash_password(password.to_string()).await?;
    let user_id = user.id;

    let mut active: users::ActiveModel = user.into();
    active.password_hash = Set(hashed);
    let user = active.update(&state.orm).await?;

    tracing::warn!(user_id, "legacy plaintext password promoted to argon2");
    audit::record(
        &state.pool,
        Some(user_id),
        "password_promoted",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(user)
}

/// Authenticate the login form and issue a session token.
pub async fn login(state: &AppState, form: LoginForm) -> AppResult<LoginResponse> {
    let user = authenticate(state, &form.email, &form.password).await?;
    let token = issue_token(&state.config.jwt_secret, &user)?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(LoginResponse {
        token,
        redirect_to: "/panel".to_string(),
    })
}
