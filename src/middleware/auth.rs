use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::EntityTrait;

use crate::{
    dto::auth::Claims,
    entity::{Users, enums::Role, users},
    error::{AppError, AppResult},
    state::AppState,
};

/// Cookie carrying the session token for the HTML surface.
pub const SESSION_COOKIE: &str = "access_token";

pub const ADMIN_PANEL: &str = "/admin-panel";
pub const COURIER_PANEL: &str = "/courier-panel";
pub const LOGIN_PAGE: &str = "/login";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub role: Role,
    pub superuser: bool,
}

impl AuthUser {
    /// Superusers get the admin surface whatever their role tag says.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.superuser
    }

    pub fn is_courier(&self) -> bool {
        self.role == Role::Courier
    }
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_courier(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_courier() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Where `/panel` sends a principal.
pub fn panel_target(principal: Option<&AuthUser>) -> &'static str {
    match principal {
        Some(user) if user.is_admin() => ADMIN_PANEL,
        Some(user) if user.is_courier() => COURIER_PANEL,
        _ => LOGIN_PAGE,
    }
}

pub fn issue_token(secret: &str, user: &users::Model) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.as_str().to_string(),
        superuser: user.is_superuser,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn decode_token(secret: &str, token: &str) -> AppResult<AuthUser> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id = decoded
        .claims
        .sub
        .parse::<i32>()
        .map_err(|_| AppError::Unauthorized)?;
    let role = decoded
        .claims
        .role
        .parse::<Role>()
        .map_err(|_| AppError::Unauthorized)?;

    Ok(AuthUser {
        user_id,
        role,
        superuser: decoded.claims.superuser,
    })
}

/// Bearer header first, then the session cookie.
fn token_from_parts(parts: &Parts) -> AppResult<Option<String>> {
    if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
        let auth_str = value
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;
        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::BadRequest("Invalid Authorization scheme".into()))?;
        return Ok(Some(token.trim().to_string()));
    }

    let jar = CookieJar::from_headers(&parts.headers);
    Ok(jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string()))
}

/// Check a decoded token against the current user row.
///
/// A missing or deactivated user, or one whose role or superuser flag changed
/// since the token was issued, no longer has a session.
pub fn confirm_principal(claims: AuthUser, user: Option<&users::Model>) -> AppResult<AuthUser> {
    let user = user.ok_or(AppError::Unauthorized)?;
    if !user.is_active || user.role != claims.role || user.is_superuser != claims.superuser {
        tracing::info!(user_id = claims.user_id, "stale session token refused");
        return Err(AppError::Unauthorized);
    }
    Ok(claims)
}

async fn resolve_principal(state: &AppState, token: &str) -> AppResult<AuthUser> {
    let claims = decode_token(&state.config.jwt_secret, token)?;
    let user = Users::find_by_id(claims.user_id).one(&state.orm).await?;
    confirm_principal(claims, user.as_ref())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)?.ok_or(AppError::Unauthorized)?;
        resolve_principal(state, &token).await
    }
}

/// Principal for the HTML surface, where a bad or missing token means "anonymous".
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(Some(token)) = token_from_parts(parts) else {
            return Ok(MaybeAuthUser(None));
        };
        match resolve_principal(state, &token).await {
            Ok(principal) => Ok(MaybeAuthUser(Some(principal))),
            Err(AppError::Unauthorized) => Ok(MaybeAuthUser(None)),
            Err(err) => {
                tracing::warn!(error = %err, "could not resolve session; treating as anonymous");
                Ok(MaybeAuthUser(None))
            }
        }
    }
}
