use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    dto::auth::{LoginForm, LoginPage, LoginResponse},
    error::{AppError, AppResult},
    middleware::auth::{LOGIN_PAGE, MaybeAuthUser, SESSION_COOKIE, panel_target},
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout).post(logout))
}

/// Token login for API clients, mounted under `/api/auth`.
pub fn api_router() -> Router<AppState> {
    Router::new().route("/login", post(api_login))
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login page", body = ApiResponse<LoginPage>),
        (status = 303, description = "Already signed in with a panel role, sent to /panel")
    ),
    tag = "Auth"
)]
pub async fn login_page(MaybeAuthUser(user): MaybeAuthUser) -> Response {
    // Principals without a panel stay here; `/panel` would send them straight back.
    if panel_target(user.as_ref()) != LOGIN_PAGE {
        return Redirect::to("/panel").into_response();
    }
    Json(ApiResponse::ok("Login", LoginPage { error: None })).into_response()
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in; session cookie set, sent to /panel"),
        (status = 401, description = "Bad credentials", body = ApiResponse<LoginPage>)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    match auth_service::login(&state, form).await {
        Ok(session) => {
            let cookie = session_cookie(session.token, state.config.environment.is_production());
            Ok((jar.add(cookie), Redirect::to(&session.redirect_to)).into_response())
        }
        Err(AppError::Unauthorized) => {
            let page = LoginPage {
                error: Some("Invalid credentials".to_string()),
            };
            Ok((
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::ok("Login failed", page)),
            )
                .into_response())
        }
        Err(err) => Err(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginForm,
    responses(
        (status = 200, description = "Bearer token", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Bad credentials")
    ),
    tag = "Auth"
)]
pub async fn api_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginForm>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let session = auth_service::login(&state, payload).await?;
    Ok(Json(ApiResponse::ok("Login success", session)))
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 303, description = "Session cookie cleared, sent to /login")
    ),
    tag = "Auth"
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to(LOGIN_PAGE))
}
