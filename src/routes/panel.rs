use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};

use crate::{
    dto::pages::{AdminDashboard, CourierPanel},
    error::AppResult,
    middleware::auth::{LOGIN_PAGE, MaybeAuthUser, panel_target},
    response::ApiResponse,
    services::panel_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/panel", get(panel))
        .route("/admin-panel", get(admin_panel))
        .route("/courier-panel", get(courier_panel))
}

#[utoipa::path(
    get,
    path = "/panel",
    responses(
        (status = 303, description = "Sent to the panel matching the signed-in role, or to /login")
    ),
    tag = "Panels"
)]
pub async fn panel(MaybeAuthUser(user): MaybeAuthUser) -> Redirect {
    Redirect::to(panel_target(user.as_ref()))
}

#[utoipa::path(
    get,
    path = "/admin-panel",
    responses(
        (status = 200, description = "Staff dashboard", body = ApiResponse<AdminDashboard>),
        (status = 303, description = "Not signed in as staff, sent to /login")
    ),
    tag = "Panels"
)]
pub async fn admin_panel(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
) -> AppResult<Response> {
    if !user.is_some_and(|u| u.is_admin()) {
        return Ok(Redirect::to(LOGIN_PAGE).into_response());
    }
    let dashboard = panel_service::admin_dashboard(&state).await?;
    Ok(Json(ApiResponse::ok("Admin panel", dashboard)).into_response())
}

#[utoipa::path(
    get,
    path = "/courier-panel",
    responses(
        (status = 200, description = "Courier's open jobs", body = ApiResponse<CourierPanel>),
        (status = 303, description = "Not signed in as a courier, sent to /login")
    ),
    tag = "Panels"
)]
pub async fn courier_panel(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
) -> AppResult<Response> {
    let Some(user) = user.filter(|u| u.is_courier()) else {
        return Ok(Redirect::to(LOGIN_PAGE).into_response());
    };
    let panel = panel_service::courier_panel(&state, user.user_id).await?;
    Ok(Json(ApiResponse::ok("Courier panel", panel)).into_response())
}
