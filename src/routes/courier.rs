use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};

use crate::{
    domain::lifecycle::JobAction,
    dto::dispatch::{CourierJobs, DispatchedJob, PaymentMethodRequest},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_courier},
    response::ApiResponse,
    services::{
        Caller,
        dispatch_service::{self, JobKind},
        user_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(my_jobs))
        .route("/installations/{id}/payment-method", put(installation_payment_method))
        .route("/installations/{id}/{action}", post(installation_action))
        .route("/pickups/{id}/{action}", post(pickup_action))
}

/// Resolve the courier profile behind the signed-in user.
async fn courier_id(state: &AppState, user: &AuthUser) -> AppResult<i32> {
    ensure_courier(user)?;
    Ok(user_service::courier_for_user(state, user.user_id).await?.id)
}

#[utoipa::path(
    get,
    path = "/api/courier/jobs",
    responses(
        (status = 200, description = "Open jobs assigned to the signed-in courier", body = ApiResponse<CourierJobs>),
        (status = 403, description = "Not a courier")
    ),
    security(("bearer_auth" = [])),
    tag = "Courier"
)]
pub async fn my_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CourierJobs>>> {
    let courier_id = courier_id(&state, &user).await?;
    let jobs = dispatch_service::list_jobs_for_courier(&state, courier_id).await?;
    Ok(Json(ApiResponse::ok("My jobs", jobs)))
}

async fn act(
    state: AppState,
    user: AuthUser,
    kind: JobKind,
    id: i32,
    action: JobAction,
) -> AppResult<Json<ApiResponse<DispatchedJob>>> {
    let courier_id = courier_id(&state, &user).await?;
    let job = dispatch_service::apply(&state, Caller::from(&user), kind, id, action, Some(courier_id))
        .await?;
    Ok(Json(ApiResponse::ok("Job updated", job)))
}

#[utoipa::path(
    post,
    path = "/api/courier/installations/{id}/{action}",
    params(
        ("id" = i32, Path, description = "Installation ID"),
        ("action" = String, Path, description = "start, finish or cancel")
    ),
    responses(
        (status = 200, description = "Installation updated", body = ApiResponse<DispatchedJob>),
        (status = 403, description = "Job is assigned to someone else"),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearer_auth" = [])),
    tag = "Courier"
)]
pub async fn installation_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, action)): Path<(i32, JobAction)>,
) -> AppResult<Json<ApiResponse<DispatchedJob>>> {
    act(state, user, JobKind::Installation, id, action).await
}

#[utoipa::path(
    post,
    path = "/api/courier/pickups/{id}/{action}",
    params(
        ("id" = i32, Path, description = "Pickup ID"),
        ("action" = String, Path, description = "start, finish or cancel")
    ),
    responses(
        (status = 200, description = "Pickup updated", body = ApiResponse<DispatchedJob>),
        (status = 403, description = "Job is assigned to someone else"),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearer_auth" = [])),
    tag = "Courier"
)]
pub async fn pickup_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, action)): Path<(i32, JobAction)>,
) -> AppResult<Json<ApiResponse<DispatchedJob>>> {
    act(state, user, JobKind::Pickup, id, action).await
}

#[utoipa::path(
    put,
    path = "/api/courier/installations/{id}/payment-method",
    params(("id" = i32, Path, description = "Installation ID")),
    request_body = PaymentMethodRequest,
    responses(
        (status = 200, description = "Payment method noted", body = ApiResponse<DispatchedJob>),
        (status = 403, description = "Job is assigned to someone else")
    ),
    security(("bearer_auth" = [])),
    tag = "Courier"
)]
pub async fn installation_payment_method(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<PaymentMethodRequest>,
) -> AppResult<Json<ApiResponse<DispatchedJob>>> {
    let courier_id = courier_id(&state, &user).await?;
    let job = dispatch_service::set_installation_payment_method(
        &state,
        Caller::from(&user),
        id,
        payload.payment_method,
        Some(courier_id),
    )
    .await?;
    Ok(Json(ApiResponse::ok("Payment method updated", job)))
}
