//! Staff endpoints for reservations, their payments and their dispatch jobs.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};

use crate::{
    domain::lifecycle::{JobAction, ReservationAction},
    dto::{
        dispatch::{AssignCourierRequest, CourierJobs, DispatchedJob, PaymentMethodRequest},
        payments::{Balance, PaymentList, RecordPaymentRequest},
        reservations::{AddLineRequest, CreateReservationRequest, ReservationList},
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::{Payment, Reservation, ReservationDetail},
    response::{ApiResponse, Meta},
    routes::params::ReservationListQuery,
    services::{
        Caller,
        dispatch_service::{self, JobKind},
        payment_service, reservation_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reservations", get(list_reservations).post(create_reservation))
        .route("/reservations/{id}", get(get_reservation).delete(delete_reservation))
        .route("/reservations/{id}/lines", post(add_line))
        .route("/reservations/{id}/lines/{game_id}", delete(remove_line))
        .route("/reservations/{id}/payments", get(list_payments).post(record_payment))
        .route("/reservations/{id}/balance", get(balance))
        .route("/reservations/{id}/{action}", post(transition_reservation))
        .route("/payments/{id}/refund", post(refund_payment))
        .route("/payments/{id}/mark-paid", post(mark_payment_paid))
        .route("/jobs", get(open_jobs))
        .route("/installations/{id}/assign", post(assign_installation))
        .route("/installations/{id}/payment-method", put(installation_payment_method))
        .route("/installations/{id}/{action}", post(installation_action))
        .route("/pickups/{id}/assign", post(assign_pickup))
        .route("/pickups/{id}/{action}", post(pickup_action))
}

#[utoipa::path(
    get,
    path = "/api/admin/reservations",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "pending, confirmed, completed, cancelled"),
        ("customer_id" = Option<i32>, Query, description = "Filter by customer"),
        ("from" = Option<String>, Query, description = "Earliest event date"),
        ("to" = Option<String>, Query, description = "Latest event date"),
        ("sort_order" = Option<String>, Query, description = "Event date order: asc, desc")
    ),
    responses(
        (status = 200, description = "Reservations", body = ApiResponse<ReservationList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Reservations"
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReservationListQuery>,
) -> AppResult<Json<ApiResponse<ReservationList>>> {
    ensure_admin(&user)?;
    let (items, meta) = reservation_service::list_reservations(&state, &query).await?;
    Ok(Json(ApiResponse::success("Reservations", ReservationList { items }, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/admin/reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation with its lines and scheduled jobs", body = ApiResponse<ReservationDetail>),
        (status = 404, description = "Customer or game not found"),
        (status = 422, description = "Invalid reservation")
    ),
    security(("bearer_auth" = [])),
    tag = "Reservations"
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ReservationDetail>>)> {
    ensure_admin(&user)?;
    let detail = reservation_service::create_reservation(&state, Caller::from(&user), payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Reservation created", detail))))
}

#[utoipa::path(
    get,
    path = "/api/admin/reservations/{id}",
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation detail", body = ApiResponse<ReservationDetail>),
        (status = 404, description = "Reservation not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reservations"
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<ReservationDetail>>> {
    ensure_admin(&user)?;
    let detail = reservation_service::get_reservation(&state, id).await?;
    Ok(Json(ApiResponse::ok("Reservation", detail)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/reservations/{id}",
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation and everything it owns deleted"),
        (status = 404, description = "Reservation not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reservations"
)]
pub async fn delete_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    ensure_admin(&user)?;
    reservation_service::delete_reservation(&state, Caller::from(&user), id).await?;
    Ok(Json(ApiResponse::ok("Reservation deleted", serde_json::json!({ "id": id }))))
}

#[utoipa::path(
    post,
    path = "/api/admin/reservations/{id}/{action}",
    params(
        ("id" = i32, Path, description = "Reservation ID"),
        ("action" = String, Path, description = "confirm, complete or cancel")
    ),
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<Reservation>),
        (status = 409, description = "Transition not allowed from the current status")
    ),
    security(("bearer_auth" = [])),
    tag = "Reservations"
)]
pub async fn transition_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, action)): Path<(i32, ReservationAction)>,
) -> AppResult<Json<ApiResponse<Reservation>>> {
    ensure_admin(&user)?;
    let reservation = reservation_service::transition(&state, Caller::from(&user), id, action).await?;
    Ok(Json(ApiResponse::ok("Reservation updated", reservation)))
}

#[utoipa::path(
    post,
    path = "/api/admin/reservations/{id}/lines",
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = AddLineRequest,
    responses(
        (status = 200, description = "Line added and total recomputed", body = ApiResponse<ReservationDetail>),
        (status = 409, description = "Game already on the reservation, or reservation closed")
    ),
    security(("bearer_auth" = [])),
    tag = "Reservations"
)]
pub async fn add_line(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<AddLineRequest>,
) -> AppResult<Json<ApiResponse<ReservationDetail>>> {
    ensure_admin(&user)?;
    let detail = reservation_service::add_line(&state, Caller::from(&user), id, payload).await?;
    Ok(Json(ApiResponse::ok("Line added", detail)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/reservations/{id}/lines/{game_id}",
    params(
        ("id" = i32, Path, description = "Reservation ID"),
        ("game_id" = i32, Path, description = "Game on the line")
    ),
    responses(
        (status = 200, description = "Line removed and total recomputed", body = ApiResponse<ReservationDetail>),
        (status = 422, description = "The last line cannot be removed")
    ),
    security(("bearer_auth" = [])),
    tag = "Reservations"
)]
pub async fn remove_line(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, game_id)): Path<(i32, i32)>,
) -> AppResult<Json<ApiResponse<ReservationDetail>>> {
    ensure_admin(&user)?;
    let detail = reservation_service::remove_line(&state, Caller::from(&user), id, game_id).await?;
    Ok(Json(ApiResponse::ok("Line removed", detail)))
}

#[utoipa::path(
    get,
    path = "/api/admin/reservations/{id}/payments",
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Payments in creation order", body = ApiResponse<PaymentList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<PaymentList>>> {
    ensure_admin(&user)?;
    let items = payment_service::list_payments(&state, id).await?;
    let meta = Meta::unpaged(items.len());
    Ok(Json(ApiResponse::success("Payments", PaymentList { items }, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/admin/reservations/{id}/payments",
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = ApiResponse<Payment>),
        (status = 422, description = "Amount must be positive")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<RecordPaymentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Payment>>)> {
    ensure_admin(&user)?;
    let payment = payment_service::record_payment(&state, Caller::from(&user), id, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Payment recorded", payment))))
}

#[utoipa::path(
    get,
    path = "/api/admin/reservations/{id}/balance",
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Total, paid and outstanding", body = ApiResponse<Balance>)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn balance(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Balance>>> {
    ensure_admin(&user)?;
    let balance = payment_service::balance(&state, id).await?;
    Ok(Json(ApiResponse::ok("Balance", balance)))
}

#[utoipa::path(
    post,
    path = "/api/admin/payments/{id}/refund",
    params(("id" = i32, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment refunded", body = ApiResponse<Payment>),
        (status = 409, description = "Only paid payments can be refunded")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn refund_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    ensure_admin(&user)?;
    let payment = payment_service::refund(&state, Caller::from(&user), id).await?;
    Ok(Json(ApiResponse::ok("Payment refunded", payment)))
}

#[utoipa::path(
    post,
    path = "/api/admin/payments/{id}/mark-paid",
    params(("id" = i32, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment settled", body = ApiResponse<Payment>),
        (status = 409, description = "Payment is not pending or overdue")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn mark_payment_paid(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    ensure_admin(&user)?;
    let payment = payment_service::mark_paid(&state, Caller::from(&user), id).await?;
    Ok(Json(ApiResponse::ok("Payment marked paid", payment)))
}

#[utoipa::path(
    get,
    path = "/api/admin/jobs",
    responses(
        (status = 200, description = "Every open installation and pickup", body = ApiResponse<CourierJobs>)
    ),
    security(("bearer_auth" = [])),
    tag = "Dispatch"
)]
pub async fn open_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CourierJobs>>> {
    ensure_admin(&user)?;
    let jobs = dispatch_service::list_open_jobs(&state).await?;
    Ok(Json(ApiResponse::ok("Open jobs", jobs)))
}

async fn assign_job(
    state: AppState,
    user: AuthUser,
    kind: JobKind,
    id: i32,
    payload: AssignCourierRequest,
) -> AppResult<Json<ApiResponse<DispatchedJob>>> {
    ensure_admin(&user)?;
    let job = dispatch_service::assign(&state, Caller::from(&user), kind, id, payload.courier_id).await?;
    Ok(Json(ApiResponse::ok("Courier assigned", job)))
}

async fn apply_job_action(
    state: AppState,
    user: AuthUser,
    kind: JobKind,
    id: i32,
    action: JobAction,
) -> AppResult<Json<ApiResponse<DispatchedJob>>> {
    ensure_admin(&user)?;
    let job = dispatch_service::apply(&state, Caller::from(&user), kind, id, action, None).await?;
    Ok(Json(ApiResponse::ok("Job updated", job)))
}

#[utoipa::path(
    post,
    path = "/api/admin/installations/{id}/assign",
    params(("id" = i32, Path, description = "Installation ID")),
    request_body = AssignCourierRequest,
    responses(
        (status = 200, description = "Courier assigned", body = ApiResponse<DispatchedJob>),
        (status = 409, description = "Job already finished or cancelled"),
        (status = 422, description = "Courier cannot take jobs")
    ),
    security(("bearer_auth" = [])),
    tag = "Dispatch"
)]
pub async fn assign_installation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<AssignCourierRequest>,
) -> AppResult<Json<ApiResponse<DispatchedJob>>> {
    assign_job(state, user, JobKind::Installation, id, payload).await
}

#[utoipa::path(
    post,
    path = "/api/admin/pickups/{id}/assign",
    params(("id" = i32, Path, description = "Pickup ID")),
    request_body = AssignCourierRequest,
    responses(
        (status = 200, description = "Courier assigned", body = ApiResponse<DispatchedJob>),
        (status = 409, description = "Job already finished or cancelled"),
        (status = 422, description = "Courier cannot take jobs")
    ),
    security(("bearer_auth" = [])),
    tag = "Dispatch"
)]
pub async fn assign_pickup(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<AssignCourierRequest>,
) -> AppResult<Json<ApiResponse<DispatchedJob>>> {
    assign_job(state, user, JobKind::Pickup, id, payload).await
}

#[utoipa::path(
    post,
    path = "/api/admin/installations/{id}/{action}",
    params(
        ("id" = i32, Path, description = "Installation ID"),
        ("action" = String, Path, description = "start, finish or cancel")
    ),
    responses(
        (status = 200, description = "Installation updated", body = ApiResponse<DispatchedJob>),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearer_auth" = [])),
    tag = "Dispatch"
)]
pub async fn installation_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, action)): Path<(i32, JobAction)>,
) -> AppResult<Json<ApiResponse<DispatchedJob>>> {
    apply_job_action(state, user, JobKind::Installation, id, action).await
}

#[utoipa::path(
    post,
    path = "/api/admin/pickups/{id}/{action}",
    params(
        ("id" = i32, Path, description = "Pickup ID"),
        ("action" = String, Path, description = "start, finish or cancel")
    ),
    responses(
        (status = 200, description = "Pickup updated", body = ApiResponse<DispatchedJob>),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearer_auth" = [])),
    tag = "Dispatch"
)]
pub async fn pickup_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, action)): Path<(i32, JobAction)>,
) -> AppResult<Json<ApiResponse<DispatchedJob>>> {
    apply_job_action(state, user, JobKind::Pickup, id, action).await
}

#[utoipa::path(
    put,
    path = "/api/admin/installations/{id}/payment-method",
    params(("id" = i32, Path, description = "Installation ID")),
    request_body = PaymentMethodRequest,
    responses(
        (status = 200, description = "Payment method noted", body = ApiResponse<DispatchedJob>)
    ),
    security(("bearer_auth" = [])),
    tag = "Dispatch"
)]
pub async fn installation_payment_method(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<PaymentMethodRequest>,
) -> AppResult<Json<ApiResponse<DispatchedJob>>> {
    ensure_admin(&user)?;
    let job = dispatch_service::set_installation_payment_method(
        &state,
        Caller::from(&user),
        id,
        payload.payment_method,
        None,
    )
    .await?;
    Ok(Json(ApiResponse::ok("Payment method updated", job)))
}
