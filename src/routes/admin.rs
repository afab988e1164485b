use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use tokio_util::sync::CancellationToken;

use crate::{
    dto::{
        games::{
            AvailabilityRequest, EffectivePrice, GameList, GameRequest, SeasonalPriceList,
            SeasonalPriceRequest,
        },
        pages::AdminDashboard,
        payments::SweepReport,
        reservations::BackfillReport,
        users::{
            CourierList, CourierStatusRequest, CreateCourierRequest, CreateCustomerRequest,
            CreateUserRequest, CustomerList, SetPasswordRequest,
        },
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::{Courier, Customer, Game, SeasonalPrice, User},
    response::{ApiResponse, Meta},
    routes::params::{CustomerQuery, DateQuery, GameQuery},
    services::{
        Caller, catalog_service, panel_service, payment_service, reservation_service,
        user_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/games", get(list_games).post(create_game))
        .route("/games/{id}", get(get_game).put(update_game).delete(delete_game))
        .route("/games/{id}/availability", patch(set_availability))
        .route("/games/{id}/price", get(effective_price))
        .route(
            "/games/{id}/seasonal-prices",
            get(list_seasonal_prices).post(add_seasonal_price),
        )
        .route("/seasonal-prices/{id}", delete(delete_seasonal_price))
        .route("/users", post(create_user))
        .route("/users/{id}/password", post(set_password))
        .route("/users/{id}/deactivate", post(deactivate_user))
        .route("/customers", get(list_customers).post(create_customer))
        .route("/customers/{id}", get(get_customer))
        .route("/couriers", get(list_couriers).post(create_courier))
        .route("/couriers/{id}", get(get_courier).delete(delete_courier))
        .route("/couriers/{id}/status", patch(set_courier_status))
        .route("/maintenance/backfill-jobs", post(backfill_jobs))
        .route("/maintenance/sweep-overdue", post(sweep_overdue))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    description = "Same payload as /admin-panel, for bearer-token clients.",
    responses(
        (status = 200, description = "Reservation counts, upcoming events and open work", body = ApiResponse<AdminDashboard>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AdminDashboard>>> {
    ensure_admin(&user)?;
    let data = panel_service::admin_dashboard(&state).await?;
    Ok(Json(ApiResponse::ok("Dashboard", data)))
}

#[utoipa::path(
    get,
    path = "/api/admin/games",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("category" = Option<String>, Query, description = "Filter by category"),
        ("availability" = Option<String>, Query, description = "available, maintenance, reserved, unavailable")
    ),
    responses(
        (status = 200, description = "Every game", body = ApiResponse<GameList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_games(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<GameQuery>,
) -> AppResult<Json<ApiResponse<GameList>>> {
    ensure_admin(&user)?;
    let (items, meta) = catalog_service::list_all(&state, &query).await?;
    Ok(Json(ApiResponse::success("Games", GameList { items }, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/admin/games",
    request_body = GameRequest,
    responses(
        (status = 201, description = "Game created", body = ApiResponse<Game>),
        (status = 409, description = "Name taken"),
        (status = 422, description = "Invalid game")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_game(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<GameRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Game>>)> {
    ensure_admin(&user)?;
    let game = catalog_service::upsert(&state, Caller::from(&user), None, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Game created", game))))
}

#[utoipa::path(
    get,
    path = "/api/admin/games/{id}",
    params(("id" = i32, Path, description = "Game ID")),
    responses(
        (status = 200, description = "Game", body = ApiResponse<Game>),
        (status = 404, description = "Game not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_game(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Game>>> {
    ensure_admin(&user)?;
    let game = catalog_service::get(&state, id).await?;
    Ok(Json(ApiResponse::ok("Game", game)))
}

#[utoipa::path(
    put,
    path = "/api/admin/games/{id}",
    params(("id" = i32, Path, description = "Game ID")),
    request_body = GameRequest,
    responses(
        (status = 200, description = "Game updated", body = ApiResponse<Game>),
        (status = 404, description = "Game not found"),
        (status = 409, description = "Name taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_game(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<GameRequest>,
) -> AppResult<Json<ApiResponse<Game>>> {
    ensure_admin(&user)?;
    let game = catalog_service::upsert(&state, Caller::from(&user), Some(id), payload).await?;
    Ok(Json(ApiResponse::ok("Game updated", game)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/games/{id}/availability",
    params(("id" = i32, Path, description = "Game ID")),
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Availability changed", body = ApiResponse<Game>),
        (status = 404, description = "Game not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_availability(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<AvailabilityRequest>,
) -> AppResult<Json<ApiResponse<Game>>> {
    ensure_admin(&user)?;
    let game =
        catalog_service::set_availability(&state, Caller::from(&user), id, payload.availability)
            .await?;
    Ok(Json(ApiResponse::ok("Availability updated", game)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/games/{id}",
    params(("id" = i32, Path, description = "Game ID")),
    responses(
        (status = 200, description = "Game deleted"),
        (status = 409, description = "Game is referenced by reservations")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_game(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    ensure_admin(&user)?;
    catalog_service::delete_game(&state, Caller::from(&user), id).await?;
    Ok(Json(ApiResponse::ok("Game deleted", serde_json::json!({ "id": id }))))
}

#[utoipa::path(
    get,
    path = "/api/admin/games/{id}/price",
    params(
        ("id" = i32, Path, description = "Game ID"),
        ("date" = Option<String>, Query, description = "YYYY-MM-DD, default today")
    ),
    responses(
        (status = 200, description = "Unit price on that date", body = ApiResponse<EffectivePrice>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn effective_price(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<ApiResponse<EffectivePrice>>> {
    ensure_admin(&user)?;
    let date = query.date.unwrap_or_else(reservation_service::today);
    let price = catalog_service::effective_price(&state, id, date).await?;
    Ok(Json(ApiResponse::ok(
        "Effective price",
        EffectivePrice {
            game_id: id,
            date,
            price,
        },
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/games/{id}/seasonal-prices",
    params(("id" = i32, Path, description = "Game ID")),
    responses(
        (status = 200, description = "Seasonal windows of the game", body = ApiResponse<SeasonalPriceList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_seasonal_prices(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<SeasonalPriceList>>> {
    ensure_admin(&user)?;
    let items = catalog_service::list_seasonal_prices(&state, id).await?;
    let meta = Meta::unpaged(items.len());
    Ok(Json(ApiResponse::success(
        "Seasonal prices",
        SeasonalPriceList { items },
        Some(meta),
    )))
}

#[utoipa::path(
    post,
    path = "/api/admin/games/{id}/seasonal-prices",
    params(("id" = i32, Path, description = "Game ID")),
    request_body = SeasonalPriceRequest,
    responses(
        (status = 201, description = "Window added", body = ApiResponse<SeasonalPrice>),
        (status = 409, description = "A window for that season already starts on that date"),
        (status = 422, description = "Invalid window")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn add_seasonal_price(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<SeasonalPriceRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<SeasonalPrice>>)> {
    ensure_admin(&user)?;
    let window = catalog_service::add_seasonal_price(&state, Caller::from(&user), id, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Seasonal price added", window))))
}

#[utoipa::path(
    delete,
    path = "/api/admin/seasonal-prices/{id}",
    params(("id" = i32, Path, description = "Seasonal price ID")),
    responses(
        (status = 200, description = "Window removed"),
        (status = 404, description = "Seasonal price not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_seasonal_price(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    ensure_admin(&user)?;
    catalog_service::delete_seasonal_price(&state, Caller::from(&user), id).await?;
    Ok(Json(ApiResponse::ok("Seasonal price deleted", serde_json::json!({ "id": id }))))
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<User>),
        (status = 409, description = "Login or email taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    ensure_admin(&user)?;
    let created = user_service::create_user(&state, Caller::from(&user), payload.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("User created", created))))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/password",
    params(("id" = i32, Path, description = "User ID")),
    request_body = SetPasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 422, description = "Password too short")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_password(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<SetPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    ensure_admin(&user)?;
    user_service::set_password(&state, Caller::from(&user), id, &payload.password).await?;
    Ok(Json(ApiResponse::ok("Password updated", serde_json::json!({ "id": id }))))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/deactivate",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User can no longer sign in", body = ApiResponse<User>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn deactivate_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<User>>> {
    ensure_admin(&user)?;
    let updated = user_service::deactivate(&state, Caller::from(&user), id).await?;
    Ok(Json(ApiResponse::ok("User deactivated", updated)))
}

#[utoipa::path(
    get,
    path = "/api/admin/customers",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search name, email or national id")
    ),
    responses(
        (status = 200, description = "Customers", body = ApiResponse<CustomerList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CustomerQuery>,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    ensure_admin(&user)?;
    let (items, meta) = user_service::list_customers(&state, &query).await?;
    Ok(Json(ApiResponse::success("Customers", CustomerList { items }, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/admin/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = ApiResponse<Customer>),
        (status = 409, description = "Login, email or national id taken"),
        (status = 422, description = "Invalid national id")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCustomerRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Customer>>)> {
    ensure_admin(&user)?;
    let customer = user_service::create_customer(&state, Caller::from(&user), payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Customer created", customer))))
}

#[utoipa::path(
    get,
    path = "/api/admin/customers/{id}",
    params(("id" = i32, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer", body = ApiResponse<Customer>),
        (status = 404, description = "Customer not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    ensure_admin(&user)?;
    let customer = user_service::get_customer(&state, id).await?;
    Ok(Json(ApiResponse::ok("Customer", customer)))
}

#[utoipa::path(
    get,
    path = "/api/admin/couriers",
    responses(
        (status = 200, description = "Couriers", body = ApiResponse<CourierList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_couriers(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CourierList>>> {
    ensure_admin(&user)?;
    let items = user_service::list_couriers(&state).await?;
    let meta = Meta::unpaged(items.len());
    Ok(Json(ApiResponse::success("Couriers", CourierList { items }, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/admin/couriers",
    request_body = CreateCourierRequest,
    responses(
        (status = 201, description = "Courier created", body = ApiResponse<Courier>),
        (status = 409, description = "Login or email taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_courier(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCourierRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Courier>>)> {
    ensure_admin(&user)?;
    let courier = user_service::create_courier(&state, Caller::from(&user), payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok("Courier created", courier))))
}

#[utoipa::path(
    get,
    path = "/api/admin/couriers/{id}",
    params(("id" = i32, Path, description = "Courier ID")),
    responses(
        (status = 200, description = "Courier", body = ApiResponse<Courier>),
        (status = 404, description = "Courier not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_courier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Courier>>> {
    ensure_admin(&user)?;
    let courier = user_service::get_courier(&state, id).await?;
    Ok(Json(ApiResponse::ok("Courier", courier)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/couriers/{id}/status",
    params(("id" = i32, Path, description = "Courier ID")),
    request_body = CourierStatusRequest,
    responses(
        (status = 200, description = "Courier status changed", body = ApiResponse<Courier>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_courier_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<CourierStatusRequest>,
) -> AppResult<Json<ApiResponse<Courier>>> {
    ensure_admin(&user)?;
    let courier =
        user_service::set_courier_status(&state, Caller::from(&user), id, payload.status).await?;
    Ok(Json(ApiResponse::ok("Courier status updated", courier)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/couriers/{id}",
    params(("id" = i32, Path, description = "Courier ID")),
    responses(
        (status = 200, description = "Courier removed; their jobs are left unassigned")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_courier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    ensure_admin(&user)?;
    user_service::delete_courier(&state, Caller::from(&user), id).await?;
    Ok(Json(ApiResponse::ok("Courier deleted", serde_json::json!({ "id": id }))))
}

#[utoipa::path(
    post,
    path = "/api/admin/maintenance/backfill-jobs",
    responses(
        (status = 200, description = "Missing installations and pickups created", body = ApiResponse<BackfillReport>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn backfill_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<BackfillReport>>> {
    ensure_admin(&user)?;
    let report = reservation_service::ensure_jobs_for_all(&state, &CancellationToken::new()).await?;
    Ok(Json(ApiResponse::ok("Backfill finished", report)))
}

#[utoipa::path(
    post,
    path = "/api/admin/maintenance/sweep-overdue",
    params(("date" = Option<String>, Query, description = "Reference day, default today")),
    responses(
        (status = 200, description = "Pending payments marked overdue", body = ApiResponse<SweepReport>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn sweep_overdue(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<ApiResponse<SweepReport>>> {
    ensure_admin(&user)?;
    let today = query.date.unwrap_or_else(reservation_service::today);
    let swept = payment_service::sweep_overdue(&state, today, &CancellationToken::new()).await?;
    Ok(Json(ApiResponse::ok("Overdue sweep finished", SweepReport { swept })))
}
