use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::{
        games::{CatalogFeed, GameList},
        pages::{ContactForm, ContactInfo, HomePage},
        reservations::{BookingConfirmation, BookingRequest},
    },
    error::AppResult,
    response::{ApiResponse, Meta},
    routes::params::CatalogQuery,
    services::{catalog_service, panel_service, reservation_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/catalog", get(catalog))
        .route("/book", get(booking_form).post(book))
        .route("/contact", get(contact).post(send_contact))
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Landing page with featured games", body = ApiResponse<HomePage>)
    ),
    tag = "Public"
)]
pub async fn home(State(state): State<AppState>) -> AppResult<Json<ApiResponse<HomePage>>> {
    let page = panel_service::home(&state).await?;
    Ok(Json(ApiResponse::ok("Home", page)))
}

#[utoipa::path(
    get,
    path = "/catalog",
    params(
        ("category" = Option<String>, Query, description = "castle, slide, obstacle, combo, sport, kids")
    ),
    responses(
        (status = 200, description = "Available games", body = ApiResponse<GameList>),
        (status = 422, description = "Unknown category")
    ),
    tag = "Public"
)]
pub async fn catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<ApiResponse<GameList>>> {
    let items = catalog_service::list_available(&state, query.category()?).await?;
    let meta = Meta::unpaged(items.len());
    Ok(Json(ApiResponse::success("Catalog", GameList { items }, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/book",
    responses(
        (status = 200, description = "Games that can be booked", body = ApiResponse<CatalogFeed>)
    ),
    tag = "Public"
)]
pub async fn booking_form(State(state): State<AppState>) -> AppResult<Json<ApiResponse<CatalogFeed>>> {
    let feed = catalog_service::catalog_feed(&state).await?;
    Ok(Json(ApiResponse::ok("Booking form", feed)))
}

#[utoipa::path(
    post,
    path = "/book",
    request_body = BookingRequest,
    responses(
        (status = 201, description = "Reservation booked", body = ApiResponse<BookingConfirmation>),
        (status = 409, description = "Identity or availability conflict"),
        (status = 422, description = "Invalid booking")
    ),
    tag = "Public"
)]
pub async fn book(
    State(state): State<AppState>,
    Json(payload): Json<BookingRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BookingConfirmation>>)> {
    let confirmation = reservation_service::book(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Reservation received", confirmation)),
    ))
}

#[utoipa::path(
    get,
    path = "/contact",
    responses(
        (status = 200, description = "Contact details", body = ApiResponse<ContactInfo>)
    ),
    tag = "Public"
)]
pub async fn contact(State(state): State<AppState>) -> Json<ApiResponse<ContactInfo>> {
    Json(ApiResponse::ok("Contact", panel_service::contact(&state)))
}

#[utoipa::path(
    post,
    path = "/contact",
    request_body(content = ContactForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 202, description = "Message accepted"),
        (status = 422, description = "Missing field")
    ),
    tag = "Public"
)]
pub async fn send_contact(
    State(state): State<AppState>,
    Form(form): Form<ContactForm>,
) -> AppResult<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    panel_service::submit_contact(&state, form).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::ok("Thanks, we will get back to you", serde_json::json!({}))),
    ))
}

/// Public catalog feed. Served bare, without the response envelope.
#[utoipa::path(
    get,
    path = "/api/games",
    responses(
        (status = 200, description = "Available games", body = CatalogFeed)
    ),
    tag = "Public"
)]
pub async fn games_feed(State(state): State<AppState>) -> AppResult<Json<CatalogFeed>> {
    Ok(Json(catalog_service::catalog_feed(&state).await?))
}
