use std::collections::HashSet;

use chrono::{Local, NaiveDate, Utc};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    ActiveValue::NotSet, sea_query::LockType,
};
use tokio_util::sync::CancellationToken;

use crate::{
    audit,
    domain::{
        geo::{BUSINESS_ORIGIN, GeoPoint},
        lifecycle::{ReservationAction, completion_path},
        pricing::{LineInput, line_subtotal, price_reservation, round_distance, total_from_subtotals},
    },
    dto::reservations::{
        AddLineRequest, BackfillReport, BookingConfirmation, BookingRequest,
        CreateReservationRequest, ReservationItem,
    },
    entity::{
        Customers, Games, Installations, Payments, Pickups, ReservationLines, Reservations, Users,
        enums::{Availability, CustomerKind, JobStatus, ReservationStatus},
        games, installations, payments, pickups, reservation_lines, reservations,
    },
    error::{AppError, AppResult},
    models::{Reservation, ReservationDetail},
    response::Meta,
    routes::params::{ReservationListQuery, SortOrder},
    services::{
        Caller, catalog_service,
        user_service::{self, BookingCustomer},
    },
    state::AppState,
};

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Checks that need no database access.
pub fn validate_request(
    req: &CreateReservationRequest,
    today: NaiveDate,
    allow_past: bool,
) -> AppResult<()> {
    if req.address.trim().is_empty() {
        return Err(AppError::validation("address", "must not be empty"));
    }
    if req.pickup_time <= req.install_time {
        return Err(AppError::validation(
            "pickup_time",
            "must be later than install_time",
        ));
    }
    if !allow_past && req.event_date < today {
        return Err(AppError::validation("event_date", "must not be in the past"));
    }
    validate_items(&req.items)?;
    if let Some(distance) = req.distance_km {
        if distance.is_sign_negative() {
            return Err(AppError::validation("distance_km", "must not be negative"));
        }
    }
    Ok(())
}

fn validate_items(items: &[ReservationItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::validation("items", "at least one game is required"));
    }
    let mut seen = HashSet::new();
    for item in items {
        if item.quantity < 1 {
            return Err(AppError::validation("quantity", "must be at least 1"));
        }
        if !seen.insert(item.game_id) {
            return Err(AppError::validation(
                "items",
                format!("game {} is listed more than once", item.game_id),
            ));
        }
    }
    Ok(())
}

async fn serializable(state: &AppState) -> AppResult<DatabaseTransaction> {
    Ok(state
        .orm
        .begin_with_config(Some(IsolationLevel::Serializable), None)
        .await?)
}

async fn customer_phone<C: ConnectionTrait>(conn: &C, customer_id: i32) -> AppResult<String> {
    let (_, user) = Customers::find_by_id(customer_id)
        .find_also_related(Users)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("customer"))?;
    Ok(user.and_then(|u| u.phone).unwrap_or_default())
}

/// Load the games behind `ids`, requiring every one to exist and be available.
async fn available_games<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> AppResult<Vec<games::Model>> {
    let found = Games::find()
        .filter(games::Column::Id.is_in(ids.to_vec()))
        .all(conn)
        .await?;

    for id in ids {
        let game = found
            .iter()
            .find(|g| g.id == *id)
            .ok_or(AppError::NotFound("game"))?;
        if game.availability != Availability::Available {
            return Err(AppError::validation(
                "items",
                format!("game `{}` is not available", game.name),
            ));
        }
    }
    Ok(found)
}

pub(crate) async fn insert_installation<C: ConnectionTrait>(
    conn: &C,
    reservation: &reservations::Model,
    client_phone: String,
) -> AppResult<installations::Model> {
    let job = installations::ActiveModel {
        id: NotSet,
        reservation_id: Set(reservation.id),
        courier_id: Set(None),
        install_date: Set(reservation.event_date),
        install_time: Set(reservation.install_time),
        address: Set(reservation.address.clone()),
        client_phone: Set(client_phone),
        status: Set(JobStatus::Scheduled),
        notes: Set(reservation.notes.clone()),
        payment_method: Set(None),
    }
    .insert(conn)
    .await?;
    Ok(job)
}

pub(crate) async fn insert_pickup<C: ConnectionTrait>(
    conn: &C,
    reservation: &reservations::Model,
) -> AppResult<pickups::Model> {
    let job = pickups::ActiveModel {
        id: NotSet,
        reservation_id: Set(reservation.id),
        courier_id: Set(None),
        pickup_date: Set(reservation.event_date),
        pickup_time: Set(reservation.pickup_time),
        status: Set(JobStatus::Scheduled),
        notes: Set(reservation.notes.clone()),
    }
    .insert(conn)
    .await?;
    Ok(job)
}

/// Price, persist and dispatch a validated request inside the caller's transaction.
pub(crate) async fn insert_reservation<C: ConnectionTrait>(
    conn: &C,
    req: &CreateReservationRequest,
) -> AppResult<ReservationDetail> {
    let client_phone = customer_phone(conn, req.customer_id).await?;

    let ids: Vec<i32> = req.items.iter().map(|item| item.game_id).collect();
    let games = available_games(conn, &ids).await?;

    let mut inputs = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let game = games
            .iter()
            .find(|g| g.id == item.game_id)
            .ok_or(AppError::NotFound("game"))?;
        inputs.push(LineInput {
            game_id: game.id,
            quantity: item.quantity,
            unit_price: catalog_service::price_on(conn, game, req.event_date).await?,
        });
    }

    let distance_km = req.distance_km.map(round_distance);
    let priced = price_reservation(&inputs, distance_km);

    let now = Utc::now();
    let reservation = reservations::ActiveModel {
        id: NotSet,
        customer_id: Set(req.customer_id),
        event_date: Set(req.event_date),
        install_time: Set(req.install_time),
        pickup_time: Set(req.pickup_time),
        address: Set(req.address.trim().to_string()),
        distance_km: Set(distance_km),
        distance_price: Set(priced.distance_price),
        status: Set(ReservationStatus::Pending),
        notes: Set(req.notes.clone().unwrap_or_default()),
        total: Set(priced.total),
        created_at: Set(now.into()),
        modified_at: Set(now.into()),
    }
    .insert(conn)
    .await?;

    let mut lines = Vec::with_capacity(priced.lines.len());
    for line in &priced.lines {
        let row = reservation_lines::ActiveModel {
            id: NotSet,
            reservation_id: Set(reservation.id),
            game_id: Set(line.game_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            subtotal: Set(line.subtotal),
        }
        .insert(conn)
        .await?;
        lines.push(row.into());
    }

    let installation = insert_installation(conn, &reservation, client_phone).await?;
    let pickup = insert_pickup(conn, &reservation).await?;

    Ok(ReservationDetail {
        reservation: reservation.into(),
        lines,
        installation: Some(installation.into()),
        pickup: Some(pickup.into()),
        payments: Vec::new(),
    })
}

/// Create a pending reservation with its lines, installation and pickup in one serializable transaction.
pub async fn create_reservation(
    state: &AppState,
    caller: Caller,
    req: CreateReservationRequest,
) -> AppResult<ReservationDetail> {
    validate_request(&req, today(), caller.is_admin)?;

    let txn = serializable(state).await?;
    let detail = insert_reservation(&txn, &req).await?;
    txn.commit().await?;

    let id = detail.reservation.id;
    tracing::info!(
        reservation_id = id,
        customer_id = req.customer_id,
        total = %detail.reservation.total,
        "reservation created"
    );
    audit::record(
        &state.pool,
        caller.user_id,
        "reservation_create",
        "reservations",
        serde_json::json!({ "reservation_id": id, "total": detail.reservation.total }),
    )
    .await;
    Ok(detail)
}

/// Public booking: register or reuse the customer, price the distance from the warehouse and reserve.
pub async fn book(state: &AppState, req: BookingRequest) -> AppResult<BookingConfirmation> {
    let distance_km = match (req.lat, req.lng) {
        (Some(lat), Some(lng)) => {
            let km = BUSINESS_ORIGIN.distance_to(&GeoPoint::new(lat, lng));
            Some(
                Decimal::from_f64(km)
                    .ok_or_else(|| AppError::validation("lat", "coordinates out of range"))?,
            )
        }
        (None, None) => None,
        _ => return Err(AppError::validation("lng", "lat and lng must be given together")),
    };

    let mut request = CreateReservationRequest {
        customer_id: 0,
        event_date: req.event_date,
        install_time: req.install_time,
        pickup_time: req.pickup_time,
        address: req.address,
        items: req.items,
        distance_km,
        notes: req.notes,
    };
    validate_request(&request, today(), false)?;

    let details = BookingCustomer {
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        phone: req.phone,
        national_id: req.national_id,
        kind: req.kind.unwrap_or(CustomerKind::Individual),
    };

    let txn = serializable(state).await?;
    let (customer, user, created) = user_service::find_or_register_customer(&txn, &details).await?;
    request.customer_id = customer.id;
    let reservation = insert_reservation(&txn, &request).await?;
    txn.commit().await?;

    tracing::info!(
        reservation_id = reservation.reservation.id,
        customer_id = customer.id,
        new_customer = created,
        "booking received"
    );
    audit::record(
        &state.pool,
        Some(user.id),
        "reservation_book",
        "reservations",
        serde_json::json!({ "reservation_id": reservation.reservation.id, "customer_id": customer.id }),
    )
    .await;

    Ok(BookingConfirmation {
        reservation,
        customer_id: customer.id,
    })
}

pub(crate) async fn lock_reservation<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> AppResult<reservations::Model> {
    Reservations::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("reservation"))
}

pub(crate) async fn set_status<C: ConnectionTrait>(
    conn: &C,
    reservation: reservations::Model,
    next: ReservationStatus,
) -> AppResult<reservations::Model> {
    let from = reservation.status;
    let next = from.transition(next)?;

    let id = reservation.id;
    let mut active: reservations::ActiveModel = reservation.into();
    active.status = Set(next);
    active.modified_at = Set(Utc::now().into());
    let updated = active.update(conn).await?;

    tracing::info!(
        reservation_id = id,
        from = from.as_str(),
        to = next.as_str(),
        "reservation status changed"
    );
    Ok(updated)
}

/// Cancel whichever of the reservation's jobs are not yet terminal.
async fn cancel_open_jobs<C: ConnectionTrait>(conn: &C, reservation_id: i32) -> AppResult<()> {
    if let Some(job) = Installations::find()
        .filter(installations::Column::ReservationId.eq(reservation_id))
        .lock(LockType::Update)
        .one(conn)
        .await?
    {
        if !job.status.is_terminal() {
            let mut active: installations::ActiveModel = job.into();
            active.status = Set(JobStatus::Cancelled);
            active.update(conn).await?;
        }
    }

    if let Some(job) = Pickups::find()
        .filter(pickups::Column::ReservationId.eq(reservation_id))
        .lock(LockType::Update)
        .one(conn)
        .await?
    {
        if !job.status.is_terminal() {
            let mut active: pickups::ActiveModel = job.into();
            active.status = Set(JobStatus::Cancelled);
            active.update(conn).await?;
        }
    }
    Ok(())
}

/// Apply `action` under a row lock; cancelling also cancels the open jobs.
pub async fn transition(
    state: &AppState,
    caller: Caller,
    id: i32,
    action: ReservationAction,
) -> AppResult<Reservation> {
    let txn = state.orm.begin().await?;
    let reservation = lock_reservation(&txn, id).await?;
    let from = reservation.status;
    let updated = set_status(&txn, reservation, action.target()).await?;
    if action == ReservationAction::Cancel {
        cancel_open_jobs(&txn, id).await?;
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        caller.user_id,
        "reservation_status",
        "reservations",
        serde_json::json!({
            "reservation_id": id,
            "from": from.as_str(),
            "to": updated.status.as_str(),
        }),
    )
    .await;
    Ok(updated.into())
}

/// Walk a reservation to completed once both of its jobs are done.
///
/// Returns whether the status changed.
pub(crate) async fn complete_if_jobs_done<C: ConnectionTrait>(
    conn: &C,
    reservation_id: i32,
) -> AppResult<bool> {
    let installation_done = Installations::find()
        .filter(installations::Column::ReservationId.eq(reservation_id))
        .one(conn)
        .await?
        .is_some_and(|job| job.status == JobStatus::Done);
    let pickup_done = Pickups::find()
        .filter(pickups::Column::ReservationId.eq(reservation_id))
        .one(conn)
        .await?
        .is_some_and(|job| job.status == JobStatus::Done);
    if !(installation_done && pickup_done) {
        return Ok(false);
    }

    let mut reservation = lock_reservation(conn, reservation_id).await?;
    let path = completion_path(reservation.status);
    for next in path {
        reservation = set_status(conn, reservation, *next).await?;
    }
    Ok(!path.is_empty())
}

pub(crate) async fn load_detail<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<ReservationDetail> {
    let reservation = Reservations::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("reservation"))?;

    let lines = ReservationLines::find()
        .filter(reservation_lines::Column::ReservationId.eq(id))
        .order_by_asc(reservation_lines::Column::GameId)
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let installation = Installations::find()
        .filter(installations::Column::ReservationId.eq(id))
        .one(conn)
        .await?
        .map(Into::into);
    let pickup = Pickups::find()
        .filter(pickups::Column::ReservationId.eq(id))
        .one(conn)
        .await?
        .map(Into::into);
    let payments = Payments::find()
        .filter(payments::Column::ReservationId.eq(id))
        .order_by_asc(payments::Column::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(ReservationDetail {
        reservation: reservation.into(),
        lines,
        installation,
        pickup,
        payments,
    })
}

pub async fn get_reservation(state: &AppState, id: i32) -> AppResult<ReservationDetail> {
    load_detail(&state.orm, id).await
}

/// Reservations newest first unless `sort_order=asc`; filters on status, customer and event date.
pub async fn list_reservations(
    state: &AppState,
    query: &ReservationListQuery,
) -> AppResult<(Vec<Reservation>, Meta)> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status()? {
        condition = condition.add(reservations::Column::Status.eq(status));
    }
    if let Some(customer_id) = query.customer_id {
        condition = condition.add(reservations::Column::CustomerId.eq(customer_id));
    }
    if let Some(from) = query.from {
        condition = condition.add(reservations::Column::EventDate.gte(from));
    }
    if let Some(to) = query.to {
        condition = condition.add(reservations::Column::EventDate.lte(to));
    }

    let mut finder = Reservations::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(reservations::Column::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(reservations::Column::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Reservation::from)
        .collect();

    Ok((items, Meta::new(page, limit, total)))
}

fn ensure_editable(reservation: &reservations::Model) -> AppResult<()> {
    if reservation.status.is_terminal() {
        return Err(AppError::conflict(
            "status",
            format!("reservation is {}", reservation.status.as_str()),
        ));
    }
    Ok(())
}

async fn refresh_total<C: ConnectionTrait>(
    conn: &C,
    reservation: reservations::Model,
) -> AppResult<reservations::Model> {
    let subtotals: Vec<Decimal> = ReservationLines::find()
        .filter(reservation_lines::Column::ReservationId.eq(reservation.id))
        .order_by_asc(reservation_lines::Column::GameId)
        .all(conn)
        .await?
        .into_iter()
        .map(|line| line.subtotal)
        .collect();

    let total = total_from_subtotals(subtotals, reservation.distance_price);
    let mut active: reservations::ActiveModel = reservation.into();
    active.total = Set(total);
    active.modified_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

pub async fn add_line(
    state: &AppState,
    caller: Caller,
    id: i32,
    req: AddLineRequest,
) -> AppResult<ReservationDetail> {
    if req.quantity < 1 {
        return Err(AppError::validation("quantity", "must be at least 1"));
    }

    let txn = state.orm.begin().await?;
    let reservation = lock_reservation(&txn, id).await?;
    ensure_editable(&reservation)?;

    let existing = ReservationLines::find()
        .filter(
            Condition::all()
                .add(reservation_lines::Column::ReservationId.eq(id))
                .add(reservation_lines::Column::GameId.eq(req.game_id)),
        )
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict(
            "game_id",
            format!("game {} is already on this reservation", req.game_id),
        ));
    }

    let games = available_games(&txn, &[req.game_id]).await?;
    let game = games.first().ok_or(AppError::NotFound("game"))?;
    let unit_price = catalog_service::price_on(&txn, game, reservation.event_date).await?;

    reservation_lines::ActiveModel {
        id: NotSet,
        reservation_id: Set(id),
        game_id: Set(game.id),
        quantity: Set(req.quantity),
        unit_price: Set(unit_price),
        subtotal: Set(line_subtotal(unit_price, req.quantity)),
    }
    .insert(&txn)
    .await?;
    refresh_total(&txn, reservation).await?;
    let detail = load_detail(&txn, id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        caller.user_id,
        "reservation_line_add",
        "reservation_lines",
        serde_json::json!({ "reservation_id": id, "game_id": req.game_id }),
    )
    .await;
    Ok(detail)
}

pub async fn remove_line(
    state: &AppState,
    caller: Caller,
    id: i32,
    game_id: i32,
) -> AppResult<ReservationDetail> {
    let txn = state.orm.begin().await?;
    let reservation = lock_reservation(&txn, id).await?;
    ensure_editable(&reservation)?;

    let lines = ReservationLines::find()
        .filter(reservation_lines::Column::ReservationId.eq(id))
        .all(&txn)
        .await?;
    let line = lines
        .iter()
        .find(|line| line.game_id == game_id)
        .ok_or(AppError::NotFound("reservation line"))?;
    if lines.len() <= 1 {
        return Err(AppError::validation(
            "items",
            "a reservation must keep at least one game",
        ));
    }

    ReservationLines::delete_by_id(line.id).exec(&txn).await?;
    refresh_total(&txn, reservation).await?;
    let detail = load_detail(&txn, id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        caller.user_id,
        "reservation_line_remove",
        "reservation_lines",
        serde_json::json!({ "reservation_id": id, "game_id": game_id }),
    )
    .await;
    Ok(detail)
}

/// Delete a reservation; lines, jobs and payments go with it.
pub async fn delete_reservation(state: &AppState, caller: Caller, id: i32) -> AppResult<()> {
    let result = Reservations::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("reservation"));
    }

    tracing::info!(reservation_id = id, "reservation deleted");
    audit::record(
        &state.pool,
        caller.user_id,
        "reservation_delete",
        "reservations",
        serde_json::json!({ "reservation_id": id }),
    )
    .await;
    Ok(())
}

async fn backfill_one(state: &AppState, reservation_id: i32) -> AppResult<(bool, bool)> {
    let txn = state.orm.begin().await?;
    let reservation = lock_reservation(&txn, reservation_id).await?;

    let has_installation = Installations::find()
        .filter(installations::Column::ReservationId.eq(reservation_id))
        .one(&txn)
        .await?
        .is_some();
    let has_pickup = Pickups::find()
        .filter(pickups::Column::ReservationId.eq(reservation_id))
        .one(&txn)
        .await?
        .is_some();

    if !has_installation {
        let phone = customer_phone(&txn, reservation.customer_id).await?;
        insert_installation(&txn, &reservation, phone).await?;
    }
    if !has_pickup {
        insert_pickup(&txn, &reservation).await?;
    }
    txn.commit().await?;

    Ok((!has_installation, !has_pickup))
}

/// Create the installation and pickup missing from any reservation.
///
/// One transaction per reservation; a failed reservation is logged, counted and skipped.
pub async fn ensure_jobs_for_all(
    state: &AppState,
    cancel: &CancellationToken,
) -> AppResult<BackfillReport> {
    let with_installation: HashSet<i32> = Installations::find()
        .select_only()
        .column(installations::Column::ReservationId)
        .into_tuple::<i32>()
        .all(&state.orm)
        .await?
        .into_iter()
        .collect();
    let with_pickup: HashSet<i32> = Pickups::find()
        .select_only()
        .column(pickups::Column::ReservationId)
        .into_tuple::<i32>()
        .all(&state.orm)
        .await?
        .into_iter()
        .collect();
    let all_ids: Vec<i32> = Reservations::find()
        .select_only()
        .column(reservations::Column::Id)
        .order_by_asc(reservations::Column::Id)
        .into_tuple::<i32>()
        .all(&state.orm)
        .await?;

    let mut report = BackfillReport::default();
    for id in all_ids
        .into_iter()
        .filter(|id| !with_installation.contains(id) || !with_pickup.contains(id))
    {
        if cancel.is_cancelled() {
            tracing::warn!(reservation_id = id, "backfill cancelled");
            break;
        }
        match backfill_one(state, id).await {
            Ok((installation, pickup)) => {
                report.installations_created += usize::from(installation);
                report.pickups_created += usize::from(pickup);
            }
            Err(err) => {
                tracing::warn!(reservation_id = id, error = %err, "backfill skipped reservation");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        installations = report.installations_created,
        pickups = report.pickups_created,
        failed = report.failed,
        "job backfill finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;

    fn request() -> CreateReservationRequest {
        CreateReservationRequest {
            customer_id: 1,
            event_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            install_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            pickup_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            address: "Av. Mackenna 123, Osorno".into(),
            items: vec![
                ReservationItem { game_id: 1, quantity: 1 },
                ReservationItem { game_id: 2, quantity: 1 },
            ],
            distance_km: Some(Decimal::new(123, 1)),
            notes: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn accepts_a_well_formed_request() {
        assert!(validate_request(&request(), day(2025, 11, 1), false).is_ok());
    }

    #[test]
    fn pickup_must_follow_install() {
        let mut req = request();
        req.pickup_time = req.install_time;
        assert!(matches!(
            validate_request(&req, day(2025, 11, 1), true),
            Err(AppError::Validation { field: "pickup_time", .. })
        ));
    }

    #[test]
    fn past_dates_need_staff() {
        let req = request();
        let later = day(2025, 12, 2);
        assert!(matches!(
            validate_request(&req, later, false),
            Err(AppError::Validation { field: "event_date", .. })
        ));
        assert!(validate_request(&req, later, true).is_ok());
    }

    #[test]
    fn items_must_be_present_unique_and_positive() {
        let mut req = request();
        req.items.clear();
        assert!(validate_request(&req, day(2025, 1, 1), false).is_err());

        let mut req = request();
        req.items[1].game_id = 1;
        assert!(matches!(
            validate_request(&req, day(2025, 1, 1), false),
            Err(AppError::Validation { field: "items", .. })
        ));

        let mut req = request();
        req.items[0].quantity = 0;
        assert!(matches!(
            validate_request(&req, day(2025, 1, 1), false),
            Err(AppError::Validation { field: "quantity", .. })
        ));
    }

    #[test]
    fn negative_distance_is_rejected() {
        let mut req = request();
        req.distance_km = Some(Decimal::new(-1, 0));
        assert!(matches!(
            validate_request(&req, day(2025, 1, 1), false),
            Err(AppError::Validation { field: "distance_km", .. })
        ));
    }
}
