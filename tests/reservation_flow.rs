mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use tokio_util::sync::CancellationToken;

use inflatable_rentals_api::{
    domain::lifecycle::{JobAction, ReservationAction},
    dto::{
        games::{GameRequest, SeasonalPriceRequest},
        payments::RecordPaymentRequest,
        reservations::AddLineRequest,
    },
    entity::{
        Installations, Payments, Pickups, ReservationLines,
        enums::{GameCategory, JobStatus, PaymentMethod, PaymentStatus, ReservationStatus, Season},
        installations, payments, pickups, reservation_lines,
    },
    error::AppError,
    services::{
        Caller, catalog_service,
        dispatch_service::{self, JobKind},
        payment_service, reservation_service,
    },
};

use common::{create_customer, create_game, reference_request, setup_state};

// Reference scenario: two games plus 12.3 km of travel.
#[tokio::test]
async fn reservation_totals_lines_and_travel() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let three_in_one = create_game(&state, "Juego 3en1", 30000).await?;
    let block = create_game(&state, "Juego Block", 35000).await?;
    let customer = create_customer(&state).await?;

    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&three_in_one, &block]),
    )
    .await?;

    assert_eq!(detail.reservation.total, Decimal::new(77300, 0));
    assert_eq!(detail.reservation.distance_price, Some(Decimal::new(12300, 0)));
    assert_eq!(detail.reservation.status, ReservationStatus::Pending);
    assert_eq!(detail.lines.len(), 2);
    for line in &detail.lines {
        assert_eq!(line.subtotal, line.unit_price * Decimal::from(line.quantity));
    }

    let installation = detail.installation.expect("installation created");
    let pickup = detail.pickup.expect("pickup created");
    assert_eq!(installation.status, JobStatus::Scheduled);
    assert_eq!(pickup.status, JobStatus::Scheduled);
    assert_eq!(installation.install_date, detail.reservation.event_date);
    assert_eq!(pickup.pickup_date, detail.reservation.event_date);
    assert_eq!(installation.install_time, detail.reservation.install_time);
    assert_eq!(pickup.pickup_time, detail.reservation.pickup_time);
    assert_eq!(installation.address, "Av. Mackenna 123, Osorno");

    Ok(())
}

#[tokio::test]
async fn unit_prices_are_snapshotted() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Castillo", 25000).await?;
    let customer = create_customer(&state).await?;
    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&game]),
    )
    .await?;

    catalog_service::upsert(
        &state,
        Caller::system(),
        Some(game.id),
        GameRequest {
            name: game.name.clone(),
            description: game.description.clone(),
            category: GameCategory::Castle,
            dimensions: game.dimensions.clone(),
            capacity: game.capacity,
            weight_limit_kg: game.weight_limit_kg,
            base_price: Decimal::new(99000, 0),
            photo: None,
            availability: None,
        },
    )
    .await?;

    let reloaded = reservation_service::get_reservation(&state, detail.reservation.id).await?;
    assert_eq!(reloaded.lines[0].unit_price, Decimal::new(25000, 0));
    assert_eq!(reloaded.reservation.total, detail.reservation.total);

    Ok(())
}

#[tokio::test]
async fn pending_cannot_jump_to_completed() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Tobogan", 40000).await?;
    let customer = create_customer(&state).await?;
    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&game]),
    )
    .await?;

    let err = reservation_service::transition(
        &state,
        Caller::system(),
        detail.reservation.id,
        ReservationAction::Complete,
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            entity: "reservation",
            ..
        }
    ));

    let unchanged = reservation_service::get_reservation(&state, detail.reservation.id).await?;
    assert_eq!(unchanged.reservation.status, ReservationStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn cancelling_keeps_finished_installation() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Block", 35000).await?;
    let customer = create_customer(&state).await?;
    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&game]),
    )
    .await?;
    let id = detail.reservation.id;
    let installation_id = detail.installation.expect("installation").id;

    reservation_service::transition(&state, Caller::system(), id, ReservationAction::Confirm).await?;
    for action in [JobAction::Start, JobAction::Finish] {
        dispatch_service::apply(
            &state,
            Caller::system(),
            JobKind::Installation,
            installation_id,
            action,
            None,
        )
        .await?;
    }

    let cancelled =
        reservation_service::transition(&state, Caller::system(), id, ReservationAction::Cancel)
            .await?;
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);

    let reloaded = reservation_service::get_reservation(&state, id).await?;
    assert_eq!(reloaded.installation.unwrap().status, JobStatus::Done);
    assert_eq!(reloaded.pickup.unwrap().status, JobStatus::Cancelled);

    Ok(())
}

#[tokio::test]
async fn line_edits_recompute_the_total() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let first = create_game(&state, "Mini", 18000).await?;
    let second = create_game(&state, "Cancha", 55000).await?;
    let customer = create_customer(&state).await?;
    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&first]),
    )
    .await?;
    let id = detail.reservation.id;
    assert_eq!(detail.reservation.total, Decimal::new(30300, 0));

    let grown = reservation_service::add_line(
        &state,
        Caller::system(),
        id,
        AddLineRequest {
            game_id: second.id,
            quantity: 2,
        },
    )
    .await?;
    assert_eq!(grown.lines.len(), 2);
    assert_eq!(grown.reservation.total, Decimal::new(140300, 0));

    let duplicate = reservation_service::add_line(
        &state,
        Caller::system(),
        id,
        AddLineRequest {
            game_id: second.id,
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(duplicate, AppError::Conflict { field: "game_id", .. }));

    let shrunk = reservation_service::remove_line(&state, Caller::system(), id, first.id).await?;
    assert_eq!(shrunk.reservation.total, Decimal::new(122300, 0));

    let last = reservation_service::remove_line(&state, Caller::system(), id, second.id)
        .await
        .unwrap_err();
    assert!(matches!(last, AppError::Validation { field: "items", .. }));

    Ok(())
}

#[tokio::test]
async fn backfill_restores_missing_jobs_once() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Circuito", 65000).await?;
    let customer = create_customer(&state).await?;
    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&game]),
    )
    .await?;
    let id = detail.reservation.id;

    Pickups::delete_many()
        .filter(pickups::Column::ReservationId.eq(id))
        .exec(&state.orm)
        .await?;

    let cancel = CancellationToken::new();
    let first = reservation_service::ensure_jobs_for_all(&state, &cancel).await?;
    assert!(first.pickups_created >= 1);

    let restored = reservation_service::get_reservation(&state, id).await?;
    let pickup = restored.pickup.expect("pickup restored");
    assert_eq!(pickup.pickup_date, restored.reservation.event_date);
    assert_eq!(pickup.pickup_time, restored.reservation.pickup_time);

    let second = reservation_service::ensure_jobs_for_all(&state, &cancel).await?;
    assert_eq!(second.installations_created, 0);
    assert_eq!(second.pickups_created, 0);
    let count = Pickups::find()
        .filter(pickups::Column::ReservationId.eq(id))
        .all(&state.orm)
        .await?
        .len();
    assert_eq!(count, 1);

    Ok(())
}

#[tokio::test]
async fn surcharge_uses_the_submitted_distance() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Saltarin", 30000).await?;
    let customer = create_customer(&state).await?;
    let mut request = reference_request(customer.id, &[&game]);
    request.distance_km = Some(Decimal::new(12345, 3));

    let detail =
        reservation_service::create_reservation(&state, Caller::system(), request).await?;
    assert_eq!(detail.reservation.distance_km, Some(Decimal::new(12345, 3)));
    assert_eq!(detail.reservation.distance_price, Some(Decimal::new(12345, 0)));
    assert_eq!(detail.reservation.total, Decimal::new(42345, 0));

    let reloaded = reservation_service::get_reservation(&state, detail.reservation.id).await?;
    assert_eq!(reloaded.reservation.distance_price, Some(Decimal::new(12345, 0)));

    Ok(())
}

#[tokio::test]
async fn seasonal_price_is_snapshotted_on_create() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Verano", 20000).await?;
    catalog_service::add_seasonal_price(
        &state,
        Caller::system(),
        game.id,
        SeasonalPriceRequest {
            season: Season::High,
            rental_price: Decimal::new(30000, 0),
            start_date: NaiveDate::from_ymd_opt(2025, 11, 15).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 15).unwrap(),
            discount_percent: Decimal::new(10, 0),
        },
    )
    .await?;
    let customer = create_customer(&state).await?;

    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&game]),
    )
    .await?;
    assert_eq!(detail.lines[0].unit_price, Decimal::new(27000, 0));
    assert_eq!(detail.reservation.total, Decimal::new(39300, 0));

    // Outside the window the base price applies.
    let mut later = reference_request(customer.id, &[&game]);
    later.event_date = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
    let later = reservation_service::create_reservation(&state, Caller::system(), later).await?;
    assert_eq!(later.lines[0].unit_price, Decimal::new(20000, 0));

    Ok(())
}

#[tokio::test]
async fn deleting_a_reservation_removes_its_children() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Gusano", 22000).await?;
    let customer = create_customer(&state).await?;
    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&game]),
    )
    .await?;
    let id = detail.reservation.id;
    payment_service::record_payment(
        &state,
        Caller::system(),
        id,
        RecordPaymentRequest {
            amount: Decimal::new(5000, 0),
            method: PaymentMethod::Cash,
            status: PaymentStatus::Paid,
            paid_at: None,
            notes: None,
            receipt_ref: None,
        },
    )
    .await?;

    reservation_service::delete_reservation(&state, Caller::system(), id).await?;

    let missing = reservation_service::get_reservation(&state, id).await.unwrap_err();
    assert!(matches!(missing, AppError::NotFound("reservation")));
    let lines = ReservationLines::find()
        .filter(reservation_lines::Column::ReservationId.eq(id))
        .count(&state.orm)
        .await?;
    let installs = Installations::find()
        .filter(installations::Column::ReservationId.eq(id))
        .count(&state.orm)
        .await?;
    let pickups_left = Pickups::find()
        .filter(pickups::Column::ReservationId.eq(id))
        .count(&state.orm)
        .await?;
    let payments_left = Payments::find()
        .filter(payments::Column::ReservationId.eq(id))
        .count(&state.orm)
        .await?;
    assert_eq!((lines, installs, pickups_left, payments_left), (0, 0, 0, 0));

    let again = reservation_service::delete_reservation(&state, Caller::system(), id)
        .await
        .unwrap_err();
    assert!(matches!(again, AppError::NotFound("reservation")));

    Ok(())
}
