mod common;

use rust_decimal::Decimal;
use sea_orm::EntityTrait;

use inflatable_rentals_api::{
    domain::lifecycle::{JobAction, ReservationAction},
    dto::{dispatch::DispatchedJob, payments::RecordPaymentRequest},
    entity::{
        Installations, Pickups,
        enums::{
            CourierStatus, InstallPaymentMethod, JobStatus, PaymentMethod, PaymentStatus,
            ReservationStatus,
        },
    },
    error::AppError,
    services::{
        Caller,
        dispatch_service::{self, JobKind},
        payment_service, reservation_service, user_service,
    },
};

use common::{create_courier, create_customer, create_game, reference_request, setup_state};

#[tokio::test]
async fn courier_finishes_both_jobs_and_completes_reservation() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Combo Selva", 45000).await?;
    let customer = create_customer(&state).await?;
    let courier = create_courier(&state, "camioneta1").await?;
    let other = create_courier(&state, "camioneta2").await?;

    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&game]),
    )
    .await?;
    let reservation_id = detail.reservation.id;
    let installation_id = detail.installation.expect("installation").id;
    let pickup_id = detail.pickup.expect("pickup").id;

    // A deposit before the event; the rest is collected at installation.
    payment_service::record_payment(
        &state,
        Caller::system(),
        reservation_id,
        RecordPaymentRequest {
            amount: Decimal::new(20000, 0),
            method: PaymentMethod::Transfer,
            status: PaymentStatus::Paid,
            paid_at: None,
            notes: Some("abono".into()),
            receipt_ref: Some("TRX-1".into()),
        },
    )
    .await?;

    for kind in [JobKind::Installation, JobKind::Pickup] {
        let id = if kind == JobKind::Installation { installation_id } else { pickup_id };
        dispatch_service::assign(&state, Caller::system(), kind, id, courier.id).await?;
    }

    let foreign = dispatch_service::apply(
        &state,
        Caller::system(),
        JobKind::Installation,
        installation_id,
        JobAction::Start,
        Some(other.id),
    )
    .await
    .unwrap_err();
    assert!(matches!(foreign, AppError::Forbidden));

    dispatch_service::set_installation_payment_method(
        &state,
        Caller::system(),
        installation_id,
        Some(InstallPaymentMethod::Cash),
        Some(courier.id),
    )
    .await?;

    let jobs = dispatch_service::list_jobs_for_courier(&state, courier.id).await?;
    assert!(jobs.installations.iter().any(|job| job.id == installation_id));
    assert!(jobs.pickups.iter().any(|job| job.id == pickup_id));

    for action in [JobAction::Start, JobAction::Finish] {
        dispatch_service::apply(
            &state,
            Caller::system(),
            JobKind::Installation,
            installation_id,
            action,
            Some(courier.id),
        )
        .await?;
    }

    let balance = payment_service::balance(&state, reservation_id).await?;
    assert_eq!(balance.paid, balance.total);
    assert_eq!(balance.outstanding, Decimal::ZERO);
    let payments = payment_service::list_payments(&state, reservation_id).await?;
    let collected = payments
        .iter()
        .find(|p| p.method == PaymentMethod::Cash)
        .expect("cash payment recorded at installation");
    assert_eq!(collected.status, PaymentStatus::Paid);
    assert_eq!(collected.amount, Decimal::new(37300, 0));

    let still_open = reservation_service::get_reservation(&state, reservation_id).await?;
    assert_eq!(still_open.reservation.status, ReservationStatus::Pending);

    for action in [JobAction::Start, JobAction::Finish] {
        let job = dispatch_service::apply(
            &state,
            Caller::system(),
            JobKind::Pickup,
            pickup_id,
            action,
            Some(courier.id),
        )
        .await?;
        assert!(matches!(job, DispatchedJob::Pickup(_)));
    }

    let done = reservation_service::get_reservation(&state, reservation_id).await?;
    assert_eq!(done.reservation.status, ReservationStatus::Completed);
    assert_eq!(done.pickup.unwrap().status, JobStatus::Done);

    let jobs = dispatch_service::list_jobs_for_courier(&state, courier.id).await?;
    assert!(jobs.installations.is_empty() && jobs.pickups.is_empty());

    Ok(())
}

#[tokio::test]
async fn inactive_couriers_cannot_be_assigned() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Toro", 70000).await?;
    let customer = create_customer(&state).await?;
    let courier = create_courier(&state, "camioneta3").await?;
    user_service::set_courier_status(&state, Caller::system(), courier.id, CourierStatus::Inactive)
        .await?;

    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&game]),
    )
    .await?;
    let err = dispatch_service::assign(
        &state,
        Caller::system(),
        JobKind::Pickup,
        detail.pickup.expect("pickup").id,
        courier.id,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation { field: "courier_id", .. }));

    Ok(())
}

#[tokio::test]
async fn refunds_only_follow_paid() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Piscina", 15000).await?;
    let customer = create_customer(&state).await?;
    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&game]),
    )
    .await?;

    let pending = payment_service::record_payment(
        &state,
        Caller::system(),
        detail.reservation.id,
        RecordPaymentRequest {
            amount: Decimal::new(10000, 0),
            method: PaymentMethod::Card,
            status: PaymentStatus::Pending,
            paid_at: None,
            notes: None,
            receipt_ref: None,
        },
    )
    .await?;
    assert!(pending.paid_at.is_none());

    let err = payment_service::refund(&state, Caller::system(), pending.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { entity: "payment", .. }));

    let paid = payment_service::mark_paid(&state, Caller::system(), pending.id).await?;
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert!(paid.paid_at.is_some());

    let refunded = payment_service::refund(&state, Caller::system(), pending.id).await?;
    assert_eq!(refunded.status, PaymentStatus::Refunded);

    Ok(())
}

#[tokio::test]
async fn jobs_finishing_together_still_complete_the_reservation() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Carrera", 20000).await?;
    let customer = create_customer(&state).await?;

    for _ in 0..10 {
        let detail = reservation_service::create_reservation(
            &state,
            Caller::system(),
            reference_request(customer.id, &[&game]),
        )
        .await?;
        let id = detail.reservation.id;
        let installation_id = detail.installation.expect("installation").id;
        let pickup_id = detail.pickup.expect("pickup").id;

        reservation_service::transition(&state, Caller::system(), id, ReservationAction::Confirm)
            .await?;
        for (kind, job_id) in [
            (JobKind::Installation, installation_id),
            (JobKind::Pickup, pickup_id),
        ] {
            dispatch_service::apply(&state, Caller::system(), kind, job_id, JobAction::Start, None)
                .await?;
        }

        let (installed, picked_up) = tokio::join!(
            dispatch_service::apply(
                &state,
                Caller::system(),
                JobKind::Installation,
                installation_id,
                JobAction::Finish,
                None,
            ),
            dispatch_service::apply(
                &state,
                Caller::system(),
                JobKind::Pickup,
                pickup_id,
                JobAction::Finish,
                None,
            ),
        );
        installed?;
        picked_up?;

        let done = reservation_service::get_reservation(&state, id).await?;
        assert_eq!(done.reservation.status, ReservationStatus::Completed);
    }

    Ok(())
}

#[tokio::test]
async fn other_install_method_books_no_payment() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Laberinto", 30000).await?;
    let customer = create_customer(&state).await?;
    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&game]),
    )
    .await?;
    let reservation_id = detail.reservation.id;
    let installation_id = detail.installation.expect("installation").id;

    dispatch_service::set_installation_payment_method(
        &state,
        Caller::system(),
        installation_id,
        Some(InstallPaymentMethod::Other),
        None,
    )
    .await?;
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

    let payments = payment_service::list_payments(&state, reservation_id).await?;
    assert!(payments.is_empty());
    let balance = payment_service::balance(&state, reservation_id).await?;
    assert_eq!(balance.outstanding, balance.total);

    Ok(())
}

#[tokio::test]
async fn deleting_a_courier_keeps_its_jobs() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Rampa", 25000).await?;
    let customer = create_customer(&state).await?;
    let courier = create_courier(&state, "camioneta4").await?;
    let detail = reservation_service::create_reservation(
        &state,
        Caller::system(),
        reference_request(customer.id, &[&game]),
    )
    .await?;
    let installation_id = detail.installation.expect("installation").id;
    let pickup_id = detail.pickup.expect("pickup").id;

    dispatch_service::assign(&state, Caller::system(), JobKind::Installation, installation_id, courier.id)
        .await?;
    dispatch_service::assign(&state, Caller::system(), JobKind::Pickup, pickup_id, courier.id)
        .await?;

    user_service::delete_courier(&state, Caller::system(), courier.id).await?;

    let installation = Installations::find_by_id(installation_id)
        .one(&state.orm)
        .await?
        .expect("installation survives");
    let pickup = Pickups::find_by_id(pickup_id)
        .one(&state.orm)
        .await?
        .expect("pickup survives");
    assert_eq!(installation.courier_id, None);
    assert_eq!(pickup.courier_id, None);
    assert_eq!(installation.status, JobStatus::Scheduled);

    let gone = user_service::get_courier(&state, courier.id).await.unwrap_err();
    assert!(matches!(gone, AppError::NotFound("courier")));

    Ok(())
}

#[tokio::test]
async fn sweep_marks_unpaid_past_events_overdue() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let game = create_game(&state, "Antiguo", 15000).await?;
    let customer = create_customer(&state).await?;
    let event_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 10).unwrap();

    let mut requests = Vec::new();
    for _ in 0..2 {
        let mut request = reference_request(customer.id, &[&game]);
        request.event_date = event_date;
        requests.push(
            reservation_service::create_reservation(&state, Caller::system(), request).await?,
        );
    }
    let unpaid = &requests[0].reservation;
    let settled = &requests[1].reservation;

    let payment = |amount: i64, status: PaymentStatus| RecordPaymentRequest {
        amount: Decimal::new(amount, 0),
        method: PaymentMethod::Transfer,
        status,
        paid_at: None,
        notes: None,
        receipt_ref: None,
    };
    let late = payment_service::record_payment(
        &state,
        Caller::system(),
        unpaid.id,
        payment(10000, PaymentStatus::Pending),
    )
    .await?;
    payment_service::record_payment(
        &state,
        Caller::system(),
        settled.id,
        payment(27300, PaymentStatus::Paid),
    )
    .await?;
    let extra = payment_service::record_payment(
        &state,
        Caller::system(),
        settled.id,
        payment(1000, PaymentStatus::Pending),
    )
    .await?;

    let cancel = tokio_util::sync::CancellationToken::new();
    let swept = payment_service::sweep_overdue(&state, event_date.succ_opt().unwrap(), &cancel)
        .await?;
    assert!(swept >= 1);

    let statuses = |payments: Vec<inflatable_rentals_api::models::Payment>, id: i32| {
        payments
            .into_iter()
            .find(|p| p.id == id)
            .map(|p| p.status)
    };
    let unpaid_payments = payment_service::list_payments(&state, unpaid.id).await?;
    assert_eq!(statuses(unpaid_payments, late.id), Some(PaymentStatus::Overdue));
    let settled_payments = payment_service::list_payments(&state, settled.id).await?;
    assert_eq!(statuses(settled_payments, extra.id), Some(PaymentStatus::Pending));

    // Overdue payments can still be collected.
    let paid = payment_service::mark_paid(&state, Caller::system(), late.id).await?;
    assert_eq!(paid.status, PaymentStatus::Paid);

    Ok(())
}
