use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};

use crate::{
    audit,
    domain::lifecycle::JobAction,
    dto::dispatch::{CourierJobs, DispatchedJob},
    entity::{
        Couriers, Installations, Pickups,
        enums::{InstallPaymentMethod, JobStatus, PaymentStatus},
        installations, pickups, reservations,
    },
    error::{AppError, AppResult},
    services::{
        Caller,
        payment_service::{self, NewPayment},
        reservation_service,
    },
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Installation,
    Pickup,
}

impl JobKind {
    pub fn entity(self) -> &'static str {
        match self {
            JobKind::Installation => "installation",
            JobKind::Pickup => "pickup",
        }
    }
}

/// The fields dispatch rules look at, whichever kind of job it is.
#[derive(Debug, Clone, Copy)]
struct JobHead {
    id: i32,
    reservation_id: i32,
    courier_id: Option<i32>,
    status: JobStatus,
    payment_method: Option<InstallPaymentMethod>,
}

async fn lock_job<C: ConnectionTrait>(conn: &C, kind: JobKind, id: i32) -> AppResult<JobHead> {
    match kind {
        JobKind::Installation => Installations::find_by_id(id)
            .lock(LockType::Update)
            .one(conn)
            .await?
            .map(|job| JobHead {
                id: job.id,
                reservation_id: job.reservation_id,
                courier_id: job.courier_id,
                status: job.status,
                payment_method: job.payment_method,
            })
            .ok_or(AppError::NotFound("installation")),
        JobKind::Pickup => Pickups::find_by_id(id)
            .lock(LockType::Update)
            .one(conn)
            .await?
            .map(|job| JobHead {
                id: job.id,
                reservation_id: job.reservation_id,
                courier_id: job.courier_id,
                status: job.status,
                payment_method: None,
            })
            .ok_or(AppError::NotFound("pickup")),
    }
}

async fn job_reservation_id<C: ConnectionTrait>(conn: &C, kind: JobKind, id: i32) -> AppResult<i32> {
    match kind {
        JobKind::Installation => Installations::find_by_id(id)
            .one(conn)
            .await?
            .map(|job| job.reservation_id)
            .ok_or(AppError::NotFound("installation")),
        JobKind::Pickup => Pickups::find_by_id(id)
            .one(conn)
            .await?
            .map(|job| job.reservation_id)
            .ok_or(AppError::NotFound("pickup")),
    }
}

/// Lock the owning reservation, then the job. Writers always lock the reservation row first.
async fn lock_aggregate<C: ConnectionTrait>(
    conn: &C,
    kind: JobKind,
    id: i32,
) -> AppResult<(reservations::Model, JobHead)> {
    let reservation_id = job_reservation_id(conn, kind, id).await?;
    let reservation = reservation_service::lock_reservation(conn, reservation_id).await?;
    let job = lock_job(conn, kind, id).await?;
    Ok((reservation, job))
}

/// Changes to write back to a job row.
#[derive(Debug, Default, Clone, Copy)]
struct JobPatch {
    courier_id: Option<Option<i32>>,
    status: Option<JobStatus>,
    payment_method: Option<Option<InstallPaymentMethod>>,
}

async fn save_job<C: ConnectionTrait>(
    conn: &C,
    kind: JobKind,
    id: i32,
    patch: JobPatch,
) -> AppResult<DispatchedJob> {
    match kind {
        JobKind::Installation => {
            let job = Installations::find_by_id(id)
                .one(conn)
                .await?
                .ok_or(AppError::NotFound("installation"))?;
            let mut active: installations::ActiveModel = job.into();
            if let Some(courier_id) = patch.courier_id {
                active.courier_id = Set(courier_id);
            }
            if let Some(status) = patch.status {
                active.status = Set(status);
            }
            if let Some(method) = patch.payment_method {
                active.payment_method = Set(method);
            }
            Ok(DispatchedJob::Installation(active.update(conn).await?.into()))
        }
        JobKind::Pickup => {
            let job = Pickups::find_by_id(id)
                .one(conn)
                .await?
                .ok_or(AppError::NotFound("pickup"))?;
            let mut active: pickups::ActiveModel = job.into();
            if let Some(courier_id) = patch.courier_id {
                active.courier_id = Set(courier_id);
            }
            if let Some(status) = patch.status {
                active.status = Set(status);
            }
            Ok(DispatchedJob::Pickup(active.update(conn).await?.into()))
        }
    }
}

/// Couriers act only on jobs assigned to them; staff (`None`) act on any.
fn ensure_scope(job: &JobHead, courier_scope: Option<i32>) -> AppResult<()> {
    match courier_scope {
        Some(courier_id) if job.courier_id != Some(courier_id) => Err(AppError::Forbidden),
        _ => Ok(()),
    }
}

fn ensure_open(kind: JobKind, job: &JobHead) -> AppResult<()> {
    if job.status.is_terminal() {
        return Err(AppError::conflict(
            "status",
            format!("{} {} is {}", kind.entity(), job.id, job.status.as_str()),
        ));
    }
    Ok(())
}

/// Put a courier on a job. Status is left as is.
pub async fn assign(
    state: &AppState,
    caller: Caller,
    kind: JobKind,
    id: i32,
    courier_id: i32,
) -> AppResult<DispatchedJob> {
    let txn = state.orm.begin().await?;
    let (_, job) = lock_aggregate(&txn, kind, id).await?;
    ensure_open(kind, &job)?;

    let courier = Couriers::find_by_id(courier_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("courier"))?;
    if !courier.accepts_jobs() {
        return Err(AppError::validation(
            "courier_id",
            format!("courier is {} and cannot take jobs", courier.status.as_str()),
        ));
    }

    let updated = save_job(
        &txn,
        kind,
        id,
        JobPatch {
            courier_id: Some(Some(courier.id)),
            ..Default::default()
        },
    )
    .await?;
    txn.commit().await?;

    tracing::info!(job = kind.entity(), job_id = id, courier_id, "courier assigned");
    audit::record(
        &state.pool,
        caller.user_id,
        "job_assign",
        kind.entity(),
        serde_json::json!({ "job_id": id, "courier_id": courier_id }),
    )
    .await;
    Ok(updated)
}

/// Record the implicit payment for a finished installation: the outstanding balance, if any.
async fn settle_on_install<C: ConnectionTrait>(
    conn: &C,
    reservation: &reservations::Model,
    job: &JobHead,
) -> AppResult<Option<i32>> {
    let Some(recorded) = job.payment_method else {
        return Ok(None);
    };
    let Some(method) = recorded.payment_method() else {
        tracing::warn!(
            installation_id = job.id,
            reservation_id = reservation.id,
            recorded = recorded.as_str(),
            "installation finished with an unbookable payment method; no payment recorded"
        );
        return Ok(None);
    };

    let outstanding = reservation.total - payment_service::paid_total(conn, reservation.id).await?;
    if outstanding <= Decimal::ZERO {
        return Ok(None);
    }

    let payment = payment_service::insert_payment(
        conn,
        NewPayment {
            reservation_id: reservation.id,
            amount: outstanding,
            method,
            status: PaymentStatus::Paid,
            paid_at: Some(Utc::now()),
            receipt_ref: None,
            notes: format!("collected at installation {}", job.id),
        },
    )
    .await?;
    Ok(Some(payment.id))
}

/// Move a job along its state machine.
///
/// Finishing an installation records its payment; finishing the second of a
/// reservation's two jobs completes the reservation.
pub async fn apply(
    state: &AppState,
    caller: Caller,
    kind: JobKind,
    id: i32,
    action: JobAction,
    courier_scope: Option<i32>,
) -> AppResult<DispatchedJob> {
    let txn = state.orm.begin().await?;
    let (reservation, job) = lock_aggregate(&txn, kind, id).await?;
    ensure_scope(&job, courier_scope)?;

    let from = job.status;
    let next = from.transition(kind.entity(), action.target())?;
    let updated = save_job(
        &txn,
        kind,
        id,
        JobPatch {
            status: Some(next),
            ..Default::default()
        },
    )
    .await?;

    let mut payment_id = None;
    let mut completed = false;
    if next == JobStatus::Done {
        if kind == JobKind::Installation {
            payment_id = settle_on_install(&txn, &reservation, &job).await?;
        }
        completed = reservation_service::complete_if_jobs_done(&txn, job.reservation_id).await?;
    }
    txn.commit().await?;

    tracing::info!(
        job = kind.entity(),
        job_id = id,
        from = from.as_str(),
        to = next.as_str(),
        reservation_completed = completed,
        "job status changed"
    );
    audit::record(
        &state.pool,
        caller.user_id,
        "job_status",
        kind.entity(),
        serde_json::json!({
            "job_id": id,
            "from": from.as_str(),
            "to": next.as_str(),
            "payment_id": payment_id,
            "reservation_completed": completed,
        }),
    )
    .await;
    Ok(updated)
}

/// Note how the client will pay at installation; `None` clears it.
pub async fn set_installation_payment_method(
    state: &AppState,
    caller: Caller,
    id: i32,
    method: Option<InstallPaymentMethod>,
    courier_scope: Option<i32>,
) -> AppResult<DispatchedJob> {
    let txn = state.orm.begin().await?;
    let (_, job) = lock_aggregate(&txn, JobKind::Installation, id).await?;
    ensure_scope(&job, courier_scope)?;
    ensure_open(JobKind::Installation, &job)?;

    let updated = save_job(
        &txn,
        JobKind::Installation,
        id,
        JobPatch {
            payment_method: Some(method),
            ..Default::default()
        },
    )
    .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        caller.user_id,
        "installation_payment_method",
        "installations",
        serde_json::json!({ "job_id": id, "payment_method": method.map(|m| m.as_str()) }),
    )
    .await;
    Ok(updated)
}

fn open_statuses() -> [JobStatus; 2] {
    [JobStatus::Scheduled, JobStatus::Pending]
}

/// A courier's non-terminal jobs in date/time order.
pub async fn list_jobs_for_courier(state: &AppState, courier_id: i32) -> AppResult<CourierJobs> {
    let installations = Installations::find()
        .filter(
            Condition::all()
                .add(installations::Column::CourierId.eq(courier_id))
                .add(installations::Column::Status.is_in(open_statuses())),
        )
        .order_by_asc(installations::Column::InstallDate)
        .order_by_asc(installations::Column::InstallTime)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let pickups = Pickups::find()
        .filter(
            Condition::all()
                .add(pickups::Column::CourierId.eq(courier_id))
                .add(pickups::Column::Status.is_in(open_statuses())),
        )
        .order_by_asc(pickups::Column::PickupDate)
        .order_by_asc(pickups::Column::PickupTime)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(CourierJobs {
        installations,
        pickups,
    })
}

/// Every non-terminal job, assigned or not, for the staff board.
pub async fn list_open_jobs(state: &AppState) -> AppResult<CourierJobs> {
    let installations = Installations::find()
        .filter(installations::Column::Status.is_in(open_statuses()))
        .order_by_asc(installations::Column::InstallDate)
        .order_by_asc(installations::Column::InstallTime)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let pickups = Pickups::find()
        .filter(pickups::Column::Status.is_in(open_statuses()))
        .order_by_asc(pickups::Column::PickupDate)
        .order_by_asc(pickups::Column::PickupTime)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(CourierJobs {
        installations,
        pickups,
    })
}
