use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
    ActiveValue::NotSet, sea_query::LockType,
};
use tokio_util::sync::CancellationToken;

use crate::{
    audit,
    domain::pricing::round_money,
    dto::payments::{Balance, RecordPaymentRequest},
    entity::{
        Payments, Reservations,
        enums::{PaymentMethod, PaymentStatus},
        payments, reservations,
    },
    error::{AppError, AppResult},
    models::Payment,
    services::Caller,
    state::AppState,
};

/// A payment about to be written.
#[derive(Debug, Clone)]
pub(crate) struct NewPayment {
    pub reservation_id: i32,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub receipt_ref: Option<String>,
    pub notes: String,
}

/// `paid_at` for a new payment: paid ones default to now.
fn resolve_paid_at(status: PaymentStatus, supplied: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (status, supplied) {
        (_, Some(at)) => Some(at),
        (PaymentStatus::Paid, None) => Some(Utc::now()),
        _ => None,
    }
}

pub(crate) async fn insert_payment<C: ConnectionTrait>(
    conn: &C,
    new: NewPayment,
) -> AppResult<payments::Model> {
    if new.amount <= Decimal::ZERO {
        return Err(AppError::validation("amount", "must be greater than zero"));
    }

    let row = payments::ActiveModel {
        id: NotSet,
        reservation_id: Set(new.reservation_id),
        amount: Set(round_money(new.amount)),
        method: Set(new.method),
        status: Set(new.status),
        paid_at: Set(resolve_paid_at(new.status, new.paid_at).map(Into::into)),
        receipt_ref: Set(new.receipt_ref.filter(|r| !r.trim().is_empty())),
        notes: Set(new.notes),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(row)
}

/// Sum of paid amounts on a reservation.
pub(crate) async fn paid_total<C: ConnectionTrait>(conn: &C, reservation_id: i32) -> AppResult<Decimal> {
    let paid = Payments::find()
        .filter(
            Condition::all()
                .add(payments::Column::ReservationId.eq(reservation_id))
                .add(payments::Column::Status.eq(PaymentStatus::Paid)),
        )
        .all(conn)
        .await?
        .into_iter()
        .map(|p| p.amount)
        .sum();
    Ok(paid)
}

async fn find_reservation<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<reservations::Model> {
    Reservations::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("reservation"))
}

pub async fn record_payment(
    state: &AppState,
    caller: Caller,
    reservation_id: i32,
    req: RecordPaymentRequest,
) -> AppResult<Payment> {
    let reservation = find_reservation(&state.orm, reservation_id).await?;
    let payment = insert_payment(
        &state.orm,
        NewPayment {
            reservation_id: reservation.id,
            amount: req.amount,
            method: req.method,
            status: req.status,
            paid_at: req.paid_at,
            receipt_ref: req.receipt_ref,
            notes: req.notes.unwrap_or_default(),
        },
    )
    .await?;

    tracing::info!(
        payment_id = payment.id,
        reservation_id,
        amount = %payment.amount,
        status = payment.status.as_str(),
        "payment recorded"
    );
    audit::record(
        &state.pool,
        caller.user_id,
        "payment_record",
        "payments",
        serde_json::json!({ "payment_id": payment.id, "reservation_id": reservation_id }),
    )
    .await;
    Ok(payment.into())
}

async fn move_payment(
    state: &AppState,
    caller: Caller,
    payment_id: i32,
    next: PaymentStatus,
) -> AppResult<Payment> {
    let txn = state.orm.begin().await?;
    let payment = Payments::find_by_id(payment_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("payment"))?;

    let from = payment.status;
    let next = from.transition(next)?;
    let mut active: payments::ActiveModel = payment.into();
    active.status = Set(next);
    if next == PaymentStatus::Paid {
        active.paid_at = Set(Some(Utc::now().into()));
    }
    let payment = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(payment_id, from = from.as_str(), to = next.as_str(), "payment status changed");
    audit::record(
        &state.pool,
        caller.user_id,
        "payment_status",
        "payments",
        serde_json::json!({ "payment_id": payment_id, "from": from.as_str(), "to": next.as_str() }),
    )
    .await;
    Ok(payment.into())
}

/// paid → refunded.
pub async fn refund(state: &AppState, caller: Caller, payment_id: i32) -> AppResult<Payment> {
    move_payment(state, caller, payment_id, PaymentStatus::Refunded).await
}

/// pending | overdue → paid, stamping `paid_at`.
pub async fn mark_paid(state: &AppState, caller: Caller, payment_id: i32) -> AppResult<Payment> {
    move_payment(state, caller, payment_id, PaymentStatus::Paid).await
}

pub async fn list_payments(state: &AppState, reservation_id: i32) -> AppResult<Vec<Payment>> {
    find_reservation(&state.orm, reservation_id).await?;
    let items = Payments::find()
        .filter(payments::Column::ReservationId.eq(reservation_id))
        .order_by_asc(payments::Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Payment::from)
        .collect();
    Ok(items)
}

pub async fn balance(state: &AppState, reservation_id: i32) -> AppResult<Balance> {
    let reservation = find_reservation(&state.orm, reservation_id).await?;
    let paid = paid_total(&state.orm, reservation_id).await?;
    Ok(Balance {
        reservation_id,
        total: reservation.total,
        paid,
        outstanding: round_money(reservation.total - paid),
    })
}

/// Mark pending payments overdue on reservations whose event has passed without full payment.
///
/// Runs as one transaction; cancellation stops between reservations and keeps what was swept.
pub async fn sweep_overdue(
    state: &AppState,
    today: NaiveDate,
    cancel: &CancellationToken,
) -> AppResult<usize> {
    let txn = state.orm.begin().await?;
    let rows = Payments::find()
        .find_also_related(Reservations)
        .filter(
            Condition::all()
                .add(payments::Column::Status.eq(PaymentStatus::Pending))
                .add(reservations::Column::EventDate.lt(today)),
        )
        .order_by_asc(payments::Column::Id)
        .all(&txn)
        .await?;

    let mut by_reservation: BTreeMap<i32, (Decimal, Vec<payments::Model>)> = BTreeMap::new();
    for (payment, reservation) in rows {
        if let Some(reservation) = reservation {
            by_reservation
                .entry(reservation.id)
                .or_insert_with(|| (reservation.total, Vec::new()))
                .1
                .push(payment);
        }
    }

    let mut swept = 0usize;
    for (reservation_id, (total, pending)) in by_reservation {
        if cancel.is_cancelled() {
            tracing::warn!(reservation_id, "overdue sweep cancelled");
            break;
        }
        if paid_total(&txn, reservation_id).await? >= total {
            continue;
        }
        for payment in pending {
            let mut active: payments::ActiveModel = payment.into();
            active.status = Set(PaymentStatus::Pending.transition(PaymentStatus::Overdue)?);
            active.update(&txn).await?;
            swept += 1;
        }
    }
    txn.commit().await?;

    tracing::info!(swept, %today, "overdue sweep finished");
    Ok(swept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_payments_default_paid_at_to_now() {
        let before = Utc::now();
        let at = resolve_paid_at(PaymentStatus::Paid, None).unwrap();
        assert!(at >= before);
    }

    #[test]
    fn supplied_paid_at_wins_and_pending_stays_empty() {
        let supplied = DateTime::parse_from_rfc3339("2025-12-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(resolve_paid_at(PaymentStatus::Paid, Some(supplied)), Some(supplied));
        assert_eq!(resolve_paid_at(PaymentStatus::Pending, None), None);
    }
}
