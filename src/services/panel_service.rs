use sea_orm::{ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::{
    audit,
    dto::pages::{AdminDashboard, ContactForm, ContactInfo, CourierPanel, HomePage, StatusCounts},
    entity::{
        Installations, Payments, Pickups, Reservations,
        enums::{JobStatus, PaymentStatus, ReservationStatus},
        installations, payments, pickups, reservations,
    },
    error::{AppError, AppResult},
    services::{catalog_service, dispatch_service, reservation_service, user_service},
    state::AppState,
};

pub const BUSINESS_NAME: &str = "Inflables Osorno";
const FEATURED_GAMES: usize = 6;
const UPCOMING_LIMIT: u64 = 10;

pub async fn home(state: &AppState) -> AppResult<HomePage> {
    let mut feed = catalog_service::catalog_feed(state).await?;
    feed.games.truncate(FEATURED_GAMES);
    Ok(HomePage {
        business: BUSINESS_NAME.to_string(),
        featured: feed.games,
    })
}

pub fn contact(state: &AppState) -> ContactInfo {
    ContactInfo {
        business: BUSINESS_NAME.to_string(),
        city: "Osorno".to_string(),
        phone: "+56 9 4000 0000".to_string(),
        email: "contacto@inflablesosorno.cl".to_string(),
        maps_api_key: state.config.maps_api_key.clone(),
    }
}

/// Accept a contact message; it lands in the audit log for staff to follow up.
pub async fn submit_contact(state: &AppState, form: ContactForm) -> AppResult<()> {
    let name = form.name.trim();
    let email = form.email.trim().to_lowercase();
    let message = form.message.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "is required"));
    }
    if !email.contains('@') {
        return Err(AppError::validation("email", "is not a valid address"));
    }
    if message.is_empty() {
        return Err(AppError::validation("message", "is required"));
    }

    tracing::info!(%email, "contact message received");
    audit::record(
        &state.pool,
        None,
        "contact_message",
        "contact",
        serde_json::json!({
            "name": name,
            "email": email,
            "phone": form.phone,
            "message": message,
        }),
    )
    .await;
    Ok(())
}

async fn count_status(state: &AppState, status: ReservationStatus) -> AppResult<u64> {
    Ok(Reservations::find()
        .filter(reservations::Column::Status.eq(status))
        .count(&state.orm)
        .await?)
}

pub async fn admin_dashboard(state: &AppState) -> AppResult<AdminDashboard> {
    let counts = StatusCounts {
        pending: count_status(state, ReservationStatus::Pending).await?,
        confirmed: count_status(state, ReservationStatus::Confirmed).await?,
        completed: count_status(state, ReservationStatus::Completed).await?,
        cancelled: count_status(state, ReservationStatus::Cancelled).await?,
    };

    let upcoming = Reservations::find()
        .filter(
            Condition::all()
                .add(reservations::Column::EventDate.gte(reservation_service::today()))
                .add(
                    reservations::Column::Status
                        .is_in([ReservationStatus::Pending, ReservationStatus::Confirmed]),
                ),
        )
        .order_by_asc(reservations::Column::EventDate)
        .order_by_asc(reservations::Column::InstallTime)
        .limit(UPCOMING_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let unassigned_installations = Installations::find()
        .filter(
            Condition::all()
                .add(installations::Column::CourierId.is_null())
                .add(installations::Column::Status.eq(JobStatus::Scheduled)),
        )
        .count(&state.orm)
        .await?;
    let unassigned_pickups = Pickups::find()
        .filter(
            Condition::all()
                .add(pickups::Column::CourierId.is_null())
                .add(pickups::Column::Status.eq(JobStatus::Scheduled)),
        )
        .count(&state.orm)
        .await?;
    let overdue_payments = Payments::find()
        .filter(payments::Column::Status.eq(PaymentStatus::Overdue))
        .count(&state.orm)
        .await?;

    Ok(AdminDashboard {
        reservations: counts,
        upcoming,
        unassigned_installations,
        unassigned_pickups,
        overdue_payments,
    })
}

/// The signed-in courier's profile and open jobs.
pub async fn courier_panel(state: &AppState, user_id: i32) -> AppResult<CourierPanel> {
    let profile = user_service::courier_for_user(state, user_id).await?;
    let courier = user_service::get_courier(state, profile.id).await?;
    let jobs = dispatch_service::list_jobs_for_courier(state, profile.id).await?;
    Ok(CourierPanel { courier, jobs })
}
