use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entity::enums::CustomerKind,
    models::{Reservation, ReservationDetail},
};

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ReservationItem {
    pub game_id: i32,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    pub customer_id: i32,
    pub event_date: NaiveDate,
    pub install_time: NaiveTime,
    pub pickup_time: NaiveTime,
    pub address: String,
    pub items: Vec<ReservationItem>,
    pub distance_km: Option<Decimal>,
    pub notes: Option<String>,
}

/// Public booking form: customer details plus the event.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BookingRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub national_id: String,
    pub kind: Option<CustomerKind>,
    pub event_date: NaiveDate,
    pub install_time: NaiveTime,
    pub pickup_time: NaiveTime,
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub items: Vec<ReservationItem>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddLineRequest {
    pub game_id: i32,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationList {
    pub items: Vec<Reservation>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingConfirmation {
    pub reservation: ReservationDetail,
    pub customer_id: i32,
}

/// Counts returned by the job backfill.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct BackfillReport {
    pub installations_created: usize,
    pub pickups_created: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReservationSeedReport {
    pub customers_created: usize,
    pub reservations_created: usize,
    pub failed: usize,
}
