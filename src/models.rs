use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{
    couriers, customers,
    enums::{
        Availability, CourierStatus, CustomerKind, GameCategory, InstallPaymentMethod, JobStatus,
        PaymentMethod, PaymentStatus, ReservationStatus, Role, Season,
    },
    games, installations, payments, pickups, reservation_lines, reservations, seasonal_prices,
    users,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub login: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            login: model.login,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            phone: model.phone,
            role: model.role,
            is_active: model.is_active,
            is_superuser: model.is_superuser,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub id: i32,
    pub national_id: String,
    pub kind: CustomerKind,
    pub user: User,
}

impl Customer {
    pub fn from_parts(profile: customers::Model, user: users::Model) -> Self {
        Self {
            id: profile.id,
            national_id: profile.national_id,
            kind: profile.kind,
            user: user.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Courier {
    pub id: i32,
    pub license_number: Option<String>,
    pub vehicle: Option<String>,
    pub status: CourierStatus,
    pub user: User,
}

impl Courier {
    pub fn from_parts(profile: couriers::Model, user: users::Model) -> Self {
        Self {
            id: profile.id,
            license_number: profile.license_number,
            vehicle: profile.vehicle,
            status: profile.status,
            user: user.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Game {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category: GameCategory,
    pub dimensions: String,
    pub capacity: i32,
    pub weight_limit_kg: i32,
    pub base_price: Decimal,
    pub photo: Option<String>,
    pub availability: Availability,
}

impl From<games::Model> for Game {
    fn from(model: games::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            category: model.category,
            dimensions: model.dimensions,
            capacity: model.capacity,
            weight_limit_kg: model.weight_limit_kg,
            base_price: model.base_price,
            photo: model.photo,
            availability: model.availability,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SeasonalPrice {
    pub id: i32,
    pub game_id: i32,
    pub season: Season,
    pub rental_price: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub discount_percent: Decimal,
}

impl From<seasonal_prices::Model> for SeasonalPrice {
    fn from(model: seasonal_prices::Model) -> Self {
        Self {
            id: model.id,
            game_id: model.game_id,
            season: model.season,
            rental_price: model.rental_price,
            start_date: model.start_date,
            end_date: model.end_date,
            discount_percent: model.discount_percent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub customer_id: i32,
    pub event_date: NaiveDate,
    pub install_time: NaiveTime,
    pub pickup_time: NaiveTime,
    pub address: String,
    pub distance_km: Option<Decimal>,
    pub distance_price: Option<Decimal>,
    pub status: ReservationStatus,
    pub notes: String,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl From<reservations::Model> for Reservation {
    fn from(model: reservations::Model) -> Self {
        Self {
            id: model.id,
            customer_id: model.customer_id,
            event_date: model.event_date,
            install_time: model.install_time,
            pickup_time: model.pickup_time,
            address: model.address,
            distance_km: model.distance_km,
            distance_price: model.distance_price,
            status: model.status,
            notes: model.notes,
            total: model.total,
            created_at: model.created_at.with_timezone(&Utc),
            modified_at: model.modified_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationLine {
    pub id: i32,
    pub reservation_id: i32,
    pub game_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl From<reservation_lines::Model> for ReservationLine {
    fn from(model: reservation_lines::Model) -> Self {
        Self {
            id: model.id,
            reservation_id: model.reservation_id,
            game_id: model.game_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            subtotal: model.subtotal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Installation {
    pub id: i32,
    pub reservation_id: i32,
    pub courier_id: Option<i32>,
    pub install_date: NaiveDate,
    pub install_time: NaiveTime,
    pub address: String,
    pub client_phone: String,
    pub status: JobStatus,
    pub notes: String,
    pub payment_method: Option<InstallPaymentMethod>,
}

impl From<installations::Model> for Installation {
    fn from(model: installations::Model) -> Self {
        Self {
            id: model.id,
            reservation_id: model.reservation_id,
            courier_id: model.courier_id,
            install_date: model.install_date,
            install_time: model.install_time,
            address: model.address,
            client_phone: model.client_phone,
            status: model.status,
            notes: model.notes,
            payment_method: model.payment_method,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Pickup {
    pub id: i32,
    pub reservation_id: i32,
    pub courier_id: Option<i32>,
    pub pickup_date: NaiveDate,
    pub pickup_time: NaiveTime,
    pub status: JobStatus,
    pub notes: String,
}

impl From<pickups::Model> for Pickup {
    fn from(model: pickups::Model) -> Self {
        Self {
            id: model.id,
            reservation_id: model.reservation_id,
            courier_id: model.courier_id,
            pickup_date: model.pickup_date,
            pickup_time: model.pickup_time,
            status: model.status,
            notes: model.notes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: i32,
    pub reservation_id: i32,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub receipt_ref: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl From<payments::Model> for Payment {
    fn from(model: payments::Model) -> Self {
        Self {
            id: model.id,
            reservation_id: model.reservation_id,
            amount: model.amount,
            method: model.method,
            status: model.status,
            paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
            receipt_ref: model.receipt_ref,
            notes: model.notes,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// A reservation with everything it owns.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationDetail {
    pub reservation: Reservation,
    pub lines: Vec<ReservationLine>,
    pub installation: Option<Installation>,
    pub pickup: Option<Pickup>,
    pub payments: Vec<Payment>,
}
