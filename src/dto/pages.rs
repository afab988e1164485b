use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::{dispatch::CourierJobs, games::CatalogGame},
    models::{Courier, Reservation},
};

/// Landing page payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct HomePage {
    pub business: String,
    pub featured: Vec<CatalogGame>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContactInfo {
    pub business: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub maps_api_key: Option<String>,
}

/// `POST /contact` form.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct StatusCounts {
    pub pending: u64,
    pub confirmed: u64,
    pub completed: u64,
    pub cancelled: u64,
}

/// Staff landing data.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub reservations: StatusCounts,
    pub upcoming: Vec<Reservation>,
    pub unassigned_installations: u64,
    pub unassigned_pickups: u64,
    pub overdue_payments: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourierPanel {
    pub courier: Courier,
    pub jobs: CourierJobs,
}
