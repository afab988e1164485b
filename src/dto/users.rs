use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entity::enums::{CourierStatus, CustomerKind, Role},
    models::{Courier, Customer},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub login: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateCustomerRequest {
    pub login: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub national_id: String,
    pub kind: CustomerKind,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateCourierRequest {
    pub login: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub vehicle: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CourierStatusRequest {
    pub status: CourierStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerList {
    pub items: Vec<Customer>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourierList {
    pub items: Vec<Courier>,
}
