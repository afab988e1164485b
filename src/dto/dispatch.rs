use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entity::enums::InstallPaymentMethod,
    models::{Installation, Pickup},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignCourierRequest {
    pub courier_id: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentMethodRequest {
    pub payment_method: Option<InstallPaymentMethod>,
}

/// Open jobs for one courier.
#[derive(Debug, Serialize, ToSchema)]
pub struct CourierJobs {
    pub installations: Vec<Installation>,
    pub pickups: Vec<Pickup>,
}

/// An installation or pickup after a dispatch operation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchedJob {
    Installation(Installation),
    Pickup(Pickup),
}
