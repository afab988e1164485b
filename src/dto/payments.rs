use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entity::enums::{PaymentMethod, PaymentStatus},
    models::Payment,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub receipt_ref: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentList {
    pub items: Vec<Payment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Balance {
    pub reservation_id: i32,
    pub total: Decimal,
    pub paid: Decimal,
    pub outstanding: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct SweepReport {
    pub swept: usize,
}
