use sea_orm::entity::prelude::*;

use super::enums::{InstallPaymentMethod, JobStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "installations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub reservation_id: i32,
    pub courier_id: Option<i32>,
    pub install_date: Date,
    pub install_time: Time,
    pub address: String,
    pub client_phone: String,
    pub status: JobStatus,
    pub notes: String,
    pub payment_method: Option<InstallPaymentMethod>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::reservations::Entity",
        from = "Column::ReservationId",
        to = "super::reservations::Column::Id",
        on_delete = "Cascade"
    )]
    Reservations,
    #[sea_orm(
        belongs_to = "super::couriers::Entity",
        from = "Column::CourierId",
        to = "super::couriers::Column::Id",
        on_delete = "SetNull"
    )]
    Couriers,
}

impl Related<super::reservations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl Related<super::couriers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Couriers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
