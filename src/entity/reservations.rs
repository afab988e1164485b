use sea_orm::entity::prelude::*;

use super::enums::ReservationStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub customer_id: i32,
    pub event_date: Date,
    pub install_time: Time,
    pub pickup_time: Time,
    pub address: String,
    #[sea_orm(column_type = "Decimal(Some((10, 3)))", nullable)]
    pub distance_km: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub distance_price: Option<Decimal>,
    pub status: ReservationStatus,
    pub notes: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub modified_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customers::Entity",
        from = "Column::CustomerId",
        to = "super::customers::Column::Id",
        on_delete = "Restrict"
    )]
    Customers,
    #[sea_orm(has_many = "super::reservation_lines::Entity")]
    ReservationLines,
    #[sea_orm(has_one = "super::installations::Entity")]
    Installations,
    #[sea_orm(has_one = "super::pickups::Entity")]
    Pickups,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::customers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customers.def()
    }
}

impl Related<super::reservation_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReservationLines.def()
    }
}

impl Related<super::installations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Installations.def()
    }
}

impl Related<super::pickups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pickups.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
