use sea_orm::entity::prelude::*;

use super::enums::{Availability, GameCategory};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "games")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub description: String,
    pub category: GameCategory,
    pub dimensions: String,
    pub capacity: i32,
    pub weight_limit_kg: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub base_price: Decimal,
    pub photo: Option<String>,
    pub availability: Availability,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::seasonal_prices::Entity")]
    SeasonalPrices,
    #[sea_orm(has_many = "super::reservation_lines::Entity")]
    ReservationLines,
}

impl Related<super::seasonal_prices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeasonalPrices.def()
    }
}

impl Related<super::reservation_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReservationLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
