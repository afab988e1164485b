use sea_orm::entity::prelude::*;

use super::enums::CourierStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "couriers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub license_number: Option<String>,
    pub vehicle: Option<String>,
    pub status: CourierStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(has_many = "super::installations::Entity")]
    Installations,
    #[sea_orm(has_many = "super::pickups::Entity")]
    Pickups,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
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

impl Model {
    /// Only couriers that are free or already out driving take new jobs.
    pub fn accepts_jobs(&self) -> bool {
        matches!(
            self.status,
            CourierStatus::Available | CourierStatus::OnRoute
        )
    }
}

impl ActiveModelBehavior for ActiveModel {}
