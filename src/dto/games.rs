use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entity::enums::{Availability, GameCategory, Season},
    models::{Game, SeasonalPrice},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GameRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: GameCategory,
    #[serde(default)]
    pub dimensions: String,
    pub capacity: i32,
    pub weight_limit_kg: i32,
    pub base_price: Decimal,
    pub photo: Option<String>,
    pub availability: Option<Availability>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityRequest {
    pub availability: Availability,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SeasonalPriceRequest {
    pub season: Season,
    pub rental_price: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub discount_percent: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GameList {
    pub items: Vec<Game>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeasonalPriceList {
    pub items: Vec<SeasonalPrice>,
}

/// One entry of the public `/api/games` feed.
#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogGame {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub dimensions: String,
    pub capacity: i32,
    pub weight_limit: i32,
    pub base_price: f64,
    pub photo: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogFeed {
    pub games: Vec<CatalogGame>,
}

/// Outcome of a catalog seeding run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SeedReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Unit price a game would be booked at on `date`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EffectivePrice {
    pub game_id: i32,
    pub date: NaiveDate,
    pub price: Decimal,
}
