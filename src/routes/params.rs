use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    entity::enums::{Availability, GameCategory, ReservationStatus},
    error::{AppError, AppResult},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Parse an optional, case-insensitive status token from a query string.
pub fn parse_token<T>(field: &'static str, raw: Option<&String>) -> AppResult<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    match raw.map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|message| AppError::validation(field, message)),
        None => Ok(None),
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

impl CatalogQuery {
    pub fn category(&self) -> AppResult<Option<GameCategory>> {
        parse_token("category", self.category.as_ref())
    }
}

// Query structs repeat `page`/`per_page` instead of flattening `Pagination`:
// urlencoded values reach flattened fields as strings and fail to parse as numbers.

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GameQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub category: Option<String>,
    pub availability: Option<String>,
}

impl GameQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn filters(&self) -> AppResult<(Option<GameCategory>, Option<Availability>)> {
        Ok((
            parse_token("category", self.category.as_ref())?,
            parse_token("availability", self.availability.as_ref())?,
        ))
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReservationListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    pub customer_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sort_order: Option<SortOrder>,
}

impl ReservationListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn status(&self) -> AppResult<Option<ReservationStatus>> {
        parse_token("status", self.status.as_ref())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CustomerQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
}

impl CustomerQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}
