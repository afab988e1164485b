use chrono::NaiveDate;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    ActiveValue::NotSet,
};

use crate::{
    audit,
    domain::pricing::{SeasonalWindow, effective_price as resolve_price, round_money},
    dto::games::{CatalogFeed, CatalogGame, GameRequest, SeasonalPriceRequest},
    entity::{
        Games, ReservationLines, SeasonalPrices,
        enums::{Availability, GameCategory},
        games, reservation_lines, seasonal_prices,
    },
    error::{AppError, AppResult},
    models::{Game, SeasonalPrice},
    response::Meta,
    routes::params::GameQuery,
    services::Caller,
    state::AppState,
};

/// Games with availability=available, optionally narrowed to one category.
pub async fn list_available(
    state: &AppState,
    category: Option<GameCategory>,
) -> AppResult<Vec<Game>> {
    let mut condition = Condition::all().add(games::Column::Availability.eq(Availability::Available));
    if let Some(category) = category {
        condition = condition.add(games::Column::Category.eq(category));
    }

    let items = Games::find()
        .filter(condition)
        .order_by_asc(games::Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Game::from)
        .collect();
    Ok(items)
}

/// The `/api/games` payload.
pub async fn catalog_feed(state: &AppState) -> AppResult<CatalogFeed> {
    let games = list_available(state, None)
        .await?
        .into_iter()
        .map(|game| CatalogGame {
            id: game.id,
            name: game.name,
            category: game.category.as_str().to_string(),
            dimensions: game.dimensions,
            capacity: game.capacity,
            weight_limit: game.weight_limit_kg,
            base_price: game.base_price.to_f64().unwrap_or_default(),
            photo: game.photo,
        })
        .collect();
    Ok(CatalogFeed { games })
}

/// Staff listing of every game, paged and ordered by name.
pub async fn list_all(state: &AppState, query: &GameQuery) -> AppResult<(Vec<Game>, Meta)> {
    let (page, limit, offset) = query.pagination().normalize();
    let (category, availability) = query.filters()?;

    let mut condition = Condition::all();
    if let Some(category) = category {
        condition = condition.add(games::Column::Category.eq(category));
    }
    if let Some(availability) = availability {
        condition = condition.add(games::Column::Availability.eq(availability));
    }

    let finder = Games::find()
        .filter(condition)
        .order_by_asc(games::Column::Name);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Game::from)
        .collect();

    Ok((items, Meta::new(page, limit, total)))
}

pub(crate) async fn find_game<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<games::Model> {
    Games::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("game"))
}

pub async fn get(state: &AppState, id: i32) -> AppResult<Game> {
    Ok(find_game(&state.orm, id).await?.into())
}

fn validate_game(req: &GameRequest) -> AppResult<()> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("name", "must not be empty"));
    }
    if req.capacity <= 0 {
        return Err(AppError::validation("capacity", "must be positive"));
    }
    if req.weight_limit_kg <= 0 {
        return Err(AppError::validation("weight_limit_kg", "must be positive"));
    }
    if req.base_price.is_sign_negative() {
        return Err(AppError::validation("base_price", "must not be negative"));
    }
    Ok(())
}

/// Create a game, or replace every field of game `id`.
pub async fn upsert(
    state: &AppState,
    caller: Caller,
    id: Option<i32>,
    req: GameRequest,
) -> AppResult<Game> {
    validate_game(&req)?;
    let name = req.name.trim().to_string();

    let clash = Games::find()
        .filter(games::Column::Name.eq(name.as_str()))
        .one(&state.orm)
        .await?;
    if let Some(existing) = clash.filter(|existing| Some(existing.id) != id) {
        return Err(AppError::conflict(
            "name",
            format!("game `{}` already exists", existing.name),
        ));
    }

    let game = match id {
        Some(id) => {
            let current = find_game(&state.orm, id).await?;
            let mut active: games::ActiveModel = current.into();
            active.name = Set(name);
            active.description = Set(req.description);
            active.category = Set(req.category);
            active.dimensions = Set(req.dimensions);
            active.capacity = Set(req.capacity);
            active.weight_limit_kg = Set(req.weight_limit_kg);
            active.base_price = Set(round_money(req.base_price));
            active.photo = Set(req.photo);
            if let Some(availability) = req.availability {
                active.availability = Set(availability);
            }
            active.update(&state.orm).await?
        }
        None => {
            games::ActiveModel {
                id: NotSet,
                name: Set(name),
                description: Set(req.description),
                category: Set(req.category),
                dimensions: Set(req.dimensions),
                capacity: Set(req.capacity),
                weight_limit_kg: Set(req.weight_limit_kg),
                base_price: Set(round_money(req.base_price)),
                photo: Set(req.photo),
                availability: Set(req.availability.unwrap_or(Availability::Available)),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await?
        }
    };

    audit::record(
        &state.pool,
        caller.user_id,
        if id.is_some() { "game_update" } else { "game_create" },
        "games",
        serde_json::json!({ "game_id": game.id }),
    )
    .await;
    Ok(game.into())
}

pub async fn set_availability(
    state: &AppState,
    caller: Caller,
    id: i32,
    availability: Availability,
) -> AppResult<Game> {
    let game = find_game(&state.orm, id).await?;
    let mut active: games::ActiveModel = game.into();
    active.availability = Set(availability);
    let game = active.update(&state.orm).await?;

    tracing::info!(game_id = id, availability = availability.as_str(), "game availability changed");
    audit::record(
        &state.pool,
        caller.user_id,
        "game_availability",
        "games",
        serde_json::json!({ "game_id": id, "availability": availability.as_str() }),
    )
    .await;
    Ok(game.into())
}

/// Delete a game that no reservation line references.
pub async fn delete_game(state: &AppState, caller: Caller, id: i32) -> AppResult<()> {
    let game = find_game(&state.orm, id).await?;
    let referenced = ReservationLines::find()
        .filter(reservation_lines::Column::GameId.eq(game.id))
        .count(&state.orm)
        .await?;
    if referenced > 0 {
        return Err(AppError::conflict(
            "game",
            format!("game `{}` is used by {referenced} reservation line(s)", game.name),
        ));
    }

    Games::delete_by_id(game.id).exec(&state.orm).await?;
    audit::record(
        &state.pool,
        caller.user_id,
        "game_delete",
        "games",
        serde_json::json!({ "game_id": id }),
    )
    .await;
    Ok(())
}

fn validate_seasonal(req: &SeasonalPriceRequest) -> AppResult<()> {
    if req.start_date > req.end_date {
        return Err(AppError::validation("end_date", "must not be before start_date"));
    }
    if req.rental_price.is_sign_negative() {
        return Err(AppError::validation("rental_price", "must not be negative"));
    }
    if req.discount_percent < Decimal::ZERO || req.discount_percent > Decimal::ONE_HUNDRED {
        return Err(AppError::validation("discount_percent", "must be between 0 and 100"));
    }
    Ok(())
}

pub async fn add_seasonal_price(
    state: &AppState,
    caller: Caller,
    game_id: i32,
    req: SeasonalPriceRequest,
) -> AppResult<SeasonalPrice> {
    validate_seasonal(&req)?;
    let game = find_game(&state.orm, game_id).await?;

    let duplicate = SeasonalPrices::find()
        .filter(
            Condition::all()
                .add(seasonal_prices::Column::GameId.eq(game.id))
                .add(seasonal_prices::Column::Season.eq(req.season))
                .add(seasonal_prices::Column::StartDate.eq(req.start_date)),
        )
        .one(&state.orm)
        .await?;
    if duplicate.is_some() {
        return Err(AppError::conflict(
            "start_date",
            format!(
                "a {} price starting {} already exists for this game",
                req.season.as_str(),
                req.start_date
            ),
        ));
    }

    let row = seasonal_prices::ActiveModel {
        id: NotSet,
        game_id: Set(game.id),
        season: Set(req.season),
        rental_price: Set(round_money(req.rental_price)),
        start_date: Set(req.start_date),
        end_date: Set(req.end_date),
        discount_percent: Set(round_money(req.discount_percent)),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        caller.user_id,
        "seasonal_price_create",
        "seasonal_prices",
        serde_json::json!({ "seasonal_price_id": row.id, "game_id": game.id }),
    )
    .await;
    Ok(row.into())
}

pub async fn list_seasonal_prices(state: &AppState, game_id: i32) -> AppResult<Vec<SeasonalPrice>> {
    find_game(&state.orm, game_id).await?;
    let items = SeasonalPrices::find()
        .filter(seasonal_prices::Column::GameId.eq(game_id))
        .order_by_asc(seasonal_prices::Column::StartDate)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(SeasonalPrice::from)
        .collect();
    Ok(items)
}

pub async fn delete_seasonal_price(state: &AppState, caller: Caller, id: i32) -> AppResult<()> {
    let result = SeasonalPrices::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("seasonal price"));
    }
    audit::record(
        &state.pool,
        caller.user_id,
        "seasonal_price_delete",
        "seasonal_prices",
        serde_json::json!({ "seasonal_price_id": id }),
    )
    .await;
    Ok(())
}

/// Unit price of `game` on `date`, read through `conn` so callers can stay inside a transaction.
pub(crate) async fn price_on<C: ConnectionTrait>(
    conn: &C,
    game: &games::Model,
    date: NaiveDate,
) -> AppResult<Decimal> {
    let windows: Vec<SeasonalWindow> = SeasonalPrices::find()
        .filter(
            Condition::all()
                .add(seasonal_prices::Column::GameId.eq(game.id))
                .add(seasonal_prices::Column::StartDate.lte(date))
                .add(seasonal_prices::Column::EndDate.gte(date)),
        )
        .all(conn)
        .await?
        .iter()
        .map(SeasonalWindow::from)
        .collect();

    Ok(resolve_price(game.base_price, &windows, date))
}

pub async fn effective_price(state: &AppState, game_id: i32, date: NaiveDate) -> AppResult<Decimal> {
    let game = find_game(&state.orm, game_id).await?;
    price_on(&state.orm, &game, date).await
}
