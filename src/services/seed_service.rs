//! Catalog seeding, demo reservations and other operator batch jobs.

use chrono::{Duration, NaiveTime};
use rand::{Rng, rngs::StdRng, seq::SliceRandom};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    IsolationLevel, QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{
        geo::{BUSINESS_ORIGIN, sample_point_near},
        national_id,
    },
    dto::{
        games::SeedReport,
        reservations::{CreateReservationRequest, ReservationItem, ReservationSeedReport},
        users::CreateCustomerRequest,
    },
    entity::{
        Games, Installations, Pickups,
        enums::{Availability, CustomerKind, GameCategory, JobStatus, ReservationStatus},
        games, installations, pickups,
    },
    error::{AppError, AppResult},
    services::{Caller, reservation_service, user_service},
    state::AppState,
};

/// Password every courier gets from `reset_courier_passwords`.
pub const COURIER_RESET_PASSWORD: &str = "repartidor123";

/// Radius around the warehouse for generated event addresses.
pub const SEED_RADIUS_KM: f64 = 30.0;

#[derive(Debug, Clone, Copy)]
pub struct GameSeed {
    pub name: &'static str,
    pub description: &'static str,
    pub category: GameCategory,
    pub dimensions: &'static str,
    pub capacity: i32,
    pub weight_limit_kg: i32,
    pub base_price: i64,
}

pub const DEFAULT_GAMES: &[GameSeed] = &[
    GameSeed {
        name: "Juego 3en1",
        description: "Castillo con tobogán y muro de escalada",
        category: GameCategory::Combo,
        dimensions: "5x4x3.5 m",
        capacity: 10,
        weight_limit_kg: 400,
        base_price: 30000,
    },
    GameSeed {
        name: "Juego Block",
        description: "Bloques gigantes con obstáculos interiores",
        category: GameCategory::Obstacle,
        dimensions: "6x4x3 m",
        capacity: 12,
        weight_limit_kg: 450,
        base_price: 35000,
    },
    GameSeed {
        name: "Castillo Princesa",
        description: "Castillo clásico con techo",
        category: GameCategory::Castle,
        dimensions: "4x4x3 m",
        capacity: 8,
        weight_limit_kg: 300,
        base_price: 25000,
    },
    GameSeed {
        name: "Tobogán Tropical",
        description: "Tobogán doble de 5 metros",
        category: GameCategory::Slide,
        dimensions: "7x3x5 m",
        capacity: 6,
        weight_limit_kg: 350,
        base_price: 40000,
    },
    GameSeed {
        name: "Mini Zoo",
        description: "Inflable pequeño para los más chicos",
        category: GameCategory::Kids,
        dimensions: "3x3x2 m",
        capacity: 5,
        weight_limit_kg: 150,
        base_price: 18000,
    },
    GameSeed {
        name: "Cancha Fútbol Jabón",
        description: "Cancha inflable para fútbol jabonoso",
        category: GameCategory::Sport,
        dimensions: "12x6x1.5 m",
        capacity: 10,
        weight_limit_kg: 900,
        base_price: 55000,
    },
];

pub const EXTENDED_GAMES: &[GameSeed] = &[
    GameSeed {
        name: "Castillo Pirata",
        description: "Barco pirata con cañones de aire",
        category: GameCategory::Castle,
        dimensions: "5x5x4 m",
        capacity: 10,
        weight_limit_kg: 400,
        base_price: 32000,
    },
    GameSeed {
        name: "Castillo Dinosaurio",
        description: "Castillo con figuras de dinosaurios",
        category: GameCategory::Castle,
        dimensions: "4x5x3.5 m",
        capacity: 9,
        weight_limit_kg: 350,
        base_price: 30000,
    },
    GameSeed {
        name: "Tobogán Gigante",
        description: "Tobogán de 7 metros con piscina de pelotas",
        category: GameCategory::Slide,
        dimensions: "9x4x7 m",
        capacity: 8,
        weight_limit_kg: 500,
        base_price: 60000,
    },
    GameSeed {
        name: "Circuito Ninja",
        description: "Pista de obstáculos de 15 metros",
        category: GameCategory::Obstacle,
        dimensions: "15x3x3 m",
        capacity: 14,
        weight_limit_kg: 700,
        base_price: 65000,
    },
    GameSeed {
        name: "Combo Selva",
        description: "Castillo, tobogán y túnel temático",
        category: GameCategory::Combo,
        dimensions: "6x5x4 m",
        capacity: 12,
        weight_limit_kg: 500,
        base_price: 45000,
    },
    GameSeed {
        name: "Toro Mecánico",
        description: "Toro mecánico con colchón inflable",
        category: GameCategory::Sport,
        dimensions: "5x5x1 m",
        capacity: 1,
        weight_limit_kg: 120,
        base_price: 70000,
    },
    GameSeed {
        name: "Piscina de Pelotas",
        description: "Piscina inflable con 2000 pelotas",
        category: GameCategory::Kids,
        dimensions: "3x3x1.5 m",
        capacity: 6,
        weight_limit_kg: 180,
        base_price: 15000,
    },
    GameSeed {
        name: "Túnel Arcoíris",
        description: "Túnel de gateo para menores de 5 años",
        category: GameCategory::Kids,
        dimensions: "6x2x1.5 m",
        capacity: 6,
        weight_limit_kg: 150,
        base_price: 16000,
    },
];

fn ensure_seeding_allowed(state: &AppState) -> AppResult<()> {
    if !state.config.environment.allows_seeding() {
        return Err(AppError::BadRequest(format!(
            "refusing to seed demo data in {}",
            state.config.environment
        )));
    }
    Ok(())
}

/// Insert `entries` by name in one transaction.
///
/// Existing names are never repriced; one that is not available is made available again.
async fn seed_catalog(
    state: &AppState,
    entries: &[GameSeed],
    cancel: &CancellationToken,
) -> AppResult<SeedReport> {
    let txn = state.orm.begin().await?;
    let mut report = SeedReport::default();

    for seed in entries {
        if cancel.is_cancelled() {
            tracing::warn!(game = seed.name, "catalog seeding cancelled");
            break;
        }

        let existing = Games::find()
            .filter(games::Column::Name.eq(seed.name))
            .one(&txn)
            .await?;
        match existing {
            Some(game) if game.availability != Availability::Available => {
                let mut active: games::ActiveModel = game.into();
                active.availability = Set(Availability::Available);
                active.update(&txn).await?;
                report.updated += 1;
            }
            Some(_) => report.unchanged += 1,
            None => {
                games::ActiveModel {
                    id: NotSet,
                    name: Set(seed.name.to_string()),
                    description: Set(seed.description.to_string()),
                    category: Set(seed.category),
                    dimensions: Set(seed.dimensions.to_string()),
                    capacity: Set(seed.capacity),
                    weight_limit_kg: Set(seed.weight_limit_kg),
                    base_price: Set(Decimal::new(seed.base_price, 0)),
                    photo: Set(None),
                    availability: Set(Availability::Available),
                    created_at: NotSet,
                }
                .insert(&txn)
                .await?;
                report.created += 1;
            }
        }
    }
    txn.commit().await?;

    tracing::info!(
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        "catalog seeded"
    );
    Ok(report)
}

pub async fn seed_default_games(state: &AppState, cancel: &CancellationToken) -> AppResult<SeedReport> {
    seed_catalog(state, DEFAULT_GAMES, cancel).await
}

/// Default catalog plus the extended range.
pub async fn seed_many_games(state: &AppState, cancel: &CancellationToken) -> AppResult<SeedReport> {
    let entries: Vec<GameSeed> = DEFAULT_GAMES.iter().chain(EXTENDED_GAMES).copied().collect();
    seed_catalog(state, &entries, cancel).await
}

const STREETS: &[&str] = &[
    "Av. Mackenna",
    "Av. República",
    "Calle Ramírez",
    "Av. Zenteno",
    "Calle Bilbao",
    "Av. Real",
    "Calle Los Carrera",
    "Av. Francke",
];

const FIRST_NAMES: &[&str] = &[
    "María", "José", "Camila", "Felipe", "Valentina", "Matías", "Javiera", "Diego", "Catalina",
    "Benjamín",
];

const LAST_NAMES: &[&str] = &[
    "González", "Muñoz", "Rojas", "Díaz", "Pérez", "Soto", "Contreras", "Silva", "Martínez",
    "Sepúlveda",
];

fn random_mobile(rng: &mut StdRng) -> String {
    format!("+569{:08}", rng.gen_range(0..100_000_000u32))
}

fn random_token(rng: &mut StdRng) -> String {
    format!("{:06x}", rng.gen_range(0..0x100_0000u32))
}

/// A Chilean event address around the warehouse, with its distance.
fn random_address(rng: &mut StdRng) -> (String, Decimal) {
    let point = sample_point_near(rng, BUSINESS_ORIGIN, SEED_RADIUS_KM);
    let street = STREETS.choose(rng).copied().unwrap_or("Av. Mackenna");
    let number = rng.gen_range(100..3000);
    (
        format!("{street} {number}, Osorno"),
        Decimal::from(point.distance_km),
    )
}

/// A slot inside working hours: install 09:00–13:00, pickup 4–8 hours later.
fn random_slot(rng: &mut StdRng) -> (NaiveTime, NaiveTime) {
    let install_hour = rng.gen_range(9..=13);
    let pickup_hour = install_hour + rng.gen_range(4..=8);
    (
        NaiveTime::from_hms_opt(install_hour, 0, 0).unwrap_or(NaiveTime::MIN),
        NaiveTime::from_hms_opt(pickup_hour, 0, 0).unwrap_or(NaiveTime::MIN),
    )
}

async fn seed_customer(state: &AppState, rng: &mut StdRng, index: usize) -> AppResult<i32> {
    let mut last_err = None;
    for _ in 0..5 {
        let token = random_token(rng);
        let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Cliente");
        let last = LAST_NAMES.choose(rng).copied().unwrap_or("Demo");
        let login = format!("cliente_{token}_{index}");
        let request = CreateCustomerRequest {
            email: format!("{login}@example.cl"),
            login,
            password: "cliente123".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: Some(random_mobile(rng)),
            national_id: national_id::format_with_check(rng.gen_range(10_000_000..26_000_000)),
            kind: CustomerKind::Individual,
        };
        match user_service::create_customer(state, Caller::system(), request).await {
            Ok(customer) => return Ok(customer.id),
            Err(err @ AppError::Conflict { .. }) => last_err = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        AppError::conflict("national_id", "could not generate a unique customer")
    }))
}

/// Walk a freshly created reservation to `target`, finishing its jobs when it is completed.
async fn settle_seed_status<C: ConnectionTrait>(
    conn: &C,
    reservation_id: i32,
    target: ReservationStatus,
) -> AppResult<()> {
    match target {
        ReservationStatus::Confirmed => {
            let reservation = reservation_service::lock_reservation(conn, reservation_id).await?;
            reservation_service::set_status(conn, reservation, ReservationStatus::Confirmed).await?;
        }
        ReservationStatus::Completed => {
            Installations::update_many()
                .col_expr(installations::Column::Status, Expr::value(JobStatus::Done.as_str()))
                .filter(installations::Column::ReservationId.eq(reservation_id))
                .exec(conn)
                .await?;
            Pickups::update_many()
                .col_expr(pickups::Column::Status, Expr::value(JobStatus::Done.as_str()))
                .filter(pickups::Column::ReservationId.eq(reservation_id))
                .exec(conn)
                .await?;
            reservation_service::complete_if_jobs_done(conn, reservation_id).await?;
        }
        ReservationStatus::Pending | ReservationStatus::Cancelled => {}
    }
    Ok(())
}

/// Generate `customers` fake customers and `count` reservations around the warehouse.
///
/// Refused in production. Each reservation is its own transaction; failures are counted.
pub async fn seed_reservations(
    state: &AppState,
    count: usize,
    customers: usize,
    rng: &mut StdRng,
    cancel: &CancellationToken,
) -> AppResult<ReservationSeedReport> {
    ensure_seeding_allowed(state)?;
    if customers == 0 && count > 0 {
        return Err(AppError::validation("customers", "at least one customer is required"));
    }

    let mut games = Games::find()
        .filter(games::Column::Availability.eq(Availability::Available))
        .order_by_asc(games::Column::Id)
        .all(&state.orm)
        .await?;
    if games.is_empty() {
        seed_default_games(state, cancel).await?;
        games = Games::find()
            .filter(games::Column::Availability.eq(Availability::Available))
            .order_by_asc(games::Column::Id)
            .all(&state.orm)
            .await?;
    }
    let game_ids: Vec<i32> = games.iter().map(|g| g.id).collect();

    let mut report = ReservationSeedReport::default();
    let mut customer_ids = Vec::with_capacity(customers);
    for index in 0..customers {
        if cancel.is_cancelled() {
            return Ok(report);
        }
        match seed_customer(state, rng, index).await {
            Ok(id) => {
                customer_ids.push(id);
                report.customers_created += 1;
            }
            Err(err) => {
                tracing::warn!(index, error = %err, "skipped fake customer");
                report.failed += 1;
            }
        }
    }
    if customer_ids.is_empty() {
        return Ok(report);
    }

    let today = reservation_service::today();
    let statuses = [
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::Completed,
    ];

    for index in 0..count {
        if cancel.is_cancelled() {
            tracing::warn!(index, "reservation seeding cancelled");
            break;
        }

        let (address, distance_km) = random_address(rng);
        let (install_time, pickup_time) = random_slot(rng);
        let picks = rng.gen_range(1..=3).min(game_ids.len());
        let items = game_ids
            .choose_multiple(rng, picks)
            .map(|id| ReservationItem {
                game_id: *id,
                quantity: 1,
            })
            .collect();
        let request = CreateReservationRequest {
            customer_id: customer_ids.choose(rng).copied().unwrap_or(customer_ids[0]),
            event_date: today + Duration::days(rng.gen_range(-30..=60)),
            install_time,
            pickup_time,
            address,
            items,
            distance_km: Some(distance_km),
            notes: Some("Reserva de demostración".to_string()),
        };
        let target = statuses.choose(rng).copied().unwrap_or(ReservationStatus::Pending);

        let outcome = async {
            reservation_service::validate_request(&request, today, true)?;
            let txn = state
                .orm
                .begin_with_config(Some(IsolationLevel::Serializable), None)
                .await?;
            let detail = reservation_service::insert_reservation(&txn, &request).await?;
            settle_seed_status(&txn, detail.reservation.id, target).await?;
            txn.commit().await?;
            AppResult::Ok(())
        }
        .await;

        match outcome {
            Ok(()) => report.reservations_created += 1,
            Err(err) => {
                tracing::warn!(index, error = %err, "skipped fake reservation");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        customers = report.customers_created,
        reservations = report.reservations_created,
        failed = report.failed,
        "demo reservations seeded"
    );
    Ok(report)
}

/// Set every courier's password to [`COURIER_RESET_PASSWORD`]. Refused in production.
pub async fn reset_courier_passwords(state: &AppState) -> AppResult<usize> {
    if state.config.environment.is_production() {
        return Err(AppError::BadRequest(
            "refusing to reset courier passwords in production".to_string(),
        ));
    }
    tracing::warn!(
        "!!! resetting EVERY courier password to a well-known value; never do this on real data !!!"
    );
    user_service::reset_courier_passwords(state, COURIER_RESET_PASSWORD).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;

    use super::*;
    use crate::domain::geo::haversine;

    #[test]
    fn default_catalog_has_unique_names_and_the_reference_prices() {
        let names: HashSet<_> = DEFAULT_GAMES.iter().chain(EXTENDED_GAMES).map(|g| g.name).collect();
        assert_eq!(names.len(), DEFAULT_GAMES.len() + EXTENDED_GAMES.len());

        let price = |name| DEFAULT_GAMES.iter().find(|g| g.name == name).map(|g| g.base_price);
        assert_eq!(price("Juego 3en1"), Some(30000));
        assert_eq!(price("Juego Block"), Some(35000));
    }

    #[test]
    fn generated_addresses_stay_in_osorno_radius() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let (address, km) = random_address(&mut rng);
            assert!(address.contains("Osorno"));
            assert!(km >= Decimal::ZERO && km <= Decimal::from(30));
        }
        let point = sample_point_near(&mut rng, BUSINESS_ORIGIN, SEED_RADIUS_KM);
        assert!(haversine(BUSINESS_ORIGIN.lat, BUSINESS_ORIGIN.lng, point.lat, point.lng) <= SEED_RADIUS_KM);
    }

    #[test]
    fn slots_keep_pickup_after_install() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let (install, pickup) = random_slot(&mut rng);
            assert!(pickup > install);
        }
    }

    #[test]
    fn mobiles_look_chilean() {
        let mut rng = StdRng::seed_from_u64(3);
        let phone = random_mobile(&mut rng);
        assert!(phone.starts_with("+569"));
        assert_eq!(phone.len(), 12);
    }
}
