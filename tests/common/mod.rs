#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use rand::Rng;
use rust_decimal::Decimal;

use inflatable_rentals_api::{
    config::AppConfig,
    domain::national_id,
    dto::{
        games::GameRequest,
        reservations::{CreateReservationRequest, ReservationItem},
        users::{CreateCourierRequest, CreateCustomerRequest},
    },
    entity::enums::{CustomerKind, GameCategory},
    models::{Courier, Customer, Game},
    services::{Caller, catalog_service, user_service},
    state::AppState,
};

/// Connect to the test database, or `None` when none is configured.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };
    let state = AppState::connect(AppConfig::for_tests(database_url)).await?;
    Ok(Some(state))
}

/// Short random tag so reruns against the same database never collide.
pub fn unique(prefix: &str) -> String {
    format!("{prefix}_{}", &uuid::Uuid::new_v4().simple().to_string()[..10])
}

pub async fn create_game(state: &AppState, name: &str, base_price: i64) -> anyhow::Result<Game> {
    let game = catalog_service::upsert(
        state,
        Caller::system(),
        None,
        GameRequest {
            name: unique(name),
            description: "test game".into(),
            category: GameCategory::Combo,
            dimensions: "5x4x3 m".into(),
            capacity: 8,
            weight_limit_kg: 400,
            base_price: Decimal::new(base_price, 0),
            photo: None,
            availability: None,
        },
    )
    .await?;
    Ok(game)
}

pub async fn create_customer(state: &AppState) -> anyhow::Result<Customer> {
    let login = unique("maria");
    let number = rand::thread_rng().gen_range(10_000_000..26_000_000);
    let customer = user_service::create_customer(
        state,
        Caller::system(),
        CreateCustomerRequest {
            email: format!("{login}@e.cl"),
            login,
            password: "secreto123".into(),
            first_name: "Maria".into(),
            last_name: "Gonzalez".into(),
            phone: Some("+56911112222".into()),
            national_id: national_id::format_with_check(number),
            kind: CustomerKind::Individual,
        },
    )
    .await?;
    Ok(customer)
}

pub async fn create_courier(state: &AppState, password: &str) -> anyhow::Result<Courier> {
    let login = unique("courier");
    let courier = user_service::create_courier(
        state,
        Caller::system(),
        CreateCourierRequest {
            email: format!("{login}@e.cl"),
            login,
            password: password.into(),
            first_name: "Pedro".into(),
            last_name: "Soto".into(),
            phone: Some("+56933334444".into()),
            license_number: Some("A2-1234".into()),
            vehicle: Some("Camioneta".into()),
        },
    )
    .await?;
    Ok(courier)
}

pub fn time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
}

/// The reference booking: 2025-12-01, 10:00 to 18:00, 12.3 km from the warehouse.
pub fn reference_request(customer_id: i32, games: &[&Game]) -> CreateReservationRequest {
    CreateReservationRequest {
        customer_id,
        event_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
        install_time: time(10),
        pickup_time: time(18),
        address: "Av. Mackenna 123, Osorno".into(),
        items: games
            .iter()
            .map(|game| ReservationItem {
                game_id: game.id,
                quantity: 1,
            })
            .collect(),
        distance_km: Some(Decimal::new(123, 1)),
        notes: None,
    }
}
