use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rand::{SeedableRng, rngs::StdRng};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inflatable_rentals_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::users::CreateCourierRequest,
    entity::enums::Role,
    error::AppError,
    services::{
        Caller, payment_service, reservation_service, seed_service,
        user_service::{self, NewUser},
    },
    state::AppState,
};

/// Operator commands for the rental back office.
#[derive(Debug, Parser)]
#[command(name = "manage", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "snake_case")]
enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// Insert the default catalog; existing games are left alone.
    SeedGames,
    /// Insert the default and extended catalog.
    SeedManyGames,
    /// Create a superuser admin account.
    CreateAdmin {
        #[arg(long)]
        login: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long = "first_name", default_value = "")]
        first_name: String,
        #[arg(long = "last_name", default_value = "")]
        last_name: String,
    },
    /// Create a courier account with its profile.
    CreateCourier {
        #[arg(long)]
        login: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long = "first_name", default_value = "")]
        first_name: String,
        #[arg(long = "last_name", default_value = "")]
        last_name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        license: Option<String>,
        #[arg(long)]
        vehicle: Option<String>,
    },
    /// Create the installation and pickup of every reservation missing one.
    BackfillJobs,
    /// Generate fake customers and reservations around Osorno.
    SeedReservations {
        #[arg(long, default_value_t = 50)]
        count: usize,
        #[arg(long, default_value_t = 20)]
        customers: usize,
    },
    /// Set every courier password to a well-known value. Refused in production.
    ResetCourierPasswords,
    /// Mark pending payments of past, unpaid events as overdue.
    SweepOverduePayments,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,inflatable_rentals_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Cancelled on Ctrl-C so batch commands stop at the next record.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current record");
            child.cancel();
        }
    });
    token
}

async fn run(command: Command) -> anyhow::Result<ExitCode> {
    let config = AppConfig::from_env()?;

    if let Command::Migrate = command {
        let pool = create_pool(&config.database_url).await?;
        run_migrations(&pool).await?;
        println!("Migrations applied");
        return Ok(ExitCode::SUCCESS);
    }

    let state = AppState::connect(config).await?;
    let cancel = cancel_on_ctrl_c();

    match command {
        Command::Migrate => {}
        Command::SeedGames => {
            let report = seed_service::seed_default_games(&state, &cancel).await?;
            println!(
                "Games seeded: {} created, {} re-enabled, {} unchanged",
                report.created, report.updated, report.unchanged
            );
        }
        Command::SeedManyGames => {
            let report = seed_service::seed_many_games(&state, &cancel).await?;
            println!(
                "Games seeded: {} created, {} re-enabled, {} unchanged",
                report.created, report.updated, report.unchanged
            );
        }
        Command::CreateAdmin {
            login,
            email,
            password,
            first_name,
            last_name,
        } => {
            let new_user = NewUser {
                login,
                email,
                password,
                first_name,
                last_name,
                phone: None,
                role: Role::Admin,
                is_superuser: true,
            };
            match user_service::create_user(&state, Caller::system(), new_user).await {
                Ok(user) => println!("Admin '{}' created with id {}", user.login, user.id),
                Err(AppError::Conflict { field, message }) => {
                    tracing::warn!(field, "admin not created");
                    eprintln!("warning: {field} already in use ({message})");
                    return Ok(ExitCode::FAILURE);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::CreateCourier {
            login,
            email,
            password,
            first_name,
            last_name,
            phone,
            license,
            vehicle,
        } => {
            let request = CreateCourierRequest {
                login,
                email,
                password,
                first_name,
                last_name,
                phone,
                license_number: license,
                vehicle,
            };
            let courier = user_service::create_courier(&state, Caller::system(), request).await?;
            println!("Courier '{}' created with id {}", courier.user.login, courier.id);
        }
        Command::BackfillJobs => {
            let report = reservation_service::ensure_jobs_for_all(&state, &cancel).await?;
            println!(
                "Installations created: {}\nPickups created: {}\nFailed: {}",
                report.installations_created, report.pickups_created, report.failed
            );
        }
        Command::SeedReservations { count, customers } => {
            let mut rng = StdRng::from_entropy();
            let report =
                seed_service::seed_reservations(&state, count, customers, &mut rng, &cancel).await?;
            println!(
                "Customers created: {}\nReservations created: {}\nFailed: {}",
                report.customers_created, report.reservations_created, report.failed
            );
        }
        Command::ResetCourierPasswords => {
            let updated = seed_service::reset_courier_passwords(&state).await?;
            println!(
                "{updated} courier passwords set to '{}'",
                seed_service::COURIER_RESET_PASSWORD
            );
        }
        Command::SweepOverduePayments => {
            let today = reservation_service::today();
            let swept = payment_service::sweep_overdue(&state, today, &cancel).await?;
            println!("{swept} payments marked overdue");
        }
    }

    Ok(ExitCode::SUCCESS)
}
