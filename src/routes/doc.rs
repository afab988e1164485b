use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginForm, LoginPage, LoginResponse},
        dispatch::{AssignCourierRequest, CourierJobs, DispatchedJob, PaymentMethodRequest},
        games::{
            AvailabilityRequest, CatalogFeed, CatalogGame, EffectivePrice, GameList, GameRequest,
            SeasonalPriceList, SeasonalPriceRequest,
        },
        pages::{AdminDashboard, ContactForm, ContactInfo, CourierPanel, HomePage, StatusCounts},
        payments::{Balance, PaymentList, RecordPaymentRequest, SweepReport},
        reservations::{
            AddLineRequest, BackfillReport, BookingConfirmation, BookingRequest,
            CreateReservationRequest, ReservationItem, ReservationList,
        },
        users::{
            CourierList, CourierStatusRequest, CreateCourierRequest, CreateCustomerRequest,
            CreateUserRequest, CustomerList, SetPasswordRequest,
        },
    },
    models::{
        Courier, Customer, Game, Installation, Payment, Pickup, Reservation, ReservationDetail,
        ReservationLine, SeasonalPrice, User,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, courier, health, panel, public, reservations},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        public::home,
        public::catalog,
        public::booking_form,
        public::book,
        public::contact,
        public::send_contact,
        public::games_feed,
        auth::login_page,
        auth::login,
        auth::api_login,
        auth::logout,
        panel::panel,
        panel::admin_panel,
        panel::courier_panel,
        admin::dashboard,
        admin::list_games,
        admin::create_game,
        admin::get_game,
        admin::update_game,
        admin::set_availability,
        admin::delete_game,
        admin::effective_price,
        admin::list_seasonal_prices,
        admin::add_seasonal_price,
        admin::delete_seasonal_price,
        admin::create_user,
        admin::set_password,
        admin::deactivate_user,
        admin::list_customers,
        admin::create_customer,
        admin::get_customer,
        admin::list_couriers,
        admin::create_courier,
        admin::get_courier,
        admin::set_courier_status,
        admin::delete_courier,
        admin::backfill_jobs,
        admin::sweep_overdue,
        reservations::list_reservations,
        reservations::create_reservation,
        reservations::get_reservation,
        reservations::delete_reservation,
        reservations::transition_reservation,
        reservations::add_line,
        reservations::remove_line,
        reservations::list_payments,
        reservations::record_payment,
        reservations::balance,
        reservations::refund_payment,
        reservations::mark_payment_paid,
        reservations::open_jobs,
        reservations::assign_installation,
        reservations::assign_pickup,
        reservations::installation_action,
        reservations::pickup_action,
        reservations::installation_payment_method,
        courier::my_jobs,
        courier::installation_action,
        courier::pickup_action,
        courier::installation_payment_method
    ),
    components(
        schemas(
            User,
            Customer,
            Courier,
            Game,
            SeasonalPrice,
            Reservation,
            ReservationLine,
            ReservationDetail,
            Installation,
            Pickup,
            Payment,
            LoginForm,
            LoginPage,
            LoginResponse,
            GameRequest,
            AvailabilityRequest,
            SeasonalPriceRequest,
            GameList,
            SeasonalPriceList,
            CatalogGame,
            CatalogFeed,
            EffectivePrice,
            ReservationItem,
            CreateReservationRequest,
            BookingRequest,
            BookingConfirmation,
            AddLineRequest,
            ReservationList,
            BackfillReport,
            RecordPaymentRequest,
            PaymentList,
            Balance,
            SweepReport,
            AssignCourierRequest,
            PaymentMethodRequest,
            CourierJobs,
            DispatchedJob,
            CreateUserRequest,
            CreateCustomerRequest,
            CreateCourierRequest,
            CourierStatusRequest,
            SetPasswordRequest,
            CustomerList,
            CourierList,
            HomePage,
            ContactInfo,
            ContactForm,
            StatusCounts,
            AdminDashboard,
            CourierPanel,
            health::HealthData,
            Meta,
            ApiResponse<Game>,
            ApiResponse<GameList>,
            ApiResponse<ReservationDetail>,
            ApiResponse<ReservationList>,
            ApiResponse<CourierJobs>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Public", description = "Catalog, booking and contact"),
        (name = "Auth", description = "Login and logout"),
        (name = "Panels", description = "Role-gated staff and courier panels"),
        (name = "Admin", description = "Catalog, people and maintenance"),
        (name = "Reservations", description = "Reservation lifecycle and lines"),
        (name = "Payments", description = "Payments and balances"),
        (name = "Dispatch", description = "Installations and pickups"),
        (name = "Courier", description = "A courier's own jobs"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
