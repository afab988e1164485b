pub mod audit_logs;
pub mod couriers;
pub mod customers;
pub mod enums;
pub mod games;
pub mod installations;
pub mod payments;
pub mod pickups;
pub mod reservation_lines;
pub mod reservations;
pub mod seasonal_prices;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use couriers::Entity as Couriers;
pub use customers::Entity as Customers;
pub use games::Entity as Games;
pub use installations::Entity as Installations;
pub use payments::Entity as Payments;
pub use pickups::Entity as Pickups;
pub use reservation_lines::Entity as ReservationLines;
pub use reservations::Entity as Reservations;
pub use seasonal_prices::Entity as SeasonalPrices;
pub use users::Entity as Users;
