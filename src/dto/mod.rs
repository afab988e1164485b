pub mod auth;
pub mod dispatch;
pub mod games;
pub mod pages;
pub mod payments;
pub mod reservations;
pub mod users;
