pub mod auth;
pub mod calendar;
pub mod lifecycle;
pub mod reports;
pub mod search;
pub mod session;
pub mod store;
