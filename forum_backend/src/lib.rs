pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod database;
pub mod notify;
pub mod telemetry;
pub mod topics;
pub mod users;
pub mod utils;
