pub mod auth;
pub mod azure;
pub mod base;
pub mod configs;
mod types;
