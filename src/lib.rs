pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod offers;
pub mod payment;
pub mod store;
