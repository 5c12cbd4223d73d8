pub mod account;
pub mod account_store;
pub mod auth;
pub mod configuration;
pub mod email_client;
pub mod error;
pub mod media_client;
pub mod middleware;
pub mod pagination;
pub mod response;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod validators;
