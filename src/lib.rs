#![doc = "The `crud_scaffold` library crate."]
#![doc = ""]
#![doc = "Resources (users and doctors), the shared validation and parameter-normalization"]
#![doc = "pipeline, the generic service, controller and DAO layers, authentication and error"]
#![doc = "handling. The binary (`main.rs`) only reads configuration and starts the server."]

pub mod app;
pub mod auth;
pub mod config;
pub mod controllers;
pub mod daos;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod services;

pub use error::AppError;
