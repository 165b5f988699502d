#![doc = "The `servicebook` library crate."]
#![doc = ""]
#![doc = "Users register their cars, vendors append entries to each car's service book."]
#![doc = "Every request shape is checked against the schema registry by a validation gate"]
#![doc = "before a handler runs, and every failure is rendered by the error classifier."]
#![doc = "The binary (`main.rs`) reads the configuration and assembles the application."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod response;
pub mod routes;
pub mod schema;
pub mod state;
pub mod store;
pub mod validation;

pub use crate::config::{Config, Mode};
pub use crate::error::{AppError, ErrorClassifier};
pub use crate::routes::Api;
pub use crate::state::AppState;
