pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod repository;
pub mod services;
pub mod tasks;

pub use config::Config;
pub use error::{AppError, Result};
