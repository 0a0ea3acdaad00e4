pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod plans;
pub mod providers;
pub mod usage;
pub mod visibility;

pub use config::Config;
pub use error::AppError;
