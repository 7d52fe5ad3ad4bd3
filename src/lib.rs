//! Medi-Reach: pharmacy catalog, ordering and delivery tracking over HTTP.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod services;
pub mod state;
pub mod utils;

pub use config::Config;
pub use error::AppError;
pub use state::AppState;
