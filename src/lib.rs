pub mod app;
pub mod auth;
pub mod billing;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod provisioning;
pub mod settings;
pub mod state;
pub mod users;

pub use app::build_app;
pub use error::AppError;
pub use state::AppState;
