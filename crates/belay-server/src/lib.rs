//! Belay Server: the HTTP surface over the auth services.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod startup;
pub mod state;

pub use config::ServerConfig;
pub use routes::router;
pub use state::AppState;
