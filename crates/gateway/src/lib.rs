pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{GatewayConfig, get_configuration};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
