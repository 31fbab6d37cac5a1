//! HTTP request router, validation, and error mapping (C9): the axum
//! surface that binds `sja-jobs`' job controller and stores to the wire
//! contract in spec §4.8/§6.

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod validation;

pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;
