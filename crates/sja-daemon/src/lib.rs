//! sja-daemon library target.
//!
//! Exposes the process bootstrap helpers for integration tests; the binary
//! `main.rs` depends on this library target.

pub mod bootstrap;

pub use bootstrap::{cors_layer, init_tracing};
