#![warn(missing_docs)]

//! RECAP gateway subsystem: the Memento HTTP surface
//!
//! Routes TimeGate negotiation, TimeMap enumeration, Memento retrieval,
//! and direct-URI replay onto the index, resolver, and reconstructor.

pub mod config;
pub mod error;
pub mod pages;
pub mod routes;
pub mod state;

pub use config::{BindAddr, ReplayConfig};
pub use error::GatewayError;
pub use routes::router;
pub use state::AppState;
