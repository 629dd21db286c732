//! Shared types for Gatehouse

pub mod error;
pub mod models;

pub use error::{ErrorBody, GatehouseError, RelayError, Result};
pub use models::*;
