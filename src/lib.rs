//! Gatehouse - authenticated relay between internal HTTP services
//!
//! Internal services trust each other's requests without a shared session
//! store. Every inbound request is verified either by a shared-secret payload
//! signature (service callers) or by a split session cookie (browsers), and
//! every outbound call to another service is signed the same way.
//!
//! ## Components
//!
//! - **Auth**: mode selection, payload signatures, session cookies, identity headers
//! - **Relay**: signed outbound calls and opaque room dispatch forwarding
//! - **Services**: notification email gating, mail delivery, first-run setup
//! - **Tasks**: supervised background work with deadlines and reported outcomes
//! - **Store**: persistence contracts with in-memory implementations

pub mod auth;
pub mod config;
pub mod relay;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod tasks;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GatehouseError, Result};
