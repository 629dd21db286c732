//! Server components

pub mod http;

pub use http::{route, run, serve, AppState, Collaborators, MAX_BODY_BYTES};
