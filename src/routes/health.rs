//! Liveness endpoint
//!
//! Always 200 while the process serves requests. Also reports which services
//! are mounted and the background task counters.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::server::AppState;
use crate::tasks::TaskStats;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub services: Vec<String>,
    /// `body-only` or `timestamped`
    pub signature_scheme: &'static str,
    pub tasks: TaskStats,
    pub timestamp: String,
}

pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let signature_scheme = match state.signer.scheme() {
        crate::auth::SignatureScheme::BodyOnly => "body-only",
        crate::auth::SignatureScheme::Timestamped { .. } => "timestamped",
    };

    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        services: state.args.service_list(),
        signature_scheme,
        tasks: state.tasks.stats(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    super::json_response(StatusCode::OK, &response)
}
