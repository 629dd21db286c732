//! Admin setup route

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use crate::auth::RequestContext;
use crate::server::AppState;
use crate::services::{run_setup, SetupOutcome};
use crate::types::Result;

use super::json_response;

/// POST /admin/setup
pub async fn setup(state: &AppState, ctx: &RequestContext) -> Result<Response<Full<Bytes>>> {
    let admin = ctx.identity()?;
    let outcome = run_setup(&state.relay, admin).await?;

    Ok(json_response(
        StatusCode::OK,
        &serde_json::json!({
            "status": "completed",
            "alreadyCompleted": outcome == SetupOutcome::AlreadyCompleted,
        }),
    ))
}
