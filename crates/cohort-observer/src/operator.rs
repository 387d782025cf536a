//! Operator REST API handlers for runtime run control.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause between ticks |
//! | `POST` | `/api/operator/resume` | Resume a paused run |
//! | `POST` | `/api/operator/speed` | Set the tick interval (ms) |
//! | `GET` | `/api/operator/status` | Current control state |
//! | `POST` | `/api/operator/stop` | Stop the run, keeping completed results |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use cohort_core::OperatorState;

use crate::error::ObserverError;
use crate::state::AppState;

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New tick interval in milliseconds (0 runs unpaced).
    pub tick_interval_ms: u64,
}

#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    ok: bool,
    message: String,
}

fn operator(state: &AppState) -> Result<&Arc<OperatorState>, ObserverError> {
    state
        .operator_state
        .as_ref()
        .ok_or_else(|| ObserverError::Unavailable("operator state not attached".to_owned()))
}

/// Pause the run. The current tick finishes first.
pub async fn pause(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.pause();
    Ok(Json(OperatorResponse {
        ok: true,
        message: "Run paused".to_owned(),
    }))
}

/// Resume a paused run.
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.resume();
    Ok(Json(OperatorResponse {
        ok: true,
        message: "Run resumed".to_owned(),
    }))
}

/// Change the tick interval. Takes effect at the next pacing sleep.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let prev = operator(&state)?.set_tick_interval_ms(body.tick_interval_ms);
    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!("Tick interval changed from {prev}ms to {}ms", body.tick_interval_ms),
        "previous_interval_ms": prev,
        "new_interval_ms": body.tick_interval_ms,
    })))
}

/// Return the current control state.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let status = operator(&state)?.status().await;
    Ok(Json(status))
}

/// Request a stop.
///
/// The in-flight tick is abandoned and the results of every completed
/// condition are kept. The HTTP server keeps serving afterwards.
pub async fn stop(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.request_stop();
    Ok(Json(OperatorResponse {
        ok: true,
        message: "Stop requested".to_owned(),
    }))
}
