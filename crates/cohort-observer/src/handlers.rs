//! REST API endpoint handlers for the Observer server.
//!
//! All handlers read from the in-memory snapshots held by [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/agents` | List all agents |
//! | `GET` | `/api/agents/{id}` | Single agent with histories |
//! | `GET` | `/api/links` | Agent connection edges |
//! | `GET` | `/api/groups` | Sentiment groups from the last tick |
//! | `GET` | `/api/timeseries` | Per-tick metrics of the running condition |
//! | `GET` | `/api/log` | Tail of the interaction log |
//! | `GET` | `/api/results` | Completed condition results |
//! | `GET` | `/api/live` | Latest live feed snapshot |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use cohort_types::AgentId;
use uuid::Uuid;

use crate::error::ObserverError;
use crate::state::AppState;

/// Query parameters for `GET /api/log`.
#[derive(Debug, serde::Deserialize)]
pub struct LogQuery {
    /// Maximum number of entries, newest last. Capped by the log view.
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing the run status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    let condition = if snapshot.condition_name.is_empty() {
        String::from("-")
    } else {
        snapshot.condition_name.clone()
    };
    let tick = snapshot.current_tick;
    let agent_count = snapshot.agents.len();
    let group_count = snapshot.groups.len();
    let completed = snapshot.results.len();
    let sentiment = snapshot
        .time_series
        .last()
        .map_or_else(|| String::from("-"), |p| format!("{:+.2}", p.avg_sentiment));
    drop(snapshot);

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Cohort Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        li::before {{ content: "GET "; color: #7ee787; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>Cohort Observer</h1>
    <div>
        <div class="metric"><div class="label">Condition</div><div class="value">{condition}</div></div>
        <div class="metric"><div class="label">Tick</div><div class="value">{tick}</div></div>
        <div class="metric"><div class="label">Agents</div><div class="value">{agent_count}</div></div>
        <div class="metric"><div class="label">Groups</div><div class="value">{group_count}</div></div>
        <div class="metric"><div class="label">Sentiment</div><div class="value">{sentiment}</div></div>
        <div class="metric"><div class="label">Completed</div><div class="value">{completed}</div></div>
    </div>
    <h2>API Endpoints</h2>
    <ul>
        <li><a href="/api/agents">/api/agents</a></li>
        <li><a href="/api/links">/api/links</a></li>
        <li><a href="/api/groups">/api/groups</a></li>
        <li><a href="/api/timeseries">/api/timeseries</a></li>
        <li><a href="/api/log">/api/log</a> (?limit=N)</li>
        <li><a href="/api/results">/api/results</a></li>
        <li><a href="/api/live">/api/live</a></li>
    </ul>
    <p><code>ws://host:port/ws/ticks</code> streams one summary per tick.</p>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// List every agent with its current position and sentiment.
pub async fn list_agents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;

    let agents: Vec<serde_json::Value> = snapshot
        .agents
        .iter()
        .map(|agent| {
            serde_json::json!({
                "id": agent.id,
                "name": agent.name,
                "archetype": agent.archetype,
                "role": agent.role,
                "culture": agent.culture,
                "traits": agent.traits,
                "sentiment": agent.sentiment,
                "stance": agent.stance_history.latest(),
                "position": agent.position,
                "last_action": agent.last_action,
                "last_thought": agent.last_thought,
            })
        })
        .collect();

    Json(serde_json::json!({
        "condition": snapshot.condition_name,
        "tick": snapshot.current_tick,
        "count": agents.len(),
        "agents": agents,
    }))
}

/// Return the full record of one agent, histories included.
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = parse_uuid(&id_str)?;
    let agent_id = AgentId::from(id);

    let snapshot = state.snapshot.read().await;
    let agent = snapshot
        .agents
        .iter()
        .find(|a| a.id == agent_id)
        .ok_or_else(|| ObserverError::NotFound(format!("agent {id}")))?;

    Ok(Json(serde_json::to_value(agent)?))
}

// ---------------------------------------------------------------------------
// Graph state
// ---------------------------------------------------------------------------

/// Return the connection edges of the running condition.
pub async fn list_links(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    Json(serde_json::json!({
        "count": snapshot.links.len(),
        "links": snapshot.links,
    }))
}

/// Return the groups detected on the last tick.
pub async fn list_groups(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    Json(serde_json::json!({
        "tick": snapshot.current_tick,
        "count": snapshot.groups.len(),
        "groups": snapshot.groups,
    }))
}

/// Return the per-tick metrics of the running condition.
pub async fn time_series(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    Json(serde_json::json!({
        "condition": snapshot.condition_name,
        "points": snapshot.time_series,
    }))
}

/// Return the newest log entries, oldest first.
///
/// # Query Parameters
///
/// - `limit`: at most this many entries (default and ceiling: the log view)
pub async fn list_log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let limit = match params.limit {
        Some(0) => {
            return Err(ObserverError::InvalidQuery(
                "limit must be at least 1".to_owned(),
            ));
        }
        Some(n) => n.min(state.log_view),
        None => state.log_view,
    };

    let snapshot = state.snapshot.read().await;
    let start = snapshot.log.len().saturating_sub(limit);
    let entries = snapshot.log.get(start..).unwrap_or_default();

    Ok(Json(serde_json::json!({
        "count": entries.len(),
        "entries": entries,
    })))
}

/// Return every condition result captured so far.
pub async fn list_results(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    let results: Vec<serde_json::Value> = snapshot
        .results
        .iter()
        .map(|r| {
            serde_json::json!({
                "condition_id": r.condition_id,
                "condition_name": r.condition_name,
                "avg_sentiment": r.avg_sentiment,
                "polarization": r.polarization,
                "cooperation_rate": r.cooperation_rate,
                "group_count": r.group_count,
                "tick_count": r.tick_count,
                "captured_at": r.captured_at,
            })
        })
        .collect();

    Json(serde_json::json!({
        "count": results.len(),
        "results": results,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/live
// ---------------------------------------------------------------------------

/// Return the latest live feed snapshot.
pub async fn live(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    let live = state.live.read().await;
    let snapshot = live
        .as_ref()
        .ok_or_else(|| ObserverError::NotFound("no live feed consumed".to_owned()))?;
    Ok(Json(serde_json::to_value(snapshot)?))
}

fn parse_uuid(raw: &str) -> Result<Uuid, ObserverError> {
    Uuid::parse_str(raw).map_err(|e| ObserverError::InvalidUuid(format!("{raw}: {e}")))
}
