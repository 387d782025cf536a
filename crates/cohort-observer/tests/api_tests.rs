//! Integration tests for the Observer API endpoints.
//!
//! Requests go through the `Router` directly via `tower::ServiceExt`,
//! without binding a TCP listener.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use cohort_core::OperatorState;
use cohort_observer::{AppState, TickBroadcast, build_router};
use cohort_stream::{LiveStreamAggregator, decode_frame};
use cohort_types::{
    Agent, AgentId, Archetype, HistoryCaps, IdAllocator, Link, LogEntry, LogEntryId,
    SequentialIds, Stance, Traits,
};
use serde_json::Value;
use tower::ServiceExt;

fn agent(ids: &dyn IdAllocator, name: &str, sentiment: f64) -> Agent {
    let mut agent = Agent::new(
        AgentId::allocate(ids),
        name.to_owned(),
        Traits::default(),
        Archetype::CautiousRealist,
        HistoryCaps::default(),
    );
    agent.sentiment = sentiment;
    agent
}

fn entry(ids: &dyn IdAllocator, tick: u64, who: &Agent) -> LogEntry {
    LogEntry {
        id: LogEntryId::allocate(ids),
        tick,
        agent_id: who.id,
        agent_name: who.name.clone(),
        action: format!("spoke at tick {tick}"),
        thought: String::from("hm"),
        sentiment: who.sentiment,
        stance: Stance::Agree,
        fallback: false,
        recorded_at: Utc::now(),
    }
}

async fn make_test_state(log_view: usize) -> (Arc<AppState>, Vec<Agent>) {
    let ids = SequentialIds::default();
    let ana = agent(&ids, "Ana", 0.4);
    let ben = agent(&ids, "Ben", -0.2);

    let state = Arc::new(AppState::new(log_view));
    {
        let mut snap = state.snapshot.write().await;
        snap.condition_name = String::from("Uniform Random");
        snap.current_tick = 5;
        snap.links = vec![Link {
            source: ana.id,
            target: ben.id,
            weight: 1.0,
        }];
        let log: Vec<LogEntry> = (1..=5).map(|t| entry(&ids, t, &ana)).collect();
        snap.set_log_tail(&log, log_view);
        snap.agents = vec![ana.clone(), ben.clone()];
    }
    (state, vec![ana, ben])
}

async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = build_router(state)
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post(state: Arc<AppState>, uri: &str, body: Body) -> StatusCode {
    build_router(state)
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn index_renders_status_page() {
    let (state, _) = make_test_state(10).await;
    let response = build_router(state)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Cohort Observer"));
    assert!(html.contains("Uniform Random"));
}

#[tokio::test]
async fn lists_agents_and_links() {
    let (state, agents) = make_test_state(10).await;

    let (status, body) = get_json(Arc::clone(&state), "/api/agents").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["tick"], 5);
    assert_eq!(body["agents"][0]["name"], "Ana");

    let (status, body) = get_json(state, "/api/links").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(
        body["links"][0]["source"],
        Value::String(agents.first().unwrap().id.to_string())
    );
}

#[tokio::test]
async fn single_agent_lookup() {
    let (state, agents) = make_test_state(10).await;
    let ben = agents.get(1).unwrap();

    let (status, body) = get_json(Arc::clone(&state), &format!("/api/agents/{}", ben.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ben");

    let (status, _) = get_json(
        Arc::clone(&state),
        "/api/agents/00000000-0000-0000-0000-0000000000ff",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get_json(state, "/api/agents/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn log_is_capped_by_view_and_limit() {
    let (state, _) = make_test_state(3).await;

    let (_, body) = get_json(Arc::clone(&state), "/api/log").await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["entries"][0]["tick"], 3);

    let (_, body) = get_json(Arc::clone(&state), "/api/log?limit=1").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["entries"][0]["tick"], 5);

    // A larger limit never exceeds the view.
    let (_, body) = get_json(Arc::clone(&state), "/api/log?limit=50").await;
    assert_eq!(body["count"], 3);

    let (status, _) = get_json(state, "/api/log?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_groups_results_and_series() {
    let (state, _) = make_test_state(10).await;
    let (_, groups) = get_json(Arc::clone(&state), "/api/groups").await;
    assert_eq!(groups["count"], 0);
    let (_, results) = get_json(Arc::clone(&state), "/api/results").await;
    assert_eq!(results["count"], 0);
    let (status, series) = get_json(state, "/api/timeseries").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(series["points"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn live_snapshot_is_served_once_present() {
    let (state, _) = make_test_state(10).await;
    let (status, _) = get_json(Arc::clone(&state), "/api/live").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut agg = LiveStreamAggregator::default();
    for raw in [
        r#"{"type":"turn","round":1,"agent_id":"agent-1","stance":"support"}"#,
        r#"{"type":"turn","round":1,"agent_id":"agent-2","stance":"oppose"}"#,
    ] {
        agg.apply(decode_frame(raw)).unwrap();
    }
    *state.live.write().await = Some(agg.snapshot());

    let (status, body) = get_json(state, "/api/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tally"]["support"], 1);
    assert_eq!(body["tally"]["oppose"], 1);
    assert_eq!(body["links"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn operator_routes_require_attached_state() {
    let (state, _) = make_test_state(10).await;
    assert_eq!(
        post(state, "/api/operator/stop", Body::empty()).await,
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn operator_routes_drive_the_shared_state() {
    let operator = Arc::new(OperatorState::new(200));
    let state = Arc::new(AppState::new(10).with_operator(Arc::clone(&operator)));

    assert_eq!(
        post(Arc::clone(&state), "/api/operator/pause", Body::empty()).await,
        StatusCode::OK
    );
    assert!(operator.is_paused());

    let (_, status) = get_json(Arc::clone(&state), "/api/operator/status").await;
    assert_eq!(status["paused"], true);
    assert_eq!(status["tick_interval_ms"], 200);

    assert_eq!(
        post(Arc::clone(&state), "/api/operator/resume", Body::empty()).await,
        StatusCode::OK
    );
    assert!(!operator.is_paused());

    assert_eq!(
        post(
            Arc::clone(&state),
            "/api/operator/speed",
            Body::from(r#"{"tick_interval_ms":0}"#)
        )
        .await,
        StatusCode::OK
    );
    assert_eq!(operator.tick_interval_ms(), 0);

    assert_eq!(
        post(state, "/api/operator/stop", Body::empty()).await,
        StatusCode::OK
    );
    assert!(operator.is_stop_requested());
}

#[test]
fn broadcast_without_subscribers_is_not_an_error() {
    let state = AppState::default();
    let tick = TickBroadcast {
        condition: String::from("c"),
        tick: 1,
        avg_sentiment: 0.0,
        polarization: 0.0,
        cooperation_pct: 50.0,
        group_count: 0,
    };
    assert_eq!(state.broadcast(&tick), 0);

    let mut rx = state.subscribe();
    assert_eq!(state.broadcast(&tick), 1);
    assert_eq!(rx.try_recv().unwrap(), tick);
}
