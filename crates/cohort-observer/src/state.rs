//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the broadcast channel for tick summaries, an
//! in-memory snapshot of the running condition that the REST endpoints
//! serve, and the latest live feed snapshot.

use std::sync::Arc;

use cohort_core::OperatorState;
use cohort_stream::LiveSnapshot;
use cohort_types::{Agent, AgentId, ConditionResult, Group, Link, LogEntry, TimeSeriesPoint};
use tokio::sync::{RwLock, broadcast};

/// Capacity of the broadcast channel for tick summaries.
///
/// A subscriber that falls further behind receives
/// [`broadcast::error::RecvError::Lagged`] and skips to the newest message.
const BROADCAST_CAPACITY: usize = 256;

/// Log entries served when no cap is configured.
pub const DEFAULT_LOG_VIEW: usize = 300;

/// JSON-serializable tick summary pushed over the `WebSocket`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TickBroadcast {
    /// Name of the condition the tick belongs to.
    pub condition: String,
    /// The tick number.
    pub tick: u64,
    /// Mean sentiment after the tick.
    pub avg_sentiment: f64,
    /// Sentiment dispersion after the tick.
    pub polarization: f64,
    /// Cooperation percentage (0-100).
    pub cooperation_pct: f64,
    /// Number of groups detected.
    pub group_count: u32,
}

/// In-memory snapshot of the running condition.
///
/// Replaced wholesale each tick by the engine. All reads are served from
/// here so the observer never blocks the tick pipeline.
#[derive(Debug, Clone, Default)]
pub struct SimulationSnapshot {
    /// Name of the condition currently running.
    pub condition_name: String,
    /// Index of that condition in the experiment.
    pub condition_index: usize,
    /// Last completed tick.
    pub current_tick: u64,
    /// The population, in generation order.
    pub agents: Vec<Agent>,
    /// Edges between agents.
    pub links: Vec<Link<AgentId>>,
    /// Groups from the last tick.
    pub groups: Vec<Group>,
    /// Per-tick metrics so far.
    pub time_series: Vec<TimeSeriesPoint>,
    /// Tail of the interaction log, oldest first.
    pub log: Vec<LogEntry>,
    /// Results of every condition completed so far.
    pub results: Vec<ConditionResult>,
}

impl SimulationSnapshot {
    /// Replace the log view with the last `cap` entries of `log`.
    pub fn set_log_tail(&mut self, log: &[LogEntry], cap: usize) {
        let start = log.len().saturating_sub(cap);
        self.log = log.get(start..).unwrap_or_default().to_vec();
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for tick summary messages.
    pub tx: broadcast::Sender<TickBroadcast>,
    /// The running condition (updated each tick).
    pub snapshot: Arc<RwLock<SimulationSnapshot>>,
    /// The latest live feed snapshot, once a feed has been consumed.
    pub live: Arc<RwLock<Option<LiveSnapshot>>>,
    /// Shared operator control state (present when a run is attached).
    pub operator_state: Option<Arc<OperatorState>>,
    /// Maximum number of log entries served.
    pub log_view: usize,
}

impl AppState {
    /// Create a new application state with an empty snapshot.
    pub fn new(log_view: usize) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(SimulationSnapshot::default())),
            live: Arc::new(RwLock::new(None)),
            operator_state: None,
            log_view,
        }
    }

    /// Attach operator control state.
    #[must_use]
    pub fn with_operator(mut self, operator: Arc<OperatorState>) -> Self {
        self.operator_state = Some(operator);
        self
    }

    /// Subscribe to the tick broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<TickBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a tick summary to all connected clients.
    ///
    /// Returns the number of receivers, 0 when nobody is listening.
    pub fn broadcast(&self, summary: &TickBroadcast) -> usize {
        // send only fails when there are zero receivers.
        self.tx.send(summary.clone()).unwrap_or(0)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_VIEW)
    }
}
